//! The `Authentication` cookie in its setting and clearing forms.
//!
//! Both forms are built from [`base_cookie`] so they always agree on
//! `HttpOnly`, `Path`, `SameSite`, `Secure` and `Domain`. A clearing cookie
//! that differs in `Domain` or `Path` would leave the browser's copy in place.

use tower_cookies::Cookie;
use tower_cookies::cookie::{SameSite, time::Duration};

/// Name of the cookie carrying the session token.
pub const AUTH_COOKIE: &str = "Authentication";

fn base_cookie(value: String, domain: Option<&str>) -> Cookie<'static> {
    let mut cookie = Cookie::new(AUTH_COOKIE, value);
    cookie.set_http_only(true);
    cookie.set_path("/");
    cookie.set_same_site(SameSite::Strict);
    cookie.set_secure(true);
    if let Some(domain) = domain {
        cookie.set_domain(domain.to_string());
    }
    cookie
}

/// The cookie set on login.
pub fn session_cookie(token: String, max_age_secs: i64, domain: Option<&str>) -> Cookie<'static> {
    let mut cookie = base_cookie(token, domain);
    cookie.set_max_age(Duration::seconds(max_age_secs.max(0)));
    cookie
}

/// The cookie sent on logout: empty value, `Max-Age=0`.
pub fn clearing_cookie(domain: Option<&str>) -> Cookie<'static> {
    let mut cookie = base_cookie(String::new(), domain);
    cookie.set_max_age(Duration::ZERO);
    cookie
}
