use std::collections::BTreeSet;
use std::net::SocketAddr;

use once_cell::sync::Lazy;
use reqwest::{header, StatusCode};
use serde_json::{json, Value};

use sessiongate::config::{AuthConfig, Config, RevocationBackend};
use sessiongate::routes;
use sessiongate::state::AppState;

static TEST_CONFIG: Lazy<Config> = Lazy::new(|| Config {
    bind_addr: "127.0.0.1:0".parse().unwrap(),
    database_url: "postgres://unused".to_string(),
    redis_url: "redis://unused".to_string(),
    revocation_backend: RevocationBackend::Memory,
    auth: AuthConfig {
        jwt_secret: "integration-test-secret-0123456789".to_string(),
        token_lifetime: "60m".to_string(),
        cookie_domain: None,
    },
    login_replenish_secs: 1,
    login_burst: 20,
    revocation_purge_interval_secs: 3600,
    cors_origins: vec!["http://localhost:3000".to_string()],
});

// Shared test context
struct TestContext {
    client: reqwest::Client,
    base_url: String,
}

impl TestContext {
    async fn spawn() -> Self {
        let state = AppState::in_memory(&TEST_CONFIG);
        let app = routes::router(state).unwrap();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        Self {
            client: reqwest::Client::new(),
            base_url: format!("http://{}", addr),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn register(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/auth/register"))
            .json(&json!({ "email": email, "username": "tester", "password": password }))
            .send()
            .await
            .unwrap()
    }

    async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap()
    }
}

/// Returns the raw `Set-Cookie` header for the session cookie.
fn auth_set_cookie(response: &reqwest::Response) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("Authentication="))
        .expect("Authentication cookie not set")
        .to_string()
}

/// Splits a `Set-Cookie` header into `(value, max_age, other attributes)`.
fn parse_set_cookie(header: &str) -> (String, Option<String>, BTreeSet<String>) {
    let mut parts = header.split(';').map(str::trim);
    let value = parts
        .next()
        .and_then(|kv| kv.split_once('='))
        .map(|(_, v)| v.to_string())
        .unwrap_or_default();

    let mut max_age = None;
    let mut attributes = BTreeSet::new();
    for part in parts {
        match part.split_once('=') {
            Some((name, v)) if name.eq_ignore_ascii_case("Max-Age") => max_age = Some(v.to_string()),
            _ => {
                attributes.insert(part.to_string());
            }
        }
    }
    (value, max_age, attributes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_login_logout_lifecycle() {
        let context = TestContext::spawn().await;

        // Step 1: Register
        let reg = context.register("alice@example.com", "SecurePass123!").await;
        assert_eq!(reg.status(), StatusCode::CREATED, "Registration failed");
        let reg_body: Value = reg.json().await.unwrap();
        assert_eq!(reg_body["user"]["email"], "alice@example.com");
        assert!(reg_body["user"].get("password").is_none());

        // Step 2: Login sets the session cookie
        let login = context.login("alice@example.com", "SecurePass123!").await;
        assert_eq!(login.status(), StatusCode::OK, "Login failed");
        let set_cookie = auth_set_cookie(&login);
        let (token, max_age, set_attributes) = parse_set_cookie(&set_cookie);
        assert!(!token.is_empty());
        assert_eq!(max_age.as_deref(), Some("3600"));
        for expected in ["HttpOnly", "Secure", "SameSite=Strict", "Path=/"] {
            assert!(set_attributes.contains(expected), "missing {} in {}", expected, set_cookie);
        }
        let login_body: Value = login.json().await.unwrap();
        assert_eq!(login_body["access_token"], token.as_str());

        let cookie_header = format!("Authentication={}", token);

        // Step 3: The cookie authenticates
        let me = context
            .client
            .get(context.url("/api/auth/me"))
            .header(header::COOKIE, &cookie_header)
            .send()
            .await
            .unwrap();
        assert_eq!(me.status(), StatusCode::OK);
        let me_body: Value = me.json().await.unwrap();
        assert_eq!(me_body["user"]["email"], "alice@example.com");
        assert_eq!(me_body["user"]["username"], "tester");

        // Step 4: Logout clears the cookie with identical attributes
        let logout = context
            .client
            .post(context.url("/api/auth/logout"))
            .header(header::COOKIE, &cookie_header)
            .send()
            .await
            .unwrap();
        assert_eq!(logout.status(), StatusCode::OK);
        let (cleared_value, cleared_max_age, cleared_attributes) =
            parse_set_cookie(&auth_set_cookie(&logout));
        assert_eq!(cleared_value, "");
        assert_eq!(cleared_max_age.as_deref(), Some("0"));
        assert_eq!(cleared_attributes, set_attributes);

        // Step 5: The revoked token no longer works, though it is still signed and unexpired
        let me_again = context
            .client
            .get(context.url("/api/auth/me"))
            .header(header::COOKIE, &cookie_header)
            .send()
            .await
            .unwrap();
        assert_eq!(me_again.status(), StatusCode::UNAUTHORIZED);

        let logout_again = context
            .client
            .post(context.url("/api/auth/logout"))
            .header(header::COOKIE, &cookie_header)
            .send()
            .await
            .unwrap();
        assert_eq!(logout_again.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_bearer_header_is_accepted() {
        let context = TestContext::spawn().await;
        context.register("bob@example.com", "SecurePass123!").await;
        let login = context.login("bob@example.com", "SecurePass123!").await;
        let body: Value = login.json().await.unwrap();
        let token = body["access_token"].as_str().unwrap().to_string();

        let me = context
            .client
            .get(context.url("/api/auth/me"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(me.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_credential_is_unauthorized() {
        let context = TestContext::spawn().await;

        let me = context
            .client
            .get(context.url("/api/auth/me"))
            .send()
            .await
            .unwrap();
        assert_eq!(me.status(), StatusCode::UNAUTHORIZED);

        let logout = context
            .client
            .post(context.url("/api/auth/logout"))
            .send()
            .await
            .unwrap();
        assert_eq!(logout.status(), StatusCode::UNAUTHORIZED);
        assert!(logout.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_forged_cookie_is_unauthorized() {
        let context = TestContext::spawn().await;

        let me = context
            .client
            .get(context.url("/api/auth/me"))
            .header(header::COOKIE, "Authentication=not.a.jwt")
            .send()
            .await
            .unwrap();
        assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_registration_and_login_errors() {
        let context = TestContext::spawn().await;

        let bad_email = context.register("not-an-email", "SecurePass123!").await;
        assert_eq!(bad_email.status(), StatusCode::BAD_REQUEST);

        let short_password = context.register("carol@example.com", "short").await;
        assert_eq!(short_password.status(), StatusCode::BAD_REQUEST);

        let first = context.register("carol@example.com", "SecurePass123!").await;
        assert_eq!(first.status(), StatusCode::CREATED);
        let duplicate = context.register("carol@example.com", "SecurePass123!").await;
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);

        let wrong_password = context.login("carol@example.com", "WrongPass123!").await;
        assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
        assert!(wrong_password.headers().get(header::SET_COOKIE).is_none());
        let body: Value = wrong_password.json().await.unwrap();
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_health_reports_store() {
        let context = TestContext::spawn().await;

        let health = context.client.get(context.url("/health")).send().await.unwrap();
        assert_eq!(health.status(), StatusCode::OK);
        let body: Value = health.json().await.unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["revocation_store"], "ok");
    }
}
