//! Session and token lifecycle service: login issues a signed session token in
//! a hardened cookie, logout revokes it, and every authenticated request is
//! checked against the revocation denylist.

pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod session;
pub mod state;

pub mod models {
    pub mod revocation;
    pub mod user;
}

pub mod repositories {
    pub mod revocation;
    pub mod user;
}

pub mod services {
    pub mod auth;
}

pub mod handlers {
    pub mod auth;
    pub mod health;
}

pub mod middleware_layer {
    pub mod auth;
}

pub mod validation {
    pub mod auth;
}
