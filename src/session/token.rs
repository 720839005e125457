//! Session token issuance and verification.
//!
//! Tokens are HS256-signed JWTs carrying a [`Claims`] payload. Nothing about an
//! issued token is persisted; only revocations are (see `session::revocation`).

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookie;

use crate::{
    config::AuthConfig,
    error::{AppError, Result},
    models::user::User,
    session::{cookie, lifetime},
};

/// Claims embedded in every session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's id.
    pub sub: i32,
    pub username: Option<String>,
    pub email: String,
    pub verified: bool,
    /// Issued-at, epoch seconds.
    pub iat: i64,
    /// Expiry, epoch seconds.
    pub exp: i64,
    /// Random per-issue id. Two logins in the same second never share a token.
    pub jti: String,
}

fn new_token_id() -> Result<String> {
    let mut bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AppError::Internal(format!("Failed to generate token id: {}", e)))?;
    Ok(format!("{:032x}", u128::from_be_bytes(bytes)))
}

/// The result of a successful [`TokenIssuer::issue`].
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub cookie: Cookie<'static>,
    pub expires_at: DateTime<Utc>,
    pub max_age_secs: i64,
}

/// Signs session tokens and verifies them on the way back in.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: String,
    cookie_domain: Option<String>,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            lifetime: config.token_lifetime.clone(),
            cookie_domain: config.cookie_domain.clone(),
        }
    }

    /// The configured cookie domain, shared with the clearing cookie on logout.
    pub fn cookie_domain(&self) -> Option<&str> {
        self.cookie_domain.as_deref()
    }

    /// Issues a token and its cookie for a user the caller has already authenticated.
    pub fn issue(&self, user: &User) -> Result<IssuedToken> {
        self.issue_at(user, Utc::now())
    }

    /// Same as [`issue`](Self::issue) with an explicit clock.
    pub fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<IssuedToken> {
        let expires_at = lifetime::expiry_from(&self.lifetime, now);

        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            verified: user.verified,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: new_token_id()?,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        let max_age_secs = (expires_at - now).num_milliseconds().div_euclid(1000);
        let cookie = cookie::session_cookie(token.clone(), max_age_secs, self.cookie_domain());

        tracing::debug!(user_id = user.id, %expires_at, "🔑 Session token issued");

        Ok(IssuedToken {
            token,
            cookie,
            expires_at,
            max_age_secs,
        })
    }

    /// Checks the signature and expiry of a token and returns its claims.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthenticated(format!("Invalid or expired token: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::test_support::{test_config, test_user};
    use chrono::Duration;

    #[test]
    fn issued_token_round_trips_through_verify() {
        let issuer = TokenIssuer::new(&test_config("60m"));
        let issued = issuer.issue(&test_user()).unwrap();

        let claims = issuer.verify(&issued.token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.username.as_deref(), Some("alice"));
        assert_eq!(claims.email, "alice@example.com");
        assert!(claims.verified);
        assert_eq!(claims.exp - claims.iat, 3_600);
    }

    #[test]
    fn max_age_matches_configured_lifetime() {
        let now = Utc::now();
        for (lifetime, expected) in [("1d", 86_400), ("7h", 25_200), ("30m", 1_800), ("45s", 45), ("xyz", 86_400)] {
            let issuer = TokenIssuer::new(&test_config(lifetime));
            let issued = issuer.issue_at(&test_user(), now).unwrap();

            assert_eq!(issued.max_age_secs, expected, "lifetime {}", lifetime);
            assert_eq!(
                issued.max_age_secs,
                (issued.expires_at - now).num_milliseconds().div_euclid(1000)
            );
            assert_eq!(
                issued.cookie.max_age(),
                Some(tower_cookies::cookie::time::Duration::seconds(expected))
            );
            assert_eq!(issued.cookie.value(), issued.token);
        }
    }

    #[test]
    fn missing_username_is_emitted_as_null() {
        let issuer = TokenIssuer::new(&test_config("1h"));
        let mut user = test_user();
        user.username = None;

        let issued = issuer.issue(&user).unwrap();
        let claims = issuer.verify(&issued.token).unwrap();
        assert_eq!(claims.username, None);
    }

    #[test]
    fn tokens_issued_in_the_same_second_differ() {
        let issuer = TokenIssuer::new(&test_config("1h"));
        let now = Utc::now();

        let first = issuer.issue_at(&test_user(), now).unwrap();
        let second = issuer.issue_at(&test_user(), now).unwrap();

        assert_ne!(first.token, second.token);
        let (a, b) = (issuer.verify(&first.token).unwrap(), issuer.verify(&second.token).unwrap());
        assert_eq!(a.iat, b.iat);
        assert_eq!(a.jti.len(), 32);
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = TokenIssuer::new(&test_config("1h"));
        let issued = issuer
            .issue_at(&test_user(), Utc::now() - Duration::hours(2))
            .unwrap();

        assert!(matches!(
            issuer.verify(&issued.token),
            Err(AppError::Unauthenticated(_))
        ));
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let issued = TokenIssuer::new(&test_config("1h"))
            .issue(&test_user())
            .unwrap();

        let mut other = test_config("1h");
        other.jwt_secret = "a-completely-different-secret".to_string();

        assert!(TokenIssuer::new(&other).verify(&issued.token).is_err());
    }
}
