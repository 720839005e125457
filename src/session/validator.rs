use serde::Serialize;

use crate::{
    error::{AppError, Result},
    session::{revocation::RevocationService, token::TokenIssuer},
};

/// The identity attached to an authenticated request, taken from the signed claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub user_id: i32,
    pub username: Option<String>,
}

/// The raw token an authenticated request presented.
#[derive(Debug, Clone)]
pub struct PresentedToken(pub String);

/// Picks the session token out of the cookie value or the `Authorization` header.
///
/// The cookie wins when both are present. Empty values count as absent.
pub fn select_credential(cookie: Option<&str>, authorization: Option<&str>) -> Option<String> {
    let from_cookie = cookie.map(str::trim).filter(|v| !v.is_empty());
    let from_header = authorization
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty());

    from_cookie.or(from_header).map(str::to_string)
}

/// Decides, once per request, whether a presented token is still good.
#[derive(Clone)]
pub struct SessionValidator {
    tokens: TokenIssuer,
    revocations: RevocationService,
}

impl SessionValidator {
    pub fn new(tokens: TokenIssuer, revocations: RevocationService) -> Self {
        Self { tokens, revocations }
    }

    /// Verifies signature and expiry, then consults the denylist.
    pub async fn validate(&self, token: Option<&str>) -> Result<AuthUser> {
        let token = token.ok_or(AppError::MissingCredential)?;
        let claims = self.tokens.verify(token)?;

        if self.revocations.is_revoked(token).await? {
            return Err(AppError::Unauthenticated(format!(
                "Revoked token presented for user {}",
                claims.sub
            )));
        }

        Ok(AuthUser {
            user_id: claims.sub,
            username: claims.username,
        })
    }
}
