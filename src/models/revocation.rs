use chrono::{DateTime, Utc};

/// A denylist entry for a token that was logged out before it expired.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevokedToken {
    /// The raw token string.
    pub token: String,
    /// When the token would have expired on its own. The record is dead after this.
    pub expires_at: DateTime<Utc>,
    /// When the token was revoked.
    pub created_at: DateTime<Utc>,
}

impl RevokedToken {
    /// Returns `true` once the token would have expired anyway.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
