use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::types::{SessionId, TokenId};
use crate::utils::secret::generate_token_secret;

/// A short-lived credential proving a device observed the session's
/// broadcast code near real time. At most one unrevoked token exists per
/// session; issuing a new one revokes the predecessor.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttendanceToken {
    pub id: TokenId,
    pub session_id: SessionId,
    pub secret: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

impl AttendanceToken {
    pub fn new(session_id: SessionId, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id: TokenId::new(),
            session_id,
            secret: generate_token_secret(),
            issued_at,
            expires_at: issued_at + ttl,
            revoked: false,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Constant-length comparison is not needed here: the secret is single
    /// use within minutes and matched by an indexed equality lookup anyway.
    pub fn matches(&self, secret: &str) -> bool {
        self.secret == secret
    }
}

/// Response for `POST /api/sessions/{id}/token`. The secret is what gets
/// embedded in the QR image or read out as a manual code.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IssuedTokenResponse {
    pub secret: String,
    pub expires_at: DateTime<Utc>,
}
