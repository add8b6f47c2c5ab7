//! Lecturer-side token issuance.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use crate::error::AppError;
use crate::models::session::SessionStatus;
use crate::models::token::AttendanceToken;
use crate::repositories::session::SessionRepositoryTrait;
use crate::repositories::token::TokenRepositoryTrait;
use crate::services::schedule;
use crate::types::{SessionId, UserId};

#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("session not found")]
    SessionNotFound,
    #[error("only the owning lecturer can issue a token")]
    NotOwner,
    #[error("session is not active (currently {0})")]
    SessionNotActive(SessionStatus),
    #[error("storage failure")]
    Store(AppError),
}

impl From<AppError> for IssueError {
    fn from(err: AppError) -> Self {
        IssueError::Store(err)
    }
}

impl From<IssueError> for AppError {
    fn from(err: IssueError) -> Self {
        match err {
            IssueError::SessionNotFound => AppError::SessionNotFound,
            IssueError::NotOwner => {
                AppError::Forbidden("Only the owning lecturer can issue a token".to_string())
            }
            IssueError::SessionNotActive(current) => AppError::SessionNotActive(current),
            IssueError::Store(inner) => inner,
        }
    }
}

/// Issues the single valid attendance token for an ongoing session.
/// Re-issuance always mints a fresh secret and revokes the predecessor;
/// serialization lives in the token repository.
#[derive(Clone)]
pub struct TokenIssuer {
    sessions: Arc<dyn SessionRepositoryTrait>,
    tokens: Arc<dyn TokenRepositoryTrait>,
    time_zone: Tz,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(
        sessions: Arc<dyn SessionRepositoryTrait>,
        tokens: Arc<dyn TokenRepositoryTrait>,
        time_zone: Tz,
        ttl: Duration,
    ) -> Self {
        Self {
            sessions,
            tokens,
            time_zone,
            ttl,
        }
    }

    pub async fn issue(
        &self,
        session_id: SessionId,
        requester_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<AttendanceToken, IssueError> {
        let session = self
            .sessions
            .find_by_id(session_id)
            .await?
            .ok_or(IssueError::SessionNotFound)?;

        if !session.is_owned_by(requester_id) {
            return Err(IssueError::NotOwner);
        }

        let current = schedule::session_status(&session, now, &self.time_zone);
        if current != SessionStatus::Ongoing {
            return Err(IssueError::SessionNotActive(current));
        }

        let token = AttendanceToken::new(session_id, now, self.ttl);
        self.tokens.replace_active(&token).await?;

        tracing::info!(
            session_id = %session_id,
            expires_at = %token.expires_at,
            "Issued attendance token"
        );

        Ok(token)
    }
}
