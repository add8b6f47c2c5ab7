//! Attendance token storage.
//!
//! The invariant "at most one live token per session" is owned here: a
//! partial unique index on (session_id) WHERE NOT revoked backs the
//! revoke-then-insert transaction, so two concurrent issuers can never both
//! commit a live token.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::connection::DbPool;
use crate::error::AppError;
use crate::models::token::AttendanceToken;
use crate::types::SessionId;

const TOKEN_COLUMNS: &str = "id, session_id, secret, issued_at, expires_at, revoked";

const ONE_ACTIVE_INDEX: &str = "attendance_tokens_one_active";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenRepositoryTrait: Send + Sync {
    /// The session's current unrevoked token, expired or not. Expiry is the
    /// caller's concern so it can surface `TOKEN_EXPIRED` distinctly.
    async fn find_active(&self, session_id: SessionId)
        -> Result<Option<AttendanceToken>, AppError>;

    /// Revokes the session's live token (if any) and stores `token` as the
    /// new one, atomically.
    async fn replace_active(&self, token: &AttendanceToken) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PgTokenRepository {
    pool: DbPool,
}

impl PgTokenRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRepositoryTrait for PgTokenRepository {
    async fn find_active(
        &self,
        session_id: SessionId,
    ) -> Result<Option<AttendanceToken>, AppError> {
        let token = sqlx::query_as::<_, AttendanceToken>(&format!(
            "SELECT {} FROM attendance_tokens WHERE session_id = $1 AND NOT revoked",
            TOKEN_COLUMNS
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    async fn replace_active(&self, token: &AttendanceToken) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE attendance_tokens SET revoked = TRUE WHERE session_id = $1 AND NOT revoked")
            .bind(token.session_id)
            .execute(&mut *tx)
            .await?;

        let inserted = sqlx::query(
            "INSERT INTO attendance_tokens (id, session_id, secret, issued_at, expires_at, revoked) \
             VALUES ($1, $2, $3, $4, $5, FALSE)",
        )
        .bind(token.id)
        .bind(token.session_id)
        .bind(&token.secret)
        .bind(token.issued_at)
        .bind(token.expires_at)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {
                tx.commit().await?;
                Ok(())
            }
            Err(err) => {
                // A concurrent issuer won the partial unique index; the
                // caller retries and picks up the winner's token.
                if is_one_active_violation(&err) {
                    Err(AppError::Conflict(
                        "Token issuance raced with another request; retry".to_string(),
                    ))
                } else {
                    Err(err.into())
                }
            }
        }
    }
}

fn is_one_active_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.constraint() == Some(ONE_ACTIVE_INDEX)
    )
}

/// Deletes revoked and long-expired tokens. Storage hygiene only; passive
/// expiry keeps the protocol correct without this ever running.
pub async fn delete_dead_tokens(pool: &DbPool, now: DateTime<Utc>) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM attendance_tokens WHERE revoked OR expires_at < $1")
        .bind(now)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
