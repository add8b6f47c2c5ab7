//! Session and enrollment lookups.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::db::connection::DbPool;
use crate::error::AppError;
use crate::models::session::ClassSession;
use crate::types::{SessionId, UnitId, UserId};

const SESSION_COLUMNS: &str = "id, unit_id, lecturer_id, venue_name, venue_latitude, \
     venue_longitude, venue_radius_m, schedule_date, start_time, end_time, created_at";

/// Read access to the session catalog. Sessions are created by the
/// scheduling system and immutable here, so this side only reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepositoryTrait: Send + Sync {
    async fn find_by_id(&self, id: SessionId) -> Result<Option<ClassSession>, AppError>;

    /// Whether the student is enrolled in the unit the session belongs to.
    async fn is_enrolled(&self, student_id: UserId, unit_id: UnitId) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct PgSessionRepository {
    pool: DbPool,
}

impl PgSessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepositoryTrait for PgSessionRepository {
    async fn find_by_id(&self, id: SessionId) -> Result<Option<ClassSession>, AppError> {
        let session = sqlx::query_as::<_, ClassSession>(&format!(
            "SELECT {} FROM class_sessions WHERE id = $1",
            SESSION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn is_enrolled(&self, student_id: UserId, unit_id: UnitId) -> Result<bool, AppError> {
        let row: Option<(i32,)> = sqlx::query_as(
            "SELECT 1 FROM enrollments WHERE student_id = $1 AND unit_id = $2",
        )
        .bind(student_id)
        .bind(unit_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }
}

/// Sessions scheduled on or before `date`, oldest first. The absence sweep
/// filters these down to ended ones with the schedule evaluator.
pub async fn list_on_or_before(
    pool: &DbPool,
    date: NaiveDate,
) -> Result<Vec<ClassSession>, AppError> {
    let sessions = sqlx::query_as::<_, ClassSession>(&format!(
        "SELECT {} FROM class_sessions WHERE schedule_date <= $1 \
         ORDER BY schedule_date, start_time",
        SESSION_COLUMNS
    ))
    .bind(date)
    .fetch_all(pool)
    .await?;

    Ok(sessions)
}
