//! The attendance ledger.
//!
//! One atomic primitive, `try_insert`, keyed by the unique constraint on
//! (session_id, student_id). Everything that must hold under concurrent
//! scans reduces to this insert: the loser of a race observes the winner's
//! record instead of writing a second one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::connection::DbPool;
use crate::error::AppError;
use crate::models::attendance::AttendanceRecord;
use crate::types::{SessionId, UserId};

const RECORD_COLUMNS: &str = "id, session_id, student_id, scan_time, status, location_valid, \
     scan_latitude, scan_longitude, created_at";

/// Result of the atomic insert.
#[derive(Debug, Clone)]
pub enum LedgerInsert {
    /// The record was written; first scan wins.
    Inserted(AttendanceRecord),
    /// A record for this (session, student) already existed; here it is.
    Duplicate(AttendanceRecord),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttendanceRepositoryTrait: Send + Sync {
    async fn find_by_session_and_student(
        &self,
        session_id: SessionId,
        student_id: UserId,
    ) -> Result<Option<AttendanceRecord>, AppError>;

    /// Insert-if-absent. Never overwrites; never errors on a duplicate.
    async fn try_insert(&self, record: AttendanceRecord) -> Result<LedgerInsert, AppError>;

    async fn list_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AttendanceRecord>, AppError>;

    async fn list_for_student(
        &self,
        student_id: UserId,
    ) -> Result<Vec<AttendanceRecord>, AppError>;
}

#[derive(Clone)]
pub struct PgAttendanceRepository {
    pool: DbPool,
}

impl PgAttendanceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceRepositoryTrait for PgAttendanceRepository {
    async fn find_by_session_and_student(
        &self,
        session_id: SessionId,
        student_id: UserId,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        let record = sqlx::query_as::<_, AttendanceRecord>(&format!(
            "SELECT {} FROM attendance_records WHERE session_id = $1 AND student_id = $2",
            RECORD_COLUMNS
        ))
        .bind(session_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn try_insert(&self, record: AttendanceRecord) -> Result<LedgerInsert, AppError> {
        let inserted = sqlx::query_as::<_, AttendanceRecord>(&format!(
            "INSERT INTO attendance_records \
                 (id, session_id, student_id, scan_time, status, location_valid, \
                  scan_latitude, scan_longitude, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (session_id, student_id) DO NOTHING \
             RETURNING {}",
            RECORD_COLUMNS
        ))
        .bind(record.id)
        .bind(record.session_id)
        .bind(record.student_id)
        .bind(record.scan_time)
        .bind(record.status)
        .bind(record.location_valid)
        .bind(record.scan_latitude)
        .bind(record.scan_longitude)
        .bind(record.created_at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(written) = inserted {
            return Ok(LedgerInsert::Inserted(written));
        }

        // Lost the race: the conflicting row must exist now.
        let existing = self
            .find_by_session_and_student(record.session_id, record.student_id)
            .await?
            .ok_or_else(|| {
                AppError::InternalServerError(anyhow::anyhow!(
                    "attendance insert conflicted but no existing record found"
                ))
            })?;

        Ok(LedgerInsert::Duplicate(existing))
    }

    async fn list_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        let records = sqlx::query_as::<_, AttendanceRecord>(&format!(
            "SELECT {} FROM attendance_records WHERE session_id = $1 ORDER BY created_at",
            RECORD_COLUMNS
        ))
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn list_for_student(
        &self,
        student_id: UserId,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        let records = sqlx::query_as::<_, AttendanceRecord>(&format!(
            "SELECT {} FROM attendance_records WHERE student_id = $1 ORDER BY created_at DESC",
            RECORD_COLUMNS
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

/// Synthesizes `absent` records for every enrolled student with no record
/// for `session_id`. Same unique constraint as the scan path, so re-running
/// the sweep or racing a late scan is harmless.
pub async fn insert_absentees(
    pool: &DbPool,
    session_id: SessionId,
    unit_id: crate::types::UnitId,
    now: DateTime<Utc>,
) -> Result<u64, AppError> {
    let result = sqlx::query(
        "INSERT INTO attendance_records \
             (id, session_id, student_id, scan_time, status, location_valid, \
              scan_latitude, scan_longitude, created_at) \
         SELECT gen_random_uuid(), $1, e.student_id, NULL, 'absent', NULL, NULL, NULL, $2 \
         FROM enrollments e \
         WHERE e.unit_id = $3 \
         ON CONFLICT (session_id, student_id) DO NOTHING",
    )
    .bind(session_id)
    .bind(now)
    .bind(unit_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
