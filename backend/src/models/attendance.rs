use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::services::geofence::ScanLocation;
use crate::types::{RecordId, SessionId, UserId};

/// Recorded outcome for one (session, student) pair. Created exactly once,
/// on the first valid scan or by the post-session absence sweep.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttendanceRecord {
    pub id: RecordId,
    pub session_id: SessionId,
    pub student_id: UserId,
    pub scan_time: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    pub location_valid: Option<bool>,
    pub scan_latitude: Option<f64>,
    pub scan_longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Late,
    /// Only ever synthesized by the post-session sweep, never by a scan.
    Absent,
}

impl AttendanceRecord {
    pub fn from_scan(
        session_id: SessionId,
        student_id: UserId,
        scan_time: DateTime<Utc>,
        status: AttendanceStatus,
        location_valid: Option<bool>,
        location: Option<&ScanLocation>,
    ) -> Self {
        Self {
            id: RecordId::new(),
            session_id,
            student_id,
            scan_time: Some(scan_time),
            status,
            location_valid,
            scan_latitude: location.map(|l| l.latitude),
            scan_longitude: location.map(|l| l.longitude),
            created_at: scan_time,
        }
    }

    /// A sweep record carries no scan evidence at all.
    pub fn absent(session_id: SessionId, student_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: RecordId::new(),
            session_id,
            student_id,
            scan_time: None,
            status: AttendanceStatus::Absent,
            location_valid: None,
            scan_latitude: None,
            scan_longitude: None,
            created_at: now,
        }
    }
}

/// Body of `POST /api/sessions/scan`. Location fields are optional: a
/// device without a fix still gets to scan, with location_valid = null.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ScanPayload {
    pub session_id: SessionId,
    pub secret: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    #[validate(range(min = 0.0))]
    pub accuracy: Option<f64>,
}

impl ScanPayload {
    /// A location is only usable when both coordinates arrived.
    pub fn location(&self) -> Option<ScanLocation> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(ScanLocation {
                latitude,
                longitude,
                accuracy: self.accuracy,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ScanResponse {
    pub status: AttendanceStatus,
    pub location_valid: Option<bool>,
    /// True when this scan found an earlier record; benign, shown to the
    /// student as confirmation rather than failure.
    pub already_recorded: bool,
}

/// Roster entry for the lecturer's view of one session.
#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceRecordResponse {
    pub student_id: UserId,
    pub status: AttendanceStatus,
    pub scan_time: Option<DateTime<Utc>>,
    pub location_valid: Option<bool>,
}

impl From<AttendanceRecord> for AttendanceRecordResponse {
    fn from(record: AttendanceRecord) -> Self {
        Self {
            student_id: record.student_id,
            status: record.status,
            scan_time: record.scan_time,
            location_valid: record.location_valid,
        }
    }
}
