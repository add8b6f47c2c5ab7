use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::services::geofence::GeofenceZone;
use crate::types::{SessionId, UnitId, UserId};

/// One scheduled meeting of a course unit. Immutable after scheduling;
/// status is always derived from the clock, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClassSession {
    pub id: SessionId,
    pub unit_id: UnitId,
    pub lecturer_id: UserId,
    pub venue_name: String,
    pub venue_latitude: Option<f64>,
    pub venue_longitude: Option<f64>,
    pub venue_radius_m: Option<f64>,
    pub schedule_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub created_at: DateTime<Utc>,
}

/// Temporal status of a session relative to "now". Derived by
/// `services::schedule`; display and enforcement share the same derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Upcoming,
    Ongoing,
    Ended,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionStatus::Upcoming => "upcoming",
            SessionStatus::Ongoing => "ongoing",
            SessionStatus::Ended => "ended",
        };
        f.write_str(s)
    }
}

impl ClassSession {
    /// Returns the venue's geofence when one is configured. A venue without
    /// both a center and a radius has geofencing disabled.
    pub fn geofence(&self) -> Option<GeofenceZone> {
        match (
            self.venue_latitude,
            self.venue_longitude,
            self.venue_radius_m,
        ) {
            (Some(latitude), Some(longitude), Some(radius_m)) => Some(GeofenceZone {
                latitude,
                longitude,
                radius_m,
            }),
            _ => None,
        }
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.lecturer_id == user_id
    }
}

/// Display-only payload for `GET /api/sessions/{id}/status`. Never
/// authoritative: issuance and scan re-derive the status themselves.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionStatusResponse {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub schedule_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub venue_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn session(lat: Option<f64>, lng: Option<f64>, radius: Option<f64>) -> ClassSession {
        ClassSession {
            id: SessionId::new(),
            unit_id: UnitId::new(),
            lecturer_id: UserId::from_uuid(Uuid::new_v4()),
            venue_name: "LT-1".into(),
            venue_latitude: lat,
            venue_longitude: lng,
            venue_radius_m: radius,
            schedule_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn geofence_requires_center_and_radius() {
        assert!(session(Some(-1.28), Some(36.82), Some(50.0))
            .geofence()
            .is_some());
        assert!(session(Some(-1.28), None, Some(50.0)).geofence().is_none());
        assert!(session(None, None, None).geofence().is_none());
    }

    #[test]
    fn session_status_serde_snake_case() {
        let v = serde_json::to_value(SessionStatus::Upcoming).unwrap();
        assert_eq!(v, serde_json::json!("upcoming"));
        let s: SessionStatus = serde_json::from_str("\"ended\"").unwrap();
        assert_eq!(s, SessionStatus::Ended);
    }
}
