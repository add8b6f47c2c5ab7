//! Scan validation, the core decision function.
//!
//! A scan is accepted only when every gate passes in order: the session
//! exists and is ongoing right now, the submitted secret matches the
//! session's unexpired active token, the student is enrolled, and no record
//! exists yet for this (session, student). The ledger's atomic insert
//! closes the race window between the duplicate check and the write.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use crate::error::AppError;
use crate::models::attendance::{AttendanceRecord, AttendanceStatus, ScanPayload};
use crate::models::session::SessionStatus;
use crate::repositories::attendance::{AttendanceRepositoryTrait, LedgerInsert};
use crate::repositories::session::SessionRepositoryTrait;
use crate::repositories::token::TokenRepositoryTrait;
use crate::services::{geofence, schedule};
use crate::types::UserId;

/// Rejection taxonomy for a scan. Everything except infrastructure
/// failures needs a fresh token or a different session before retrying.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("session not found")]
    SessionNotFound,
    #[error("session is not active (currently {0})")]
    SessionNotActive(SessionStatus),
    #[error("secret does not match the session's active token")]
    InvalidToken,
    #[error("the active token has expired")]
    TokenExpired,
    #[error("student is not enrolled in this unit")]
    NotEnrolled,
    #[error("storage failure")]
    Store(AppError),
}

impl From<AppError> for ScanError {
    fn from(err: AppError) -> Self {
        ScanError::Store(err)
    }
}

impl From<ScanError> for AppError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::SessionNotFound => AppError::SessionNotFound,
            ScanError::SessionNotActive(current) => AppError::SessionNotActive(current),
            ScanError::InvalidToken => AppError::InvalidToken,
            ScanError::TokenExpired => AppError::TokenExpired,
            ScanError::NotEnrolled => AppError::NotEnrolled,
            ScanError::Store(inner) => inner,
        }
    }
}

/// Accepted scan. `AlreadyRecorded` is the soft outcome: the earlier
/// record stands and is returned as confirmation.
#[derive(Debug, Clone)]
pub enum ScanOutcome {
    Recorded(AttendanceRecord),
    AlreadyRecorded(AttendanceRecord),
}

impl ScanOutcome {
    pub fn record(&self) -> &AttendanceRecord {
        match self {
            ScanOutcome::Recorded(record) | ScanOutcome::AlreadyRecorded(record) => record,
        }
    }
}

#[derive(Clone)]
pub struct ScanService {
    sessions: Arc<dyn SessionRepositoryTrait>,
    tokens: Arc<dyn TokenRepositoryTrait>,
    ledger: Arc<dyn AttendanceRepositoryTrait>,
    time_zone: Tz,
    grace_period: Duration,
}

impl ScanService {
    pub fn new(
        sessions: Arc<dyn SessionRepositoryTrait>,
        tokens: Arc<dyn TokenRepositoryTrait>,
        ledger: Arc<dyn AttendanceRepositoryTrait>,
        time_zone: Tz,
        grace_period: Duration,
    ) -> Self {
        Self {
            sessions,
            tokens,
            ledger,
            time_zone,
            grace_period,
        }
    }

    pub async fn submit_scan(
        &self,
        student_id: UserId,
        payload: &ScanPayload,
        now: DateTime<Utc>,
    ) -> Result<ScanOutcome, ScanError> {
        let session = self
            .sessions
            .find_by_id(payload.session_id)
            .await?
            .ok_or(ScanError::SessionNotFound)?;

        // Re-derived here even though issuance already required ongoing:
        // the session can end between issuance and scan.
        let current = schedule::session_status(&session, now, &self.time_zone);
        if current != SessionStatus::Ongoing {
            return Err(ScanError::SessionNotActive(current));
        }

        let token = self
            .tokens
            .find_active(session.id)
            .await?
            .ok_or(ScanError::InvalidToken)?;
        if !token.matches(&payload.secret) {
            return Err(ScanError::InvalidToken);
        }
        if token.is_expired(now) {
            return Err(ScanError::TokenExpired);
        }

        if !self.sessions.is_enrolled(student_id, session.unit_id).await? {
            return Err(ScanError::NotEnrolled);
        }

        if let Some(existing) = self
            .ledger
            .find_by_session_and_student(session.id, student_id)
            .await?
        {
            return Ok(ScanOutcome::AlreadyRecorded(existing));
        }

        let location = payload.location();
        let location_valid =
            geofence::within_radius(session.geofence().as_ref(), location.as_ref());

        let (start, _end) = schedule::session_window(&session, &self.time_zone);
        let status = if now <= start + self.grace_period {
            AttendanceStatus::Present
        } else {
            AttendanceStatus::Late
        };

        let record = AttendanceRecord::from_scan(
            session.id,
            student_id,
            now,
            status,
            location_valid,
            location.as_ref(),
        );

        match self.ledger.try_insert(record).await? {
            LedgerInsert::Inserted(written) => {
                tracing::info!(
                    session_id = %session.id,
                    student_id = %student_id,
                    status = ?written.status,
                    location_valid = ?written.location_valid,
                    "Recorded attendance"
                );
                Ok(ScanOutcome::Recorded(written))
            }
            // Two near-simultaneous scans by the same student: the loser of
            // the atomic insert reports the winner's record, not an error.
            LedgerInsert::Duplicate(existing) => Ok(ScanOutcome::AlreadyRecorded(existing)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::ClassSession;
    use crate::models::token::AttendanceToken;
    use crate::repositories::attendance::MockAttendanceRepositoryTrait;
    use crate::repositories::session::MockSessionRepositoryTrait;
    use crate::repositories::token::MockTokenRepositoryTrait;
    use crate::types::{SessionId, UnitId};
    use chrono::{NaiveDate, NaiveTime, TimeZone};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
    }

    fn ten_to_eleven() -> ClassSession {
        ClassSession {
            id: SessionId::new(),
            unit_id: UnitId::new(),
            lecturer_id: UserId::new(),
            venue_name: "LT-1".into(),
            venue_latitude: None,
            venue_longitude: None,
            venue_radius_m: None,
            schedule_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            created_at: Utc::now(),
        }
    }

    fn token_for(session: &ClassSession, issued: DateTime<Utc>) -> AttendanceToken {
        AttendanceToken::new(session.id, issued, Duration::minutes(5))
    }

    fn payload(session: &ClassSession, secret: &str) -> ScanPayload {
        ScanPayload {
            session_id: session.id,
            secret: secret.to_string(),
            latitude: None,
            longitude: None,
            accuracy: None,
        }
    }

    struct Fixture {
        sessions: MockSessionRepositoryTrait,
        tokens: MockTokenRepositoryTrait,
        ledger: MockAttendanceRepositoryTrait,
    }

    impl Fixture {
        fn new(session: &ClassSession, token: Option<AttendanceToken>) -> Self {
            let mut sessions = MockSessionRepositoryTrait::new();
            let found = session.clone();
            sessions
                .expect_find_by_id()
                .returning(move |_| Ok(Some(found.clone())));
            sessions.expect_is_enrolled().returning(|_, _| Ok(true));

            let mut tokens = MockTokenRepositoryTrait::new();
            tokens
                .expect_find_active()
                .returning(move |_| Ok(token.clone()));

            let mut ledger = MockAttendanceRepositoryTrait::new();
            ledger
                .expect_find_by_session_and_student()
                .returning(|_, _| Ok(None));
            ledger
                .expect_try_insert()
                .returning(|record| Ok(LedgerInsert::Inserted(record)));

            Self {
                sessions,
                tokens,
                ledger,
            }
        }

        fn service(self) -> ScanService {
            ScanService::new(
                Arc::new(self.sessions),
                Arc::new(self.tokens),
                Arc::new(self.ledger),
                chrono_tz::UTC,
                Duration::minutes(15),
            )
        }
    }

    #[tokio::test]
    async fn scan_within_grace_window_is_present() {
        let session = ten_to_eleven();
        let token = token_for(&session, at(10, 5));
        let secret = token.secret.clone();
        let service = Fixture::new(&session, Some(token)).service();

        let outcome = service
            .submit_scan(UserId::new(), &payload(&session, &secret), at(10, 7))
            .await
            .expect("scan accepted");
        assert!(matches!(outcome, ScanOutcome::Recorded(_)));
        assert_eq!(outcome.record().status, AttendanceStatus::Present);
    }

    #[tokio::test]
    async fn scan_after_grace_window_is_late() {
        let session = ten_to_eleven();
        let token = token_for(&session, at(10, 20));
        let secret = token.secret.clone();
        let service = Fixture::new(&session, Some(token)).service();

        let outcome = service
            .submit_scan(UserId::new(), &payload(&session, &secret), at(10, 21))
            .await
            .expect("scan accepted");
        assert_eq!(outcome.record().status, AttendanceStatus::Late);
    }

    #[tokio::test]
    async fn expired_token_fails_even_while_session_is_ongoing() {
        let session = ten_to_eleven();
        let token = token_for(&session, at(10, 5)); // expires 10:10
        let secret = token.secret.clone();
        let service = Fixture::new(&session, Some(token)).service();

        let result = service
            .submit_scan(UserId::new(), &payload(&session, &secret), at(10, 12))
            .await;
        assert!(matches!(result, Err(ScanError::TokenExpired)));
    }

    #[tokio::test]
    async fn wrong_secret_is_invalid_not_expired() {
        let session = ten_to_eleven();
        let token = token_for(&session, at(10, 5));
        let service = Fixture::new(&session, Some(token)).service();

        let result = service
            .submit_scan(UserId::new(), &payload(&session, "not-the-secret"), at(10, 7))
            .await;
        assert!(matches!(result, Err(ScanError::InvalidToken)));
    }

    #[tokio::test]
    async fn ended_session_rejects_an_otherwise_valid_token() {
        let session = ten_to_eleven();
        // Long TTL so the token is still unexpired after the session ends.
        let token = AttendanceToken::new(session.id, at(10, 58), Duration::minutes(30));
        let secret = token.secret.clone();
        let service = Fixture::new(&session, Some(token)).service();

        let result = service
            .submit_scan(UserId::new(), &payload(&session, &secret), at(11, 5))
            .await;
        assert!(matches!(
            result,
            Err(ScanError::SessionNotActive(SessionStatus::Ended))
        ));
    }

    #[tokio::test]
    async fn session_with_no_token_yet_rejects_any_secret() {
        let session = ten_to_eleven();
        let service = Fixture::new(&session, None).service();

        let result = service
            .submit_scan(UserId::new(), &payload(&session, "anything"), at(10, 7))
            .await;
        assert!(matches!(result, Err(ScanError::InvalidToken)));
    }

    #[tokio::test]
    async fn unenrolled_student_is_rejected_before_any_write() {
        let session = ten_to_eleven();
        let token = token_for(&session, at(10, 5));
        let secret = token.secret.clone();

        let mut fixture = Fixture::new(&session, Some(token));
        fixture.sessions.checkpoint();
        let found = session.clone();
        fixture
            .sessions
            .expect_find_by_id()
            .returning(move |_| Ok(Some(found.clone())));
        fixture
            .sessions
            .expect_is_enrolled()
            .returning(|_, _| Ok(false));
        fixture.ledger.checkpoint();
        fixture.ledger.expect_try_insert().never();
        fixture
            .ledger
            .expect_find_by_session_and_student()
            .never();

        let result = fixture
            .service()
            .submit_scan(UserId::new(), &payload(&session, &secret), at(10, 7))
            .await;
        assert!(matches!(result, Err(ScanError::NotEnrolled)));
    }

    #[tokio::test]
    async fn repeat_scan_returns_the_existing_record() {
        let session = ten_to_eleven();
        let token = token_for(&session, at(10, 5));
        let secret = token.secret.clone();
        let student = UserId::new();
        let existing = AttendanceRecord::from_scan(
            session.id,
            student,
            at(10, 6),
            AttendanceStatus::Present,
            Some(true),
            None,
        );

        let mut fixture = Fixture::new(&session, Some(token));
        fixture.ledger.checkpoint();
        let found = existing.clone();
        fixture
            .ledger
            .expect_find_by_session_and_student()
            .returning(move |_, _| Ok(Some(found.clone())));
        fixture.ledger.expect_try_insert().never();

        let outcome = fixture
            .service()
            .submit_scan(student, &payload(&session, &secret), at(10, 9))
            .await
            .expect("soft outcome");
        assert!(matches!(outcome, ScanOutcome::AlreadyRecorded(_)));
        assert_eq!(outcome.record().id, existing.id);
    }

    #[tokio::test]
    async fn losing_the_insert_race_reads_as_already_recorded() {
        let session = ten_to_eleven();
        let token = token_for(&session, at(10, 5));
        let secret = token.secret.clone();
        let student = UserId::new();
        let winner = AttendanceRecord::from_scan(
            session.id,
            student,
            at(10, 6),
            AttendanceStatus::Present,
            None,
            None,
        );

        let mut fixture = Fixture::new(&session, Some(token));
        fixture.ledger.checkpoint();
        fixture
            .ledger
            .expect_find_by_session_and_student()
            .returning(|_, _| Ok(None));
        let winner_clone = winner.clone();
        fixture
            .ledger
            .expect_try_insert()
            .returning(move |_| Ok(LedgerInsert::Duplicate(winner_clone.clone())));

        let outcome = fixture
            .service()
            .submit_scan(student, &payload(&session, &secret), at(10, 7))
            .await
            .expect("soft outcome");
        assert!(matches!(outcome, ScanOutcome::AlreadyRecorded(_)));
        assert_eq!(outcome.record().id, winner.id);
    }

    #[tokio::test]
    async fn geofenced_venue_marks_location_validity() {
        let mut session = ten_to_eleven();
        session.venue_latitude = Some(-1.2833);
        session.venue_longitude = Some(36.8167);
        session.venue_radius_m = Some(50.0);
        let token = token_for(&session, at(10, 5));
        let secret = token.secret.clone();
        let service = Fixture::new(&session, Some(token)).service();

        let mut scan = payload(&session, &secret);
        scan.latitude = Some(-1.2833);
        scan.longitude = Some(36.8167);

        let outcome = service
            .submit_scan(UserId::new(), &scan, at(10, 7))
            .await
            .expect("scan accepted");
        assert_eq!(outcome.record().location_valid, Some(true));
    }

    #[tokio::test]
    async fn absent_location_does_not_block_the_scan() {
        let mut session = ten_to_eleven();
        session.venue_latitude = Some(-1.2833);
        session.venue_longitude = Some(36.8167);
        session.venue_radius_m = Some(50.0);
        let token = token_for(&session, at(10, 5));
        let secret = token.secret.clone();
        let service = Fixture::new(&session, Some(token)).service();

        let outcome = service
            .submit_scan(UserId::new(), &payload(&session, &secret), at(10, 7))
            .await
            .expect("scan accepted");
        assert_eq!(outcome.record().location_valid, None);
    }
}
