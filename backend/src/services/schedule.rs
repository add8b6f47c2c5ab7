//! Temporal status of a class session.
//!
//! This is the single timing authority: the display endpoint, token
//! issuance and scan validation all derive a session's status through
//! `status`/`session_status`, so what is shown can never drift from what is
//! enforced.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::models::session::{ClassSession, SessionStatus};

/// Pure status derivation. Ongoing is inclusive at both ends.
pub fn status(now: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> SessionStatus {
    if now < start {
        SessionStatus::Upcoming
    } else if now > end {
        SessionStatus::Ended
    } else {
        SessionStatus::Ongoing
    }
}

/// The session's wall-clock window, resolved in the campus timezone.
pub fn session_window(session: &ClassSession, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        to_utc(session.schedule_date, session.start_time, tz),
        to_utc(session.schedule_date, session.end_time, tz),
    )
}

pub fn session_status(session: &ClassSession, now: DateTime<Utc>, tz: &Tz) -> SessionStatus {
    let (start, end) = session_window(session, tz);
    status(now, start, end)
}

fn to_utc(date: NaiveDate, time: NaiveTime, tz: &Tz) -> DateTime<Utc> {
    match date.and_time(time).and_local_timezone(*tz) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        // DST fold: take the earlier instant.
        LocalResult::Ambiguous(earlier, _) => earlier.with_timezone(&Utc),
        // DST gap: the local time never happens; fall back to reading the
        // naive value as UTC rather than failing the whole request.
        LocalResult::None => Utc.from_utc_datetime(&date.and_time(time)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
    }

    #[test]
    fn status_covers_all_three_phases() {
        let (start, end) = (at(10, 0), at(11, 0));
        assert_eq!(status(at(9, 59), start, end), SessionStatus::Upcoming);
        assert_eq!(status(at(10, 30), start, end), SessionStatus::Ongoing);
        assert_eq!(status(at(11, 1), start, end), SessionStatus::Ended);
    }

    #[test]
    fn ongoing_is_inclusive_at_both_ends() {
        let (start, end) = (at(10, 0), at(11, 0));
        assert_eq!(status(start, start, end), SessionStatus::Ongoing);
        assert_eq!(status(end, start, end), SessionStatus::Ongoing);
    }

    #[test]
    fn status_is_monotonic_as_now_increases() {
        let (start, end) = (at(10, 0), at(11, 0));
        let rank = |s: SessionStatus| match s {
            SessionStatus::Upcoming => 0,
            SessionStatus::Ongoing => 1,
            SessionStatus::Ended => 2,
        };

        let mut now = at(9, 0);
        let mut previous = rank(status(now, start, end));
        while now <= at(12, 0) {
            let current = rank(status(now, start, end));
            assert!(current >= previous, "status regressed at {}", now);
            previous = current;
            now += Duration::minutes(1);
        }
    }

    #[test]
    fn session_window_respects_campus_timezone() {
        let session = ClassSession {
            id: crate::types::SessionId::new(),
            unit_id: crate::types::UnitId::new(),
            lecturer_id: crate::types::UserId::new(),
            venue_name: "LT-1".into(),
            venue_latitude: None,
            venue_longitude: None,
            venue_radius_m: None,
            schedule_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            created_at: Utc::now(),
        };

        // Nairobi is UTC+3 year round.
        let (start, end) = session_window(&session, &chrono_tz::Africa::Nairobi);
        assert_eq!(start, at(7, 0));
        assert_eq!(end, at(8, 0));

        assert_eq!(
            session_status(&session, at(7, 30), &chrono_tz::Africa::Nairobi),
            SessionStatus::Ongoing
        );
        assert_eq!(
            session_status(&session, at(8, 30), &chrono_tz::Africa::Nairobi),
            SessionStatus::Ended
        );
    }
}
