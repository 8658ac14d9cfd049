//! Calendar-month arithmetic for the usage quota ledger.
//!
//! Usage is an append-only event stream; a user's count for a feature is a
//! pure function of (user, feature, month). The month boundary is the
//! calendar month in UTC, the service reference timezone.

use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// Half-open calendar-month window `[start, end)` containing `at`.
#[must_use]
pub fn month_bounds(at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let date = at.date_naive();
    let start = NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
        .expect("first of month is always valid");
    let end = if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    }
    .expect("first of next month is always valid");

    (
        start.and_hms_opt(0, 0, 0).expect("midnight").and_utc(),
        end.and_hms_opt(0, 0, 0).expect("midnight").and_utc(),
    )
}

/// Count events falling inside the calendar month containing `at`.
///
/// Pure counterpart of the SQL aggregation in the storage layer; the ledger
/// itself holds no business limits — callers compare the count against their
/// own tier policy.
#[must_use]
pub fn count_in_month(events: &[DateTime<Utc>], at: DateTime<Utc>) -> usize {
    let (start, end) = month_bounds(at);
    events.iter().filter(|t| **t >= start && **t < end).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn mid_month_bounds_cover_the_calendar_month() {
        let at = Utc.with_ymd_and_hms(2026, 8, 24, 13, 45, 0).unwrap();
        let (start, end) = month_bounds(at);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn december_rolls_into_next_year() {
        let at = Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap();
        let (start, end) = month_bounds(at);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn three_events_count_in_their_month_and_zero_in_the_next() {
        let events = vec![
            Utc.with_ymd_and_hms(2026, 8, 2, 10, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 8, 15, 11, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 8, 31, 23, 59, 59).unwrap(),
        ];
        let in_august = Utc.with_ymd_and_hms(2026, 8, 20, 0, 0, 0).unwrap();
        let in_september = Utc.with_ymd_and_hms(2026, 9, 5, 0, 0, 0).unwrap();

        assert_eq!(count_in_month(&events, in_august), 3);
        assert_eq!(count_in_month(&events, in_september), 0);
    }

    #[test]
    fn month_start_is_inclusive_and_end_exclusive() {
        let events = vec![
            Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap(),
        ];
        let in_august = Utc.with_ymd_and_hms(2026, 8, 10, 0, 0, 0).unwrap();
        assert_eq!(count_in_month(&events, in_august), 1);
    }
}
