//! Market index simulation over scored trend records.
//!
//! [`compute_window`] is a pure function over the records matching one
//! (segment, market zone, week) triple: read-only, idempotent, and safe to
//! call concurrently or memoize per key. The week key is the start of the ISO
//! week containing "now" (see [`iso_week_start`]).

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::Serialize;

/// One scored record projected into a market window.
#[derive(Debug, Clone, Serialize)]
pub struct WindowEntry {
    pub record_id: i64,
    pub name: String,
    pub brand: String,
    pub score: f64,
    /// Score change since the previous week's observation.
    pub delta: f64,
    pub first_observed_at: DateTime<Utc>,
}

/// Ranked movers/winners/losers for one (segment, zone, week) snapshot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MarketWindow {
    pub top_movers: Vec<WindowEntry>,
    pub winners: Vec<WindowEntry>,
    pub losers: Vec<WindowEntry>,
}

/// Start of the ISO week (Monday 00:00:00 UTC) containing `now`.
#[must_use]
pub fn iso_week_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let date = now.date_naive();
    let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
    monday
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time")
        .and_utc()
}

/// Compute ranked movers, winners, and losers for one window.
///
/// - Top movers: all entries, by |delta| descending; ties broken by higher
///   absolute current score, then earlier `first_observed_at` (longer-tracked
///   items rank first), then record id for full determinism.
/// - Winners: `delta ≥ significance`, by delta descending.
/// - Losers: `delta ≤ −significance`, by delta ascending (most negative
///   first).
///
/// Empty input yields empty lists, never an error. Re-running on unchanged
/// data yields identical ordering.
#[must_use]
pub fn compute_window(entries: &[WindowEntry], significance: f64) -> MarketWindow {
    let mut top_movers: Vec<WindowEntry> = entries.to_vec();
    top_movers.sort_by(|a, b| {
        b.delta
            .abs()
            .total_cmp(&a.delta.abs())
            .then(b.score.abs().total_cmp(&a.score.abs()))
            .then(a.first_observed_at.cmp(&b.first_observed_at))
            .then(a.record_id.cmp(&b.record_id))
    });

    let mut winners: Vec<WindowEntry> = entries
        .iter()
        .filter(|e| e.delta >= significance)
        .cloned()
        .collect();
    winners.sort_by(|a, b| {
        b.delta
            .total_cmp(&a.delta)
            .then(a.first_observed_at.cmp(&b.first_observed_at))
            .then(a.record_id.cmp(&b.record_id))
    });

    let mut losers: Vec<WindowEntry> = entries
        .iter()
        .filter(|e| e.delta <= -significance)
        .cloned()
        .collect();
    losers.sort_by(|a, b| {
        a.delta
            .total_cmp(&b.delta)
            .then(a.first_observed_at.cmp(&b.first_observed_at))
            .then(a.record_id.cmp(&b.record_id))
    });

    MarketWindow {
        top_movers,
        winners,
        losers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(record_id: i64, score: f64, delta: f64, observed_day: u32) -> WindowEntry {
        WindowEntry {
            record_id,
            name: format!("item-{record_id}"),
            brand: "Maison Rive".to_string(),
            score,
            delta,
            first_observed_at: Utc.with_ymd_and_hms(2026, 1, observed_day, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn iso_week_start_is_monday_midnight() {
        // 2026-03-04 is a Wednesday; its ISO week starts Monday 2026-03-02.
        let wednesday = Utc.with_ymd_and_hms(2026, 3, 4, 15, 30, 0).unwrap();
        let start = iso_week_start(wednesday);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn iso_week_start_of_monday_is_itself_at_midnight() {
        let monday = Utc.with_ymd_and_hms(2026, 3, 2, 23, 59, 59).unwrap();
        assert_eq!(
            iso_week_start(monday),
            Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn iso_week_start_crosses_month_boundary() {
        // 2026-05-01 is a Friday; its ISO week starts Monday 2026-04-27.
        let friday = Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap();
        assert_eq!(
            iso_week_start(friday),
            Utc.with_ymd_and_hms(2026, 4, 27, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn empty_input_yields_empty_window() {
        let window = compute_window(&[], 10.0);
        assert!(window.top_movers.is_empty());
        assert!(window.winners.is_empty());
        assert!(window.losers.is_empty());
    }

    #[test]
    fn winners_and_losers_are_disjoint_and_thresholded() {
        let entries = vec![
            entry(1, 80.0, 20.0, 1),
            entry(2, 40.0, -15.0, 2),
            entry(3, 60.0, 4.0, 3),
            entry(4, 55.0, -4.0, 4),
        ];
        let window = compute_window(&entries, 10.0);

        assert!(window.winners.iter().all(|e| e.delta >= 10.0));
        assert!(window.losers.iter().all(|e| e.delta <= -10.0));
        for winner in &window.winners {
            assert!(
                window.losers.iter().all(|l| l.record_id != winner.record_id),
                "record {} in both winners and losers",
                winner.record_id
            );
        }
        // Near-zero fluctuation is filtered from both lists.
        assert_eq!(window.winners.len(), 1);
        assert_eq!(window.losers.len(), 1);
    }

    #[test]
    fn mover_ties_prefer_higher_score_then_longer_tracking() {
        let entries = vec![
            entry(1, 30.0, 8.0, 5),
            entry(2, 70.0, 8.0, 5),  // same |delta|, higher score: ranks first
            entry(3, 30.0, -8.0, 1), // same |delta| and score as 1, tracked longer
        ];
        let window = compute_window(&entries, 10.0);
        let order: Vec<i64> = window.top_movers.iter().map(|e| e.record_id).collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn recomputing_unchanged_data_is_byte_identical() {
        let entries = vec![
            entry(1, 80.0, 20.0, 1),
            entry(2, 75.0, -5.0, 2),
            entry(3, 60.0, 0.0, 3),
        ];
        let a = serde_json::to_string(&compute_window(&entries, 10.0)).expect("serialize");
        let b = serde_json::to_string(&compute_window(&entries, 10.0)).expect("serialize");
        assert_eq!(a, b);
    }

    #[test]
    fn five_record_window_matches_expected_index() {
        // Scores [80, 75, 60, 40, 10] against prior week [60, 80, 60, 55, 10].
        let entries = vec![
            entry(1, 80.0, 20.0, 1),
            entry(2, 75.0, -5.0, 2),
            entry(3, 60.0, 0.0, 3),
            entry(4, 40.0, -15.0, 4),
            entry(5, 10.0, 0.0, 5),
        ];
        let window = compute_window(&entries, 10.0);

        let winners: Vec<(f64, f64)> = window.winners.iter().map(|e| (e.score, e.delta)).collect();
        assert_eq!(winners, vec![(80.0, 20.0)]);

        let losers: Vec<(f64, f64)> = window.losers.iter().map(|e| (e.score, e.delta)).collect();
        assert_eq!(losers, vec![(40.0, -15.0)]);

        let mover_scores: Vec<f64> = window.top_movers.iter().map(|e| e.score).collect();
        // |delta| desc: 20, 15, 5, then the two zero-delta records by score.
        assert_eq!(mover_scores, vec![80.0, 40.0, 75.0, 60.0, 10.0]);
    }
}
