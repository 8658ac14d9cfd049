//! Trend scoring and lifecycle phase classification.
//!
//! Scores live on a bounded 0–100 scale. Malformed or out-of-range inputs are
//! clamped, never rejected, and classification is total: the worst case falls
//! back to [`TrendPhase::Emerging`]. Numeric thresholds are policy, held in
//! [`ScoringPolicy`]; the mechanism (clamping, no-signal retention,
//! deterministic tie-breaks) is fixed.

use chrono::{DateTime, Utc};
use trendscope_core::TrendPhase;

pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 100.0;

/// One popularity/velocity observation from the source catalog.
///
/// Both signal values are expected on the score scale (0–100); out-of-range
/// values are clamped during blending.
#[derive(Debug, Clone, Copy)]
pub struct SignalSample {
    pub popularity: f64,
    pub velocity: f64,
    pub observed_at: DateTime<Utc>,
}

/// Tunable scoring and classification thresholds.
#[derive(Debug, Clone)]
pub struct ScoringPolicy {
    /// Score delta above which a trend counts as growing.
    pub growth_threshold: f64,
    /// Score delta below which (negated) a trend counts as declining.
    pub decline_threshold: f64,
    /// Minimum score for the growing phase; weak scores stay emerging even
    /// with a positive delta.
    pub baseline: f64,
    /// Score at or above which a flat trajectory sustains peak.
    pub high_water: f64,
    /// Sustained decline below this score marks a trend dormant.
    pub dormant_floor: f64,
    /// Segment percentile rank at or above which a growing trend is peak.
    pub peak_percentile: f64,
    /// Minimum |delta| for market-window winners/losers membership.
    pub significance: f64,
    /// |delta| at or below this counts as a flat (sustaining) trajectory.
    pub sustain_band: f64,
    /// Half-life in hours for recency weighting of catalog signals.
    pub recency_half_life_hours: f64,
    /// Relative weight of the popularity signal (velocity gets the rest).
    pub popularity_weight: f64,
    /// Blend factor for the prior score when new signals arrive.
    pub prior_weight: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            growth_threshold: 5.0,
            decline_threshold: 5.0,
            baseline: 40.0,
            high_water: 70.0,
            dormant_floor: 15.0,
            peak_percentile: 0.9,
            significance: 10.0,
            sustain_band: 2.0,
            recency_half_life_hours: 72.0,
            popularity_weight: 0.7,
            prior_weight: 0.3,
        }
    }
}

fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        return SCORE_MIN;
    }
    value.clamp(SCORE_MIN, SCORE_MAX)
}

/// Combine recency-weighted catalog signals with the prior score.
///
/// Zero new signal in the observation window retains the prior score
/// unchanged (clamped) — no silent decay. With signals present, each sample
/// contributes `popularity_weight × popularity + (1 − popularity_weight) ×
/// velocity`, weighted by `0.5^(age / half_life)`, then blended with the
/// prior by `prior_weight`. The result is always within [0, 100].
#[must_use]
pub fn blend_score(
    prior: f64,
    signals: &[SignalSample],
    now: DateTime<Utc>,
    policy: &ScoringPolicy,
) -> f64 {
    let prior = clamp_score(prior);
    if signals.is_empty() {
        return prior;
    }

    let velocity_weight = 1.0 - policy.popularity_weight;
    let mut weighted_sum = 0.0_f64;
    let mut weight_total = 0.0_f64;

    for sample in signals {
        #[allow(clippy::cast_precision_loss)]
        let age_hours = (now - sample.observed_at).num_minutes() as f64 / 60.0;
        let age_hours = age_hours.max(0.0);
        let recency = 0.5_f64.powf(age_hours / policy.recency_half_life_hours.max(1.0));
        let raw = policy.popularity_weight * clamp_score(sample.popularity)
            + velocity_weight * clamp_score(sample.velocity);
        weighted_sum += recency * raw;
        weight_total += recency;
    }

    if weight_total <= f64::EPSILON {
        return prior;
    }

    let signal_score = weighted_sum / weight_total;
    clamp_score(policy.prior_weight * prior + (1.0 - policy.prior_weight) * signal_score)
}

/// Fraction of `scores` at or below `value`, in (0, 1].
///
/// Used for the segment-relative peak test. An empty batch ranks the value
/// at the top — a lone record in its segment is, trivially, its segment's
/// strongest trend.
#[must_use]
pub fn percentile_rank(scores: &[f64], value: f64) -> f64 {
    if scores.is_empty() {
        return 1.0;
    }
    let value = clamp_score(value);
    let at_or_below = scores
        .iter()
        .filter(|s| clamp_score(**s) <= value)
        .count();
    #[allow(clippy::cast_precision_loss)]
    let rank = at_or_below as f64 / scores.len() as f64;
    rank
}

/// Classify a score trajectory into a lifecycle phase.
///
/// `history` is chronological (oldest first, newest last) and is clamped
/// before evaluation. `segment_percentile` is the record's percentile rank
/// within its segment, when known.
///
/// Deterministic and independent of batch processing order. Fewer than two
/// observations force `Emerging`. A sustained slide below the dormant floor
/// is always `Dormant` (it subsumes plain decline); otherwise, when a
/// trajectory qualifies for more than one phase at a threshold boundary, the
/// phase requiring the stronger evidence wins (peak > growing > emerging >
/// declining).
#[must_use]
pub fn classify(
    history: &[f64],
    segment_percentile: Option<f64>,
    policy: &ScoringPolicy,
) -> TrendPhase {
    if history.len() < 2 {
        return TrendPhase::Emerging;
    }

    let clamped: Vec<f64> = history.iter().map(|s| clamp_score(*s)).collect();
    let score = clamped[clamped.len() - 1];
    let delta = score - clamped[clamped.len() - 2];
    let prior_delta = if clamped.len() >= 3 {
        Some(clamped[clamped.len() - 2] - clamped[clamped.len() - 3])
    } else {
        None
    };

    let mut candidates: Vec<TrendPhase> = Vec::new();

    if delta > policy.growth_threshold && score > policy.baseline {
        candidates.push(TrendPhase::Growing);
        if segment_percentile.is_some_and(|p| p >= policy.peak_percentile) {
            candidates.push(TrendPhase::Peak);
        }
    }

    // Flat trajectory at a high score sustains peak.
    if delta.abs() <= policy.sustain_band && score >= policy.high_water {
        candidates.push(TrendPhase::Peak);
    }

    if delta < -policy.decline_threshold {
        // Dormancy requires evidence of a sustained slide, not one bad week.
        // It subsumes plain decline, so it is returned directly rather than
        // fed through the evidence ranking (which would prefer Declining).
        if score < policy.dormant_floor && prior_delta.is_some_and(|d| d < 0.0) {
            return TrendPhase::Dormant;
        }
        candidates.push(TrendPhase::Declining);
    }

    candidates
        .into_iter()
        .max_by_key(|phase| phase.evidence_rank())
        .unwrap_or(TrendPhase::Emerging)
}
