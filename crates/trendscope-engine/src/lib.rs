//! Trend intelligence engine: scoring and phase classification, market index
//! simulation, the enrichment pipeline, quota month arithmetic, and the brain
//! cycle state machine.
//!
//! Everything here is either pure (scoring, classification, window
//! computation, planning) or generic over narrow seams (the enrichment store
//! and generator traits), so the algorithmic core is testable without a
//! database or live services.

pub mod cycle;
pub mod enrich;
pub mod market;
pub mod quota;
pub mod score;

pub use cycle::{CycleDeadline, CycleMode, CyclePlan, CycleReport, CycleStage};
pub use enrich::{
    run_enrichment, AdvisoryGenerator, EnrichCandidate, Enrichment, EnrichmentFailure,
    EnrichmentReport, EnrichmentStore, ImageGenerator,
};
pub use market::{compute_window, iso_week_start, MarketWindow, WindowEntry};
pub use quota::{count_in_month, month_bounds};
pub use score::{blend_score, classify, percentile_rank, ScoringPolicy, SignalSample};
