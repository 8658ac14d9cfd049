use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One raw trending item as the source catalog reports it.
///
/// Field shapes follow the catalog wire format; anything user-facing goes
/// through [`crate::normalize_items`] before leaving this crate.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCatalogItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    /// Popularity on the catalog's 0–100 scale.
    #[serde(default)]
    pub popularity: f64,
    /// Week-over-week demand velocity on the same scale.
    #[serde(default)]
    pub velocity: f64,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A normalized, scrubbed observation ready for the scoring pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendObservation {
    pub source_ref: String,
    pub name: String,
    /// Normalized brand; distributor names are already replaced here.
    pub brand: String,
    pub category: String,
    pub style_tag: String,
    pub segment: String,
    pub market_zone: String,
    pub popularity: f64,
    pub velocity: f64,
    pub observed_at: DateTime<Utc>,
}
