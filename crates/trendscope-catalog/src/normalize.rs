//! Normalization of raw catalog items into scrubbed trend observations.

use chrono::{DateTime, Utc};
use trendscope_core::{BrandScrubber, NEUTRAL_BRAND_PLACEHOLDER};

use crate::types::{RawCatalogItem, TrendObservation};

/// Normalize raw items for one (segment, market zone) fetch.
///
/// Items with an empty id or title are dropped (logged, not errored).
/// Popularity and velocity are clamped to [0, 100]. The brand field is
/// trimmed and scrubbed: a missing, empty, or distributor brand becomes the
/// neutral placeholder — distributor names never leave this function.
#[must_use]
pub fn normalize_items(
    items: Vec<RawCatalogItem>,
    scrubber: &BrandScrubber,
    segment: &str,
    market_zone: &str,
    fetched_at: DateTime<Utc>,
) -> Vec<TrendObservation> {
    let mut observations = Vec::with_capacity(items.len());

    for item in items {
        let source_ref = item.id.trim();
        let name = item.title.trim();
        if source_ref.is_empty() || name.is_empty() {
            tracing::debug!(segment, market_zone, "catalog item missing id or title; dropped");
            continue;
        }

        let brand = match item.brand.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => scrubber.scrub_brand(raw),
            _ => NEUTRAL_BRAND_PLACEHOLDER.to_string(),
        };

        observations.push(TrendObservation {
            source_ref: source_ref.to_string(),
            name: scrubber.scrub(name),
            brand,
            category: item
                .category
                .as_deref()
                .map_or("uncategorized", str::trim)
                .to_string(),
            style_tag: item.style.as_deref().map_or("classic", str::trim).to_string(),
            segment: segment.to_string(),
            market_zone: market_zone.to_string(),
            popularity: clamp_signal(item.popularity),
            velocity: clamp_signal(item.velocity),
            observed_at: item.updated_at.unwrap_or(fetched_at),
        });
    }

    observations
}

fn clamp_signal(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn scrubber() -> BrandScrubber {
        BrandScrubber::new(&["MegaMart".to_string()])
    }

    fn fetched_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn raw(id: &str, title: &str, brand: Option<&str>) -> RawCatalogItem {
        RawCatalogItem {
            id: id.to_string(),
            title: title.to_string(),
            brand: brand.map(ToOwned::to_owned),
            category: Some("outerwear".to_string()),
            style: Some("workwear".to_string()),
            popularity: 64.0,
            velocity: 12.0,
            updated_at: None,
        }
    }

    #[test]
    fn well_formed_item_normalizes() {
        let out = normalize_items(
            vec![raw("sku-1", "Veste workwear", Some("Maison Rive"))],
            &scrubber(),
            "homme",
            "EU",
            fetched_at(),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source_ref, "sku-1");
        assert_eq!(out[0].brand, "Maison Rive");
        assert_eq!(out[0].segment, "homme");
        assert_eq!(out[0].market_zone, "EU");
        assert_eq!(out[0].observed_at, fetched_at());
    }

    #[test]
    fn distributor_brand_is_replaced() {
        let out = normalize_items(
            vec![raw("sku-2", "Chemise oxford", Some("MegaMart"))],
            &scrubber(),
            "homme",
            "EU",
            fetched_at(),
        );
        assert_eq!(out[0].brand, NEUTRAL_BRAND_PLACEHOLDER);
    }

    #[test]
    fn missing_brand_gets_placeholder() {
        let out = normalize_items(
            vec![raw("sku-3", "Pantalon cargo", None)],
            &scrubber(),
            "homme",
            "EU",
            fetched_at(),
        );
        assert_eq!(out[0].brand, NEUTRAL_BRAND_PLACEHOLDER);
    }

    #[test]
    fn distributor_name_in_title_is_scrubbed() {
        let out = normalize_items(
            vec![raw("sku-4", "MegaMart exclusive parka", Some("Nordline"))],
            &scrubber(),
            "homme",
            "EU",
            fetched_at(),
        );
        assert!(!out[0].name.contains("MegaMart"), "got '{}'", out[0].name);
    }

    #[test]
    fn blank_id_or_title_drops_the_item() {
        let out = normalize_items(
            vec![raw("", "Veste", Some("X")), raw("sku-5", "  ", Some("X"))],
            &scrubber(),
            "homme",
            "EU",
            fetched_at(),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn out_of_range_signals_are_clamped() {
        let mut item = raw("sku-6", "Bonnet", Some("X"));
        item.popularity = 640.0;
        item.velocity = -5.0;
        let out = normalize_items(vec![item], &scrubber(), "homme", "EU", fetched_at());
        assert_eq!(out[0].popularity, 100.0);
        assert_eq!(out[0].velocity, 0.0);
    }
}
