//! Distributor-name scrubbing for user-facing text.
//!
//! Source catalogs sometimes carry the distributor or retailer name in the
//! brand field. Distributor names must never surface in user-facing output;
//! the scrubber substitutes a neutral placeholder wherever one appears.

use regex::RegexSet;

/// Neutral replacement for any distributor/retailer name found in source data.
pub const NEUTRAL_BRAND_PLACEHOLDER: &str = "Independent label";

/// Case-insensitive matcher over the configured distributor names.
#[derive(Debug, Clone)]
pub struct BrandScrubber {
    set: RegexSet,
    patterns: Vec<regex::Regex>,
}

impl BrandScrubber {
    /// Build a scrubber from distributor names (typically `markets.yaml`).
    ///
    /// Names are matched case-insensitively on word boundaries. Empty names
    /// are ignored. An empty list produces a scrubber that matches nothing.
    #[must_use]
    pub fn new(distributors: &[String]) -> Self {
        let sources: Vec<String> = distributors
            .iter()
            .filter(|name| !name.trim().is_empty())
            .map(|name| format!(r"(?i)\b{}\b", regex::escape(name.trim())))
            .collect();

        // Patterns are escaped literals, so compilation cannot fail.
        let set = RegexSet::new(&sources).unwrap_or_else(|_| RegexSet::empty());
        let patterns = sources
            .iter()
            .filter_map(|s| regex::Regex::new(s).ok())
            .collect();

        Self { set, patterns }
    }

    /// True if the text contains any configured distributor name.
    #[must_use]
    pub fn contains_distributor(&self, text: &str) -> bool {
        self.set.is_match(text)
    }

    /// Replace every distributor-name occurrence with the neutral placeholder.
    ///
    /// Text without a match is returned unchanged (no allocation churn on the
    /// common path).
    #[must_use]
    pub fn scrub(&self, text: &str) -> String {
        if !self.set.is_match(text) {
            return text.to_string();
        }
        let mut out = text.to_string();
        for pattern in &self.patterns {
            out = pattern
                .replace_all(&out, NEUTRAL_BRAND_PLACEHOLDER)
                .into_owned();
        }
        out
    }

    /// Scrub a brand field: if the whole value is a distributor name, the
    /// result is exactly the placeholder.
    #[must_use]
    pub fn scrub_brand(&self, brand: &str) -> String {
        self.scrub(brand.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scrubber() -> BrandScrubber {
        BrandScrubber::new(&["MegaMart".to_string(), "StyleHub Retail".to_string()])
    }

    #[test]
    fn clean_brand_passes_through() {
        assert_eq!(scrubber().scrub_brand("Maison Rive"), "Maison Rive");
    }

    #[test]
    fn distributor_brand_is_replaced_entirely() {
        assert_eq!(scrubber().scrub_brand("MegaMart"), NEUTRAL_BRAND_PLACEHOLDER);
    }

    #[test]
    fn match_is_case_insensitive() {
        assert_eq!(scrubber().scrub_brand("megamart"), NEUTRAL_BRAND_PLACEHOLDER);
    }

    #[test]
    fn embedded_distributor_name_is_replaced_in_place() {
        let out = scrubber().scrub("Jacket sold by StyleHub Retail in EU");
        assert_eq!(out, format!("Jacket sold by {NEUTRAL_BRAND_PLACEHOLDER} in EU"));
    }

    #[test]
    fn word_boundary_prevents_partial_match() {
        // "MegaMartin" is a different token and must not be scrubbed.
        assert_eq!(scrubber().scrub_brand("MegaMartin"), "MegaMartin");
    }

    #[test]
    fn empty_list_matches_nothing() {
        let s = BrandScrubber::new(&[]);
        assert!(!s.contains_distributor("MegaMart"));
        assert_eq!(s.scrub_brand("MegaMart"), "MegaMart");
    }
}
