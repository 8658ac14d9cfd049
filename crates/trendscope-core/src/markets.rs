use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One demographic segment tracked by the engine, e.g. `homme` 18–35.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentConfig {
    pub name: String,
    pub gender: Option<String>,
    pub age_min: Option<u8>,
    pub age_max: Option<u8>,
}

/// Market registry loaded from `config/markets.yaml`.
///
/// `zones` are geographic market zones (e.g. `EU`, `US`), `segments` are the
/// demographic segments index computation is sliced by, and `distributors`
/// lists distributor/retailer names that must never surface in user-facing
/// output (see [`crate::BrandScrubber`]).
#[derive(Debug, Deserialize)]
pub struct MarketsFile {
    pub zones: Vec<String>,
    pub segments: Vec<SegmentConfig>,
    #[serde(default)]
    pub distributors: Vec<String>,
}

impl MarketsFile {
    /// Segment names in file order, the order turbo-mode subsetting uses.
    #[must_use]
    pub fn segment_names(&self) -> Vec<String> {
        self.segments.iter().map(|s| s.name.clone()).collect()
    }
}

/// Load and validate the markets configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_markets(path: &Path) -> Result<MarketsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::MarketsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let markets: MarketsFile = serde_yaml::from_str(&content)?;
    validate_markets(&markets)?;
    Ok(markets)
}

fn validate_markets(markets: &MarketsFile) -> Result<(), ConfigError> {
    if markets.zones.is_empty() {
        return Err(ConfigError::Validation(
            "markets file must declare at least one zone".to_string(),
        ));
    }
    if markets.segments.is_empty() {
        return Err(ConfigError::Validation(
            "markets file must declare at least one segment".to_string(),
        ));
    }

    let mut seen_zones = HashSet::new();
    for zone in &markets.zones {
        if zone.trim().is_empty() {
            return Err(ConfigError::Validation(
                "zone names must be non-empty".to_string(),
            ));
        }
        if !seen_zones.insert(zone.as_str()) {
            return Err(ConfigError::Validation(format!("duplicate zone '{zone}'")));
        }
    }

    let mut seen_segments = HashSet::new();
    for segment in &markets.segments {
        if segment.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "segment names must be non-empty".to_string(),
            ));
        }
        if !seen_segments.insert(segment.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate segment '{}'",
                segment.name
            )));
        }
        if let (Some(min), Some(max)) = (segment.age_min, segment.age_max) {
            if min > max {
                return Err(ConfigError::Validation(format!(
                    "segment '{}' has age_min {min} greater than age_max {max}",
                    segment.name
                )));
            }
        }
    }

    Ok(())
}
