mod app_config;
mod config;
mod markets;
mod phase;
mod scrub;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use markets::{load_markets, MarketsFile, SegmentConfig};
pub use phase::TrendPhase;
pub use scrub::{BrandScrubber, NEUTRAL_BRAND_PLACEHOLDER};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read markets file at {path}: {source}")]
    MarketsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse markets file: {0}")]
    MarketsFileParse(#[from] serde_yaml::Error),
    #[error("markets file validation failed: {0}")]
    Validation(String),
}
