//! Client for the external fashion source catalog.
//!
//! Fetches trending-product signals per (segment, market zone), retries
//! transient failures with exponential backoff and jitter, and normalizes raw
//! items into [`TrendObservation`]s — including the distributor-name scrub
//! that keeps retailer identities out of everything downstream.

mod client;
mod error;
mod normalize;
mod retry;
mod types;

pub use client::CatalogClient;
pub use error::CatalogError;
pub use normalize::normalize_items;
pub use types::{RawCatalogItem, TrendObservation};
