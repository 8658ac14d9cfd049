//! HTTP client for the source-catalog trending feed.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::Deserialize;

use crate::error::CatalogError;
use crate::retry::retry_with_backoff;
use crate::types::RawCatalogItem;

#[derive(Debug, Deserialize)]
struct TrendingEnvelope {
    #[allow(dead_code)]
    status: String,
    items: Vec<RawCatalogItem>,
}

/// Client for the source catalog's trending-products API.
///
/// Use [`CatalogClient::new`] with the configured base URL, or point it at a
/// wiremock server in tests.
pub struct CatalogClient {
    client: Client,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl CatalogClient {
    /// Creates a client for the given catalog base URL.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`CatalogError::Api`] if `base_url` is not a
    /// valid URL.
    pub fn new(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .map_err(|e| CatalogError::Api(format!("invalid base URL '{base_url}': {e}")))?;

        Ok(Self {
            client,
            base_url,
            max_retries,
            backoff_base_ms,
        })
    }

    /// Fetch the trending items for one (segment, market zone) pair.
    ///
    /// Calls `GET /v1/products/trending` with retry on transient failures.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::Api`] if the catalog returns an error status.
    /// - [`CatalogError::Http`] on network failure or non-2xx HTTP status
    ///   after retries are exhausted.
    /// - [`CatalogError::Deserialize`] if the response does not match the
    ///   expected shape.
    pub async fn fetch_trending(
        &self,
        segment: &str,
        market_zone: &str,
    ) -> Result<Vec<RawCatalogItem>, CatalogError> {
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.fetch_trending_once(segment, market_zone)
        })
        .await
    }

    async fn fetch_trending_once(
        &self,
        segment: &str,
        market_zone: &str,
    ) -> Result<Vec<RawCatalogItem>, CatalogError> {
        let mut url = self
            .base_url
            .join("v1/products/trending")
            .map_err(|e| CatalogError::Api(format!("invalid endpoint path: {e}")))?;
        url.query_pairs_mut()
            .append_pair("segment", segment)
            .append_pair("zone", market_zone);

        let body: serde_json::Value = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if body.get("status").and_then(|s| s.as_str()) == Some("error") {
            let message = body
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error")
                .to_owned();
            return Err(CatalogError::Api(message));
        }

        let envelope: TrendingEnvelope =
            serde_json::from_value(body).map_err(|e| CatalogError::Deserialize {
                context: format!("fetch_trending(segment={segment}, zone={market_zone})"),
                source: e,
            })?;

        Ok(envelope.items)
    }
}
