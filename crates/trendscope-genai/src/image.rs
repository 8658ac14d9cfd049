//! Client for the image-generation service.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::GenaiError;
use crate::text::check_api_error;

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageEnvelope {
    #[allow(dead_code)]
    status: String,
    image_url: Option<String>,
}

/// Client for the image-generation service.
pub struct ImageGenClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl ImageGenClient {
    /// Creates a client for the given base URL (point at wiremock in tests).
    ///
    /// # Errors
    ///
    /// Returns [`GenaiError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed, or [`GenaiError::Api`] if `base_url` is not a valid URL.
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        timeout_secs: u64,
    ) -> Result<Self, GenaiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("trendscope/0.1 (trend-intelligence)")
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .map_err(|e| GenaiError::Api(format!("invalid base URL '{base_url}': {e}")))?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.map(ToOwned::to_owned),
        })
    }

    /// Request a representative image for the given prompt.
    ///
    /// Calls `POST /v1/images` and returns the hosted image reference. One
    /// attempt; no internal retry.
    ///
    /// # Errors
    ///
    /// - [`GenaiError::Api`] if the service returns an error status.
    /// - [`GenaiError::Http`] on network failure or non-2xx HTTP status.
    /// - [`GenaiError::Deserialize`] if the response does not match the
    ///   expected shape.
    /// - [`GenaiError::Empty`] if the service answers OK without an image URL.
    pub async fn generate_image(&self, prompt: &str) -> Result<String, GenaiError> {
        let url = self
            .base_url
            .join("v1/images")
            .map_err(|e| GenaiError::Api(format!("invalid endpoint path: {e}")))?;

        let mut builder = self.client.post(url).json(&ImageRequest { prompt });
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let body: serde_json::Value = builder.send().await?.error_for_status()?.json().await?;
        if let Err(e) = check_api_error(&body) {
            tracing::warn!(error = %e, "image generation returned an error envelope");
            return Err(e);
        }

        let envelope: ImageEnvelope =
            serde_json::from_value(body).map_err(|e| GenaiError::Deserialize {
                context: "generate_image".to_owned(),
                source: e,
            })?;

        match envelope.image_url {
            Some(image_url) if !image_url.trim().is_empty() => Ok(image_url),
            _ => Err(GenaiError::Empty("image_url".to_owned())),
        }
    }
}
