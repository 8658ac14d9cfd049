//! Client for the advisory text-generation service.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::GenaiError;

/// Prompt context sent to the text-generation service.
///
/// Carries the trend's classification and current scoring so the service can
/// ground the advisory in the record's actual trajectory.
#[derive(Debug, Clone, Serialize)]
pub struct AdvisoryRequest {
    pub name: String,
    pub brand: String,
    pub category: String,
    pub style_tag: String,
    pub segment: String,
    pub score: f64,
    pub phase: String,
}

/// Advisory text plus the numeric-score rationale returned by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct Advisory {
    pub advisory: String,
    pub rationale: String,
}

#[derive(Debug, Deserialize)]
struct AdvisoryEnvelope {
    #[allow(dead_code)]
    status: String,
    advisory: Option<String>,
    rationale: Option<String>,
}

/// Client for the text-generation service.
pub struct TextGenClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl TextGenClient {
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

    /// Request advisory text and rationale for one trend.
    ///
    /// Calls `POST /v1/advisories` with the prompt context and returns the
    /// parsed [`Advisory`]. One attempt; no internal retry.
    ///
    /// # Errors
    ///
    /// - [`GenaiError::Api`] if the service returns an error status.
    /// - [`GenaiError::Http`] on network failure or non-2xx HTTP status.
    /// - [`GenaiError::Deserialize`] if the response does not match the
    ///   expected shape.
    /// - [`GenaiError::Empty`] if the service answers OK without advisory text.
    pub async fn generate_advisory(&self, request: &AdvisoryRequest) -> Result<Advisory, GenaiError> {
        let url = self
            .base_url
            .join("v1/advisories")
            .map_err(|e| GenaiError::Api(format!("invalid endpoint path: {e}")))?;

        let mut builder = self.client.post(url).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let body: serde_json::Value = builder.send().await?.error_for_status()?.json().await?;
        if let Err(e) = check_api_error(&body) {
            tracing::warn!(trend = %request.name, error = %e, "text generation returned an error envelope");
            return Err(e);
        }

        let envelope: AdvisoryEnvelope =
            serde_json::from_value(body).map_err(|e| GenaiError::Deserialize {
                context: format!("generate_advisory(name={})", request.name),
                source: e,
            })?;

        match (envelope.advisory, envelope.rationale) {
            (Some(advisory), Some(rationale)) if !advisory.trim().is_empty() => Ok(Advisory {
                advisory,
                rationale,
            }),
            _ => Err(GenaiError::Empty(format!(
                "advisory for '{}'",
                request.name
            ))),
        }
    }
}

/// Surface `"status": "error"` envelopes as [`GenaiError::Api`].
pub(crate) fn check_api_error(body: &serde_json::Value) -> Result<(), GenaiError> {
    if body.get("status").and_then(|s| s.as_str()) == Some("error") {
        let message = body
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown error")
            .to_owned();
        return Err(GenaiError::Api(message));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_api_error_passes_ok_status() {
        let body = serde_json::json!({ "status": "ok", "advisory": "x", "rationale": "y" });
        assert!(check_api_error(&body).is_ok());
    }

    #[test]
    fn check_api_error_surfaces_message() {
        let body = serde_json::json!({ "status": "error", "message": "model overloaded" });
        let err = check_api_error(&body).unwrap_err();
        assert!(matches!(err, GenaiError::Api(m) if m == "model overloaded"));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = TextGenClient::new("not a url", None, 30);
        assert!(matches!(result, Err(GenaiError::Api(_))));
    }
}
