use thiserror::Error;

/// Errors returned by the source-catalog client.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The catalog API returned `"status": "error"` with a message.
    #[error("catalog API error: {0}")]
    Api(String),

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// Retriable: timeouts, connection failures, HTTP 5xx. Not retriable:
/// application errors and malformed responses — retrying won't fix those.
pub(crate) fn is_retriable(err: &CatalogError) -> bool {
    match err {
        CatalogError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        CatalogError::Api(_) | CatalogError::Deserialize { .. } => false,
    }
}
