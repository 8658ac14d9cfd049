use thiserror::Error;

/// Errors returned by the generative-service clients.
#[derive(Debug, Error)]
pub enum GenaiError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service returned `"status": "error"` with a message.
    #[error("generation service error: {0}")]
    Api(String),

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The service answered OK but the payload carried no usable content.
    #[error("generation service returned empty content for {0}")]
    Empty(String),
}

impl GenaiError {
    /// Classify the error as retryable (transient) or terminal.
    ///
    /// Timeouts, connection failures, and 5xx responses are worth a later
    /// retry; application errors, malformed responses, and empty payloads are
    /// not. The enrichment pipeline makes at most one attempt per record per
    /// batch either way — an unenriched record simply stays eligible for the
    /// next pass.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            GenaiError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            GenaiError::Api(_) | GenaiError::Deserialize { .. } | GenaiError::Empty(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_is_not_retryable() {
        assert!(!GenaiError::Api("quota exhausted".to_owned()).is_retryable());
    }

    #[test]
    fn deserialize_error_is_not_retryable() {
        let source = serde_json::from_str::<()>("nope").unwrap_err();
        let err = GenaiError::Deserialize {
            context: "test".to_owned(),
            source,
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn empty_error_is_not_retryable() {
        assert!(!GenaiError::Empty("advisory".to_owned()).is_retryable());
    }
}
