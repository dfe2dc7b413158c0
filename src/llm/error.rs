//! Error types for the reasoning backend client.
//!
//! [`BackendError`] covers the failure modes a stage invocation can hit at
//! the backend boundary: rate limiting, request timeout, API-level errors,
//! malformed responses and transport failures.

use thiserror::Error;

/// Errors that can occur when calling the reasoning backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The server returned HTTP 429. `retry_after_ms` says how many
    /// milliseconds to wait before retrying.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// The request exceeded its deadline.
    #[error("backend request timed out")]
    Timeout,

    /// Error returned by the API (e.g. 401 invalid key, 500 internal error).
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The response body could not be interpreted as a completion.
    #[error("malformed backend response: {0}")]
    Malformed(String),

    /// Underlying network failure (DNS, connection refused).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl BackendError {
    /// Whether a retry within the same invocation can plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BackendError::RateLimited { .. } | BackendError::Timeout | BackendError::Network(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_display() {
        let err = BackendError::RateLimited {
            retry_after_ms: 5000,
        };
        assert_eq!(err.to_string(), "rate limited, retry after 5000ms");
    }

    #[test]
    fn api_error_display() {
        let err = BackendError::Api {
            status: 401,
            message: "Invalid API key".into(),
        };
        assert_eq!(err.to_string(), "API error (status 401): Invalid API key");
    }

    #[test]
    fn retryability_classification() {
        assert!(BackendError::Timeout.is_retryable());
        assert!(BackendError::RateLimited { retry_after_ms: 1 }.is_retryable());
        assert!(
            !BackendError::Api {
                status: 400,
                message: "bad".into()
            }
            .is_retryable()
        );
        assert!(!BackendError::Malformed("empty choices".into()).is_retryable());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BackendError>();
    }
}
