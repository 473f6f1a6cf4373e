//! Error types and retry classification for the OpenFIGI client.
//!
//! This module provides:
//! - [`TransportError`]: what went wrong on a single HTTP exchange
//! - [`MappingError`]: the per-job failure carried inside a [`MappingResult`](crate::MappingResult)
//! - [`RetryClass`]: classification for determining retry behavior

mod retry;

pub use retry::RetryClass;

use std::time::Duration;

use thiserror::Error;

/// Delay applied when the oracle throttles us without a `Retry-After` header.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Errors raised by a [`FigiTransport`](crate::transport::FigiTransport) for one request.
///
/// Each variant is classified into a [`RetryClass`] via [`retry_class`](Self::retry_class),
/// which drives the client's retry loop.
#[derive(Error, Debug)]
pub enum TransportError {
    /// HTTP 429. The oracle asked us to slow down.
    #[error("Throttled by oracle")]
    Throttled {
        /// Parsed `Retry-After` header, if the oracle sent one
        retry_after: Option<Duration>,
    },

    /// HTTP 400. The request body was rejected as malformed.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Any other non-success status.
    #[error("Oracle returned HTTP {status}: {body}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// The request exceeded its timeout.
    #[error("Request timed out")]
    Timeout,

    /// Connection-level failure.
    #[error("Network error: {0}")]
    Network(String),

    /// The response body could not be decoded.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The HTTP client could not be constructed from the configuration.
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl TransportError {
    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use secmaster_openfigi::errors::{RetryClass, TransportError};
    ///
    /// let error = TransportError::BadRequest("idType".to_string());
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    ///
    /// let error = TransportError::Timeout;
    /// assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::BadRequest(_) | Self::Client(_) => RetryClass::Never,
            // Client errors (auth, payload size) fail the same way on every attempt.
            Self::Server { status, .. } if (400..500).contains(status) => RetryClass::Never,
            Self::Throttled { retry_after } => {
                RetryClass::AfterDelay(retry_after.unwrap_or(DEFAULT_RETRY_AFTER))
            }
            Self::Server { .. } | Self::Timeout | Self::Network(_) | Self::Decode(_) => {
                RetryClass::WithBackoff
            }
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

/// Why a single mapping job failed.
///
/// A "no match" is not an error; it is represented by
/// [`MappingResult::NoMatch`](crate::MappingResult::NoMatch).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// The request carrying this job was rejected as malformed. Not retryable.
    #[error("Malformed request: {0}")]
    Malformed(String),

    /// Transient failures persisted past the retry budget.
    #[error("Oracle unavailable after {attempts} attempts: {message}")]
    Unavailable {
        /// Number of attempts made before giving up
        attempts: u32,
        /// Last error seen
        message: String,
    },

    /// The oracle answered this particular job with an error entry.
    #[error("Job rejected by oracle: {0}")]
    Rejected(String),

    /// The oracle's response had fewer entries than the request had jobs.
    #[error("No result entry returned for job")]
    MissingEntry,
}

impl MappingError {
    /// Whether submitting the same job again later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_request_never_retries() {
        let error = TransportError::BadRequest("Invalid idType".to_string());
        assert_eq!(error.retry_class(), RetryClass::Never);
    }

    #[test]
    fn test_throttled_waits_signalled_delay() {
        let error = TransportError::Throttled {
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(
            error.retry_class(),
            RetryClass::AfterDelay(Duration::from_secs(7))
        );
    }

    #[test]
    fn test_throttled_without_header_uses_default_delay() {
        let error = TransportError::Throttled { retry_after: None };
        assert_eq!(
            error.retry_class(),
            RetryClass::AfterDelay(DEFAULT_RETRY_AFTER)
        );
    }

    #[test]
    fn test_transient_errors_retry_with_backoff() {
        let errors = [
            TransportError::Server {
                status: 503,
                body: String::new(),
            },
            TransportError::Timeout,
            TransportError::Network("connection reset".to_string()),
            TransportError::Decode("expected value".to_string()),
        ];
        for error in errors {
            assert_eq!(error.retry_class(), RetryClass::WithBackoff, "{}", error);
        }
    }

    #[test]
    fn test_client_statuses_never_retry() {
        for status in [401, 403, 404, 413] {
            let error = TransportError::Server {
                status,
                body: String::new(),
            };
            assert_eq!(error.retry_class(), RetryClass::Never, "{}", error);
        }
        let error = TransportError::Server {
            status: 500,
            body: String::new(),
        };
        assert_eq!(error.retry_class(), RetryClass::WithBackoff);
        assert_eq!(
            TransportError::Client("no TLS backend".to_string()).retry_class(),
            RetryClass::Never
        );
    }

    #[test]
    fn test_only_unavailable_is_retryable() {
        assert!(MappingError::Unavailable {
            attempts: 3,
            message: "HTTP 502".to_string()
        }
        .is_retryable());
        assert!(!MappingError::Malformed("bad".to_string()).is_retryable());
        assert!(!MappingError::Rejected("Invalid idValue".to_string()).is_retryable());
        assert!(!MappingError::MissingEntry.is_retryable());
    }

    #[test]
    fn test_error_display() {
        let error = TransportError::Server {
            status: 500,
            body: "oops".to_string(),
        };
        assert_eq!(format!("{}", error), "Oracle returned HTTP 500: oops");

        let error = MappingError::Unavailable {
            attempts: 3,
            message: "Request timed out".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Oracle unavailable after 3 attempts: Request timed out"
        );
    }
}
