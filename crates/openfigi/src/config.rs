//! Client configuration: oracle limits, timeouts and retry policy.

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openfigi.com";

/// Requests per minute allowed without an API key.
pub const ANONYMOUS_REQUESTS_PER_MINUTE: u32 = 25;
/// Requests per minute allowed with an API key.
pub const KEYED_REQUESTS_PER_MINUTE: u32 = 250;
/// Jobs per mapping request allowed without an API key.
pub const ANONYMOUS_MAX_JOBS_PER_REQUEST: usize = 5;
/// Jobs per mapping request allowed with an API key.
pub const KEYED_MAX_JOBS_PER_REQUEST: usize = 100;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Fixed-window request ceiling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests dispatched per window.
    pub max_requests: u32,
    /// Window length.
    pub window: Duration,
}

impl RateLimitConfig {
    pub fn per_minute(max_requests: u32) -> Self {
        Self {
            max_requests,
            window: RATE_LIMIT_WINDOW,
        }
    }
}

/// Bounded retry for transient failures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first.
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubled after each further failure.
    pub base_backoff: Duration,
}

impl RetryPolicy {
    /// Backoff to wait after the given zero-based failed attempt.
    pub fn backoff_for(&self, failed_attempt: u32) -> Duration {
        self.base_backoff
            .saturating_mul(2u32.saturating_pow(failed_attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff: Duration::from_secs(1),
        }
    }
}

/// Configuration for [`OpenFigiClient`](crate::OpenFigiClient).
///
/// Limits default to the oracle's published ceilings, which are higher when
/// an API key is supplied.
#[derive(Clone, Debug)]
pub struct FigiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
    pub rate_limit: RateLimitConfig,
    pub max_jobs_per_request: usize,
    pub retry: RetryPolicy,
}

impl FigiConfig {
    pub fn new(api_key: Option<String>) -> Self {
        let api_key = api_key.filter(|k| !k.trim().is_empty());
        let (requests_per_minute, max_jobs) = if api_key.is_some() {
            (KEYED_REQUESTS_PER_MINUTE, KEYED_MAX_JOBS_PER_REQUEST)
        } else {
            (ANONYMOUS_REQUESTS_PER_MINUTE, ANONYMOUS_MAX_JOBS_PER_REQUEST)
        };

        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            rate_limit: RateLimitConfig::per_minute(requests_per_minute),
            max_jobs_per_request: max_jobs,
            retry: RetryPolicy::default(),
        }
    }

    /// Reads `OPENFIGI_API_KEY`, `OPENFIGI_BASE_URL` and `OPENFIGI_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let mut config = Self::new(std::env::var("OPENFIGI_API_KEY").ok());
        if let Ok(base_url) = std::env::var("OPENFIGI_BASE_URL") {
            if !base_url.trim().is_empty() {
                config.base_url = base_url.trim_end_matches('/').to_string();
            }
        }
        if let Some(secs) = std::env::var("OPENFIGI_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }
        config
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for FigiConfig {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_limits() {
        let config = FigiConfig::new(None);
        assert!(!config.has_api_key());
        assert_eq!(config.rate_limit.max_requests, 25);
        assert_eq!(config.rate_limit.window, Duration::from_secs(60));
        assert_eq!(config.max_jobs_per_request, 5);
    }

    #[test]
    fn test_keyed_limits() {
        let config = FigiConfig::new(Some("secret".to_string()));
        assert!(config.has_api_key());
        assert_eq!(config.rate_limit.max_requests, 250);
        assert_eq!(config.max_jobs_per_request, 100);
    }

    #[test]
    fn test_blank_key_is_anonymous() {
        let config = FigiConfig::new(Some("   ".to_string()));
        assert!(!config.has_api_key());
        assert_eq!(config.max_jobs_per_request, 5);
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for(0), Duration::from_secs(1));
        assert_eq!(policy.backoff_for(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(4));
    }
}
