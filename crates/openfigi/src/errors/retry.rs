use std::time::Duration;

/// Classification for retry policy.
///
/// Used by the client to decide what to do with a failed outbound request.
///
/// # Behavior Summary
///
/// | Class | Retried? | Consumes retry budget? |
/// |-------|----------|------------------------|
/// | `Never` | No | - |
/// | `WithBackoff` | Yes, after exponential backoff | Yes |
/// | `AfterDelay` | Yes, after the oracle-signalled delay | No |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry - the request itself is invalid.
    /// Every job in the request is failed with a non-retryable reason.
    Never,

    /// Transient infrastructure failure (network, timeout, 5xx).
    /// Retried a bounded number of times with exponential backoff.
    WithBackoff,

    /// The oracle throttled the request and told us how long to wait.
    /// Retried without limit, always honouring the delay.
    AfterDelay(Duration),
}
