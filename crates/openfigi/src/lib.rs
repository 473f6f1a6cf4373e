//! Security Master OpenFIGI Crate
//!
//! Client for the OpenFIGI identifier mapping oracle, used by the security
//! master to turn tickers, CUSIPs, ISINs and SEDOLs into FIGIs.
//!
//! # Overview
//!
//! - Batched mapping: jobs are split into chunks no larger than the per-request cap
//! - Rate limiting: a shared fixed-window limiter suspends callers at the ceiling
//! - Retry classification: malformed requests fail fast, throttling waits,
//!   transient failures back off a bounded number of times
//! - One [`MappingResult`] per job, in input order
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |  MappingService  |  (trait held by the security master)
//! +------------------+
//!          |
//!          v
//! +------------------+     +------------------+
//! |  OpenFigiClient  | --> |   RateLimiter    |
//! +------------------+     +------------------+
//!          |
//!          v
//! +------------------+
//! |  FigiTransport   |  (HTTP in production, scripted in tests)
//! +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`MappingJob`] - One identifier to map, with optional qualifiers
//! - [`FigiMatch`] - A candidate security returned by the oracle
//! - [`MappingResult`] - Matched, no match, or failed
//! - [`FigiConfig`] - Limits, timeout and retry policy

pub mod client;
pub mod config;
pub mod errors;
pub mod models;
pub mod rate_limiter;
pub mod transport;


pub use client::{MappingService, OpenFigiClient};
pub use config::{FigiConfig, RateLimitConfig, RetryPolicy};
pub use errors::{MappingError, RetryClass, TransportError};
pub use models::{FigiMatch, IdType, MappingJob, MappingResult};
pub use rate_limiter::RateLimiter;
pub use transport::{FigiTransport, HttpTransport, JobResponse};
