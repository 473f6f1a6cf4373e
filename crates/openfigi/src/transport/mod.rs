//! Transport seam between the client and the oracle.
//!
//! The client owns batching, rate limiting and retries; a transport performs
//! exactly one exchange per call and classifies what went wrong.

mod http;

use async_trait::async_trait;
use serde::Deserialize;

use crate::errors::TransportError;
use crate::models::{FigiMatch, MappingJob};

pub use http::HttpTransport;

/// One entry of a mapping response, positionally aligned with the request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct JobResponse {
    #[serde(default)]
    pub data: Option<Vec<FigiMatch>>,
    #[serde(default)]
    pub error: Option<String>,
    /// Sent instead of `data` when nothing matched.
    #[serde(default)]
    pub warning: Option<String>,
}

impl JobResponse {
    pub fn matched(data: Vec<FigiMatch>) -> Self {
        Self {
            data: Some(data),
            ..Default::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// A single request/response exchange with the oracle.
#[async_trait]
pub trait FigiTransport: Send + Sync {
    /// Submit one batch of jobs to the mapping endpoint.
    async fn post_mapping(&self, jobs: &[MappingJob]) -> Result<Vec<JobResponse>, TransportError>;

    /// Free-text search.
    async fn post_search(&self, query: &str) -> Result<Vec<FigiMatch>, TransportError>;
}
