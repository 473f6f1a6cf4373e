//! Batched, rate-limited, retrying mapping client.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::{FigiConfig, RetryPolicy};
use crate::errors::{MappingError, RetryClass, TransportError};
use crate::models::{FigiMatch, IdType, MappingJob, MappingResult};
use crate::rate_limiter::RateLimiter;
use crate::transport::{FigiTransport, HttpTransport, JobResponse};

/// Identifier mapping as seen by consumers of the oracle.
///
/// Implemented by [`OpenFigiClient`]; consumers hold it behind an `Arc<dyn MappingService>`
/// so a single client (and its rate limiter) is shared by every caller.
#[async_trait]
pub trait MappingService: Send + Sync {
    /// Map jobs to results. Output has the same length and order as `jobs`.
    async fn map_jobs(&self, jobs: Vec<MappingJob>) -> Vec<MappingResult>;

    /// Free-text lookup. Best-effort: failures yield an empty list.
    async fn search(&self, query: &str, limit: usize) -> Vec<FigiMatch>;

    /// Map a single job through the batching path.
    async fn map_one(&self, job: MappingJob) -> MappingResult {
        self.map_jobs(vec![job])
            .await
            .into_iter()
            .next()
            .unwrap_or(MappingResult::Failed(MappingError::MissingEntry))
    }
}

/// Client for the OpenFIGI mapping API.
///
/// Construct once and share; the rate limiter lives inside the client.
pub struct OpenFigiClient {
    transport: Arc<dyn FigiTransport>,
    limiter: RateLimiter,
    max_jobs_per_request: usize,
    retry: RetryPolicy,
}

impl OpenFigiClient {
    /// Create a client talking HTTP to the configured endpoint.
    pub fn new(config: FigiConfig) -> Result<Self, TransportError> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        Ok(Self::with_transport(&config, transport))
    }

    /// Create a client over an arbitrary transport.
    pub fn with_transport(config: &FigiConfig, transport: Arc<dyn FigiTransport>) -> Self {
        info!(
            "OpenFIGI client initialized (API key: {}, rate limit: {}/{:?}, max jobs: {})",
            if config.has_api_key() { "yes" } else { "no" },
            config.rate_limit.max_requests,
            config.rate_limit.window,
            config.max_jobs_per_request
        );

        Self {
            transport,
            limiter: RateLimiter::new(&config.rate_limit),
            max_jobs_per_request: config.max_jobs_per_request.max(1),
            retry: config.retry.clone(),
        }
    }

    pub fn max_jobs_per_request(&self) -> usize {
        self.max_jobs_per_request
    }

    /// Send one chunk, retrying per the error's [`RetryClass`].
    ///
    /// Throttling retries are unbounded and do not consume the retry budget.
    async fn send_chunk(&self, chunk: &[MappingJob]) -> Result<Vec<JobResponse>, MappingError> {
        let mut failed_attempts: u32 = 0;

        loop {
            self.limiter.acquire().await;

            let err = match self.transport.post_mapping(chunk).await {
                Ok(entries) => return Ok(entries),
                Err(err) => err,
            };

            match err.retry_class() {
                RetryClass::Never => {
                    warn!("OpenFIGI rejected request: {}", err);
                    return Err(match &err {
                        TransportError::BadRequest(_) => MappingError::Malformed(err.to_string()),
                        _ => MappingError::Rejected(err.to_string()),
                    });
                }
                RetryClass::AfterDelay(delay) => {
                    warn!("OpenFIGI throttled, waiting {:?} before retrying", delay);
                    tokio::time::sleep(delay).await;
                }
                RetryClass::WithBackoff => {
                    failed_attempts += 1;
                    if failed_attempts >= self.retry.max_attempts {
                        warn!(
                            "OpenFIGI request failed after {} attempts: {}",
                            failed_attempts, err
                        );
                        return Err(MappingError::Unavailable {
                            attempts: failed_attempts,
                            message: err.to_string(),
                        });
                    }
                    let backoff = self.retry.backoff_for(failed_attempts - 1);
                    warn!(
                        "OpenFIGI request failed (attempt {}/{}): {}; retrying in {:?}",
                        failed_attempts, self.retry.max_attempts, err, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    /// Lookup a ticker on an exchange and return the first candidate.
    pub async fn map_ticker(&self, ticker: &str, exchange: &str) -> Option<FigiMatch> {
        let job = MappingJob::new(IdType::Ticker, ticker).with_exch_code(Some(exchange));
        self.map_one(job).await.into_first()
    }

    pub async fn map_cusip(&self, cusip: &str) -> Option<FigiMatch> {
        self.map_one(MappingJob::new(IdType::Cusip, cusip))
            .await
            .into_first()
    }

    pub async fn map_isin(&self, isin: &str) -> Option<FigiMatch> {
        self.map_one(MappingJob::new(IdType::Isin, isin))
            .await
            .into_first()
    }

    pub async fn map_sedol(&self, sedol: &str, exchange: Option<&str>) -> Option<FigiMatch> {
        let job = MappingJob::new(IdType::Sedol, sedol).with_exch_code(exchange);
        self.map_one(job).await.into_first()
    }
}

/// Align response entries with the jobs of their chunk.
fn collect_chunk(chunk_len: usize, entries: Vec<JobResponse>) -> Vec<MappingResult> {
    if entries.len() != chunk_len {
        warn!(
            "OpenFIGI returned {} entries for {} jobs",
            entries.len(),
            chunk_len
        );
    }

    let mut entries = entries.into_iter();
    (0..chunk_len)
        .map(|_| match entries.next() {
            Some(JobResponse {
                error: Some(error), ..
            }) => MappingResult::Failed(MappingError::Rejected(error)),
            Some(JobResponse {
                data: Some(data), ..
            }) if !data.is_empty() => MappingResult::Matched(data),
            Some(_) => MappingResult::NoMatch,
            None => MappingResult::Failed(MappingError::MissingEntry),
        })
        .collect()
}

#[async_trait]
impl MappingService for OpenFigiClient {
    async fn map_jobs(&self, jobs: Vec<MappingJob>) -> Vec<MappingResult> {
        let mut results = Vec::with_capacity(jobs.len());

        for chunk in jobs.chunks(self.max_jobs_per_request) {
            match self.send_chunk(chunk).await {
                Ok(entries) => results.extend(collect_chunk(chunk.len(), entries)),
                Err(error) => results.extend(
                    std::iter::repeat(MappingResult::Failed(error)).take(chunk.len()),
                ),
            }
        }

        debug!(
            "OpenFIGI mapped {} jobs ({} matched)",
            results.len(),
            results.iter().filter(|r| r.is_match()).count()
        );
        results
    }

    async fn search(&self, query: &str, limit: usize) -> Vec<FigiMatch> {
        self.limiter.acquire().await;

        match self.transport.post_search(query).await {
            Ok(mut data) => {
                data.truncate(limit);
                data
            }
            Err(err) => {
                warn!("OpenFIGI search for '{}' failed: {}", query, err);
                Vec::new()
            }
        }
    }
}
