//! HTTP transport for the OpenFIGI v3 API.
//!
//! - `POST /v3/mapping` with an ordered array of jobs
//! - `POST /v3/search` with `{"query": ...}`
//!
//! API documentation: https://www.openfigi.com/api

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{FigiTransport, JobResponse};
use crate::config::FigiConfig;
use crate::errors::TransportError;
use crate::models::{FigiMatch, MappingJob};

const API_KEY_HEADER: &str = "X-OPENFIGI-APIKEY";

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<FigiMatch>,
}

/// `reqwest`-backed transport.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &FigiConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn post(&self, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let request = self.client.post(url);
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }

    /// Turn non-success statuses into classified errors; return the body otherwise.
    async fn read_body(response: Response) -> Result<String, TransportError> {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            warn!("OpenFIGI throttled request (retry after {:?})", retry_after);
            return Err(TransportError::Throttled { retry_after });
        }

        let body = response.text().await?;

        if status == StatusCode::BAD_REQUEST {
            return Err(TransportError::BadRequest(body));
        }

        if !status.is_success() {
            return Err(TransportError::Server {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl FigiTransport for HttpTransport {
    async fn post_mapping(&self, jobs: &[MappingJob]) -> Result<Vec<JobResponse>, TransportError> {
        debug!("OpenFIGI mapping request with {} jobs", jobs.len());

        let response = self.post("/v3/mapping").json(jobs).send().await?;
        let body = Self::read_body(response).await?;

        serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn post_search(&self, query: &str) -> Result<Vec<FigiMatch>, TransportError> {
        debug!("OpenFIGI search request: {}", query);

        let response = self
            .post("/v3/search")
            .json(&SearchRequest { query })
            .send()
            .await?;
        let body = Self::read_body(response).await?;

        let parsed: SearchResponse =
            serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))?;
        Ok(parsed.data)
    }
}
