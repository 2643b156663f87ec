//! Data source seam and the HTTP catalog client behind it.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use shared::{domain::EarthquakeRecord, error::DecodeError, protocol::decode_feature_collection};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_CATALOG_URL: &str = "https://earthquake.usgs.gov/fdsnws/event/1/query";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("catalog request failed with HTTP status {status}")]
    Request { status: u16 },
    #[error("could not parse catalog response: {0}")]
    Parse(String),
    #[error("catalog unreachable: {0}")]
    Transport(String),
    #[error("invalid page query: {0}")]
    InvalidQuery(String),
    #[error("invalid catalog client configuration: {0}")]
    Config(String),
}

impl From<DecodeError> for SourceError {
    fn from(value: DecodeError) -> Self {
        Self::Parse(value.to_string())
    }
}

/// One page of a time-windowed, magnitude-filtered catalog query.
#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub min_magnitude: f64,
    pub limit: u32,
    /// 1-based position of the first event in this page.
    pub offset: u32,
}

impl PageQuery {
    pub fn validate(&self) -> Result<(), SourceError> {
        if self.start_time >= self.end_time {
            return Err(SourceError::InvalidQuery(format!(
                "start time {} is not before end time {}",
                self.start_time, self.end_time
            )));
        }
        if self.limit == 0 {
            return Err(SourceError::InvalidQuery("limit must be positive".into()));
        }
        if self.offset == 0 {
            return Err(SourceError::InvalidQuery("offset is 1-based".into()));
        }
        if !self.min_magnitude.is_finite() {
            return Err(SourceError::InvalidQuery(format!(
                "minimum magnitude {} is not a finite number",
                self.min_magnitude
            )));
        }
        Ok(())
    }

    fn params(&self) -> CatalogQueryParams {
        CatalogQueryParams {
            format: "geojson",
            starttime: self.start_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            endtime: self.end_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            minmagnitude: self.min_magnitude,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[derive(Serialize)]
struct CatalogQueryParams {
    format: &'static str,
    starttime: String,
    endtime: String,
    minmagnitude: f64,
    limit: u32,
    offset: u32,
}

/// Anything that can serve a page of earthquake records. Implementations do
/// not retry; that is left to callers.
#[async_trait]
pub trait EarthquakeSource: Send + Sync {
    async fn fetch_page(&self, query: &PageQuery) -> Result<Vec<EarthquakeRecord>, SourceError>;
}

#[derive(Debug, Clone)]
pub struct CatalogClientOptions {
    pub base_url: String,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for CatalogClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CATALOG_URL.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: format!("quakes/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

pub struct CatalogClient {
    http: Client,
    base_url: Url,
}

impl CatalogClient {
    pub fn new(options: CatalogClientOptions) -> Result<Self, SourceError> {
        let base_url = Url::parse(&options.base_url)
            .map_err(|e| SourceError::Config(format!("base url '{}': {e}", options.base_url)))?;
        let http = Client::builder()
            .user_agent(options.user_agent)
            .timeout(options.request_timeout)
            .build()
            .map_err(|e| SourceError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl EarthquakeSource for CatalogClient {
    async fn fetch_page(&self, query: &PageQuery) -> Result<Vec<EarthquakeRecord>, SourceError> {
        query.validate()?;
        debug!(
            start_time = %query.start_time,
            end_time = %query.end_time,
            min_magnitude = query.min_magnitude,
            limit = query.limit,
            offset = query.offset,
            "catalog: requesting page"
        );

        let response = self
            .http
            .get(self.base_url.clone())
            .query(&query.params())
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(status = status.as_u16(), "catalog: unexpected response status");
            return Err(SourceError::Request {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        let records = decode_feature_collection(&body)?;
        debug!(count = records.len(), "catalog: page decoded");
        Ok(records)
    }
}

#[cfg(test)]
#[path = "tests/source_tests.rs"]
mod tests;
