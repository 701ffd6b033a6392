//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the configured default headers
//! - Retrying transient failures with exponential backoff
//! - Detecting the site's "listing removed" redirect
//! - Reporting unexpected status codes to a debug sink

use crate::config::{Config, CrawlerConfig};
use crate::crawler::debug::DebugSink;
use crate::{ConfigError, CrawlError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

/// A fetched HTML document
#[derive(Debug, Clone)]
pub struct Page {
    /// Final URL after redirects
    pub url: String,
    pub html: String,
}

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchOutcome {
    /// Successfully fetched the page
    Document(Page),

    /// The site redirected to its removal marker
    Removed {
        /// The URL the redirect chain ended on
        resolved_url: String,
    },

    /// 404, or a status that is neither success nor retryable
    Absent,
}

/// Failures that leave no outcome at all
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{url}: gave up after {attempts} attempts: {source}")]
    Exhausted {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url}: failed to read body: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Exponential backoff schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per request, including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.backoff_base_ms),
            max_delay: Duration::from_millis(config.backoff_max_ms),
        }
    }

    /// Delay after the failed `attempt` (1-based): `base * 2^(attempt-1)`,
    /// capped at `max_delay`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}

/// Builds an HTTP client with proper configuration
///
/// Every entry of the `[headers]` table becomes a default header. Redirects
/// are followed so the final URL can be checked for the removal marker.
pub fn build_http_client(config: &Config) -> Result<Client, CrawlError> {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConfigError::InvalidHeader(name.clone()))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| ConfigError::InvalidHeader(name.to_string()))?;
        headers.insert(name, value);
    }

    let client = Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(config.crawler.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Returns true if the status is worth another attempt
pub fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Returns true if `resolved` is a redirect away from `requested` onto the
/// removal marker, i.e. the second path segment equals `marker`
///
/// # Example
///
/// ```
/// use estate_crawler::crawler::is_removal_redirect;
/// use url::Url;
///
/// let resolved = Url::parse("https://site.test/en/sd/apartments").unwrap();
/// assert!(is_removal_redirect("https://site.test/en/42/flat/", &resolved, "sd"));
/// assert!(!is_removal_redirect("https://site.test/en/sd/apartments", &resolved, "sd"));
/// ```
pub fn is_removal_redirect(requested: &str, resolved: &Url, marker: &str) -> bool {
    let moved = match Url::parse(requested) {
        Ok(requested) => requested != *resolved,
        Err(_) => requested != resolved.as_str(),
    };

    moved && resolved.path_segments().and_then(|mut s| s.nth(1)) == Some(marker)
}

/// Retrying document fetcher
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    retry: RetryPolicy,
    removed_marker: String,
    debug_sink: Arc<dyn DebugSink>,
}

impl Fetcher {
    pub fn new(
        client: Client,
        retry: RetryPolicy,
        removed_marker: impl Into<String>,
        debug_sink: Arc<dyn DebugSink>,
    ) -> Self {
        Self {
            client,
            retry,
            removed_marker: removed_marker.into(),
            debug_sink,
        }
    }

    /// Builds a fetcher with its own client from the configuration
    pub fn from_config(config: &Config, debug_sink: Arc<dyn DebugSink>) -> Result<Self, CrawlError> {
        Ok(Self::new(
            build_http_client(config)?,
            RetryPolicy::from_config(&config.crawler),
            config.crawler.removed_marker.clone(),
            debug_sink,
        ))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Fetches a URL with retry
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 200 | `Document`, or `Removed` on a removal redirect |
    /// | HTTP 404 | Immediate `Absent` |
    /// | HTTP 5xx / 429 | Retry; `Absent` once attempts run out |
    /// | Other status | Immediate `Absent` |
    /// | Transport error | Retry; `Exhausted` once attempts run out |
    ///
    /// Every `Absent` except 404 is reported to the debug sink.
    pub async fn fetch(&self, url: &str) -> Result<FetchOutcome, FetchError> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if is_retryable_status(status) && attempt < self.retry.max_attempts {
                        debug!("{} returned {}, attempt {}", url, status, attempt);
                        tokio::time::sleep(self.retry.delay_for(attempt)).await;
                        continue;
                    }
                    return self.classify(url, response).await;
                }
                Err(e) => {
                    if attempt >= self.retry.max_attempts {
                        return Err(FetchError::Exhausted {
                            url: url.to_string(),
                            attempts: attempt,
                            source: e,
                        });
                    }
                    debug!("{} failed on attempt {}: {}", url, attempt, e);
                    tokio::time::sleep(self.retry.delay_for(attempt)).await;
                }
            }
        }
    }

    async fn classify(&self, url: &str, response: Response) -> Result<FetchOutcome, FetchError> {
        let status = response.status();

        if status == StatusCode::OK {
            let resolved = response.url().clone();
            if is_removal_redirect(url, &resolved, &self.removed_marker) {
                debug!("{} was removed (redirected to {})", url, resolved);
                return Ok(FetchOutcome::Removed {
                    resolved_url: resolved.to_string(),
                });
            }

            let html = response.text().await.map_err(|source| FetchError::Body {
                url: url.to_string(),
                source,
            })?;

            return Ok(FetchOutcome::Document(Page {
                url: resolved.to_string(),
                html,
            }));
        }

        if status == StatusCode::NOT_FOUND {
            return Ok(FetchOutcome::Absent);
        }

        error!("{} return status code {}", url, status.as_u16());
        self.debug_sink.record(status.as_u16(), url);
        Ok(FetchOutcome::Absent)
    }
}
