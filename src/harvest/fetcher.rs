//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the harvester, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests that read the whole body
//! - Error classification

use crate::config::FetcherConfig;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;

/// A fully read HTTP response, ready to be persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// The URL as it appeared in the input; used as the storage key
    pub url: String,

    /// HTTP status code
    pub status_code: Option<u16>,

    /// Content-Type header value
    pub content_type: Option<String>,

    /// Raw body bytes
    pub body: Vec<u8>,
}

/// Classified failure of a single fetch
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {source}")]
    Connect { url: String, source: reqwest::Error },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to read body of {url}: {source}")]
    Body { url: String, source: reqwest::Error },

    #[error("HTTP error for {url}: {source}")]
    Request { url: String, source: reqwest::Error },
}

impl FetchError {
    fn classify(url: &str, error: reqwest::Error) -> Self {
        let url = url.to_string();
        if error.is_timeout() {
            Self::Timeout { url }
        } else if error.is_connect() {
            Self::Connect { url, source: error }
        } else if error.is_body() || error.is_decode() {
            Self::Body { url, source: error }
        } else {
            Self::Request { url, source: error }
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The fetcher configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use sumi_harvest::config::FetcherConfig;
/// use sumi_harvest::harvest::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent())
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(Policy::limited(config.max_redirects))
        .gzip(true)
        .brotli(true);

    // No overall timeout unless one is configured
    if let Some(secs) = config.request_timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }

    builder.build()
}

/// Performs single blocking retrievals of whole response bodies
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    require_success_status: bool,
}

impl Fetcher {
    /// Creates a fetcher with a client built from `config`
    pub fn new(config: &FetcherConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(
            build_http_client(config)?,
            config.require_success_status,
        ))
    }

    /// Creates a fetcher around an existing client
    pub fn with_client(client: Client, require_success_status: bool) -> Self {
        Self {
            client,
            require_success_status,
        }
    }

    /// Fetches a URL and reads its full body
    ///
    /// Any response that reaches us is treated as content unless
    /// `require-success-status` is set, in which case non-2xx statuses become
    /// [`FetchError::Status`]. The response is consumed or dropped on every
    /// path, including when the returned future is dropped mid-read.
    ///
    /// # Error Classification
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | Timeout (when configured) | `Timeout` |
    /// | Connection refused / DNS / TLS | `Connect` |
    /// | Non-2xx with strict status | `Status` |
    /// | Body read or decode failure | `Body` |
    /// | Anything else | `Request` |
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::classify(url, e))?;

        let status = response.status();
        if self.require_success_status && !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::classify(url, e))?;

        Ok(FetchedPage {
            url: url.to_string(),
            status_code: Some(status.as_u16()),
            content_type,
            body: body.to_vec(),
        })
    }
}
