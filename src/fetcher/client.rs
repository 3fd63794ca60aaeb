//! HTTP fetch client
//!
//! This module handles all outbound HTTP requests for the fetcher, including:
//! - Building the reqwest client from `[http]` configuration
//! - GET requests returning the raw response body
//! - Retry logic for transient failures
//! - Error classification

use crate::config::HttpConfig;
use crate::FetchError;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use tracing::Instrument;

/// A source of response payloads for a URL
///
/// The dispatch worker only talks to this trait, so tests can swap the real
/// HTTP client for a stub.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Performs a GET against `url` and returns the response body
    async fn get(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// reqwest-backed [`Fetch`] implementation with retry
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpClient {
    /// Builds an HTTP client with proper configuration
    ///
    /// # Example
    ///
    /// ```no_run
    /// use api_fetcher::config::HttpConfig;
    /// use api_fetcher::fetcher::HttpClient;
    ///
    /// let client = HttpClient::new(&HttpConfig::default()).unwrap();
    /// ```
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    /// Sends a single GET without retrying
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | 2xx | `Ok(body)` |
    /// | any other status | `FetchError::Status` with status and body |
    /// | transport error / timeout | `FetchError::Request` |
    async fn get_once(&self, url: &str) -> Result<Bytes, FetchError> {
        tracing::debug!(url, "Sending GET request");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl Fetch for HttpClient {
    /// Fetches a URL, retrying 5xx responses and timeouts
    ///
    /// Retries up to `max_retries` times with `retry_delay` between attempts.
    /// Client errors (4xx) and connection-level failures other than timeouts
    /// and refused connections fail immediately.
    async fn get(&self, url: &str) -> Result<Bytes, FetchError> {
        let span = tracing::debug_span!("http_client", url);

        async {
            let mut attempt = 0;
            loop {
                match self.get_once(url).await {
                    Ok(body) => return Ok(body),
                    Err(e) if e.is_transient() && attempt < self.max_retries => {
                        attempt += 1;
                        tracing::warn!(
                            url,
                            attempt,
                            max_retries = self.max_retries,
                            error = %e,
                            "Transient fetch failure, retrying"
                        );
                        tokio::time::sleep(self.retry_delay).await;
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        .instrument(span)
        .await
    }
}
