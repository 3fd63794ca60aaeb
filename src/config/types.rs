use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for api-fetcher
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default, rename = "handler")]
    pub handlers: Vec<HandlerEntry>,
}

/// Dispatch queue and worker configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Capacity of the bounded work queue between tickers and the worker
    #[serde(rename = "queue-capacity", default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Upper bound on a single fetch, in seconds
    #[serde(rename = "fetch-timeout-secs", default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl FetcherConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// User agent sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Total request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Connection timeout (seconds)
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Retries after a transient failure (5xx or timeout)
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between retries (milliseconds)
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

/// A polled source: one `[[handler]]` table
#[derive(Debug, Clone, Deserialize)]
pub struct HandlerEntry {
    /// Label used in logs and spans
    pub name: String,

    /// URL to GET on every tick
    pub url: String,

    /// Polling interval (seconds)
    #[serde(rename = "refresh-secs")]
    pub refresh_secs: u64,
}

impl HandlerEntry {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }
}

fn default_queue_capacity() -> usize {
    5
}

fn default_fetch_timeout_secs() -> u64 {
    5 * 60
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    500
}
