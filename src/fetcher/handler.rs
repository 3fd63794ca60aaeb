use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

/// Longest refresh interval a handler may declare
pub const MAX_REFRESH_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// A polled source paired with the callback that consumes its responses
///
/// Implementations must return the same `url()` and `refresh_interval()` for
/// their whole lifetime. The interval must be non-zero and at most
/// [`MAX_REFRESH_INTERVAL`]; the fetcher rejects anything else at registration.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Processes one fetched payload
    async fn handle(&self, payload: Bytes) -> anyhow::Result<()>;

    /// The URL fetched on every tick
    fn url(&self) -> &str;

    /// The polling interval
    fn refresh_interval(&self) -> Duration;

    /// Label used in logs and spans
    fn name(&self) -> &str {
        self.url()
    }
}

/// Handler reference shared between the tickers and the dispatch worker
pub type SharedHandler = Arc<dyn Handler>;
