use crate::config::HandlerEntry;
use crate::fetcher::Handler;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

/// Handler that only logs that it ran
#[derive(Debug, Clone)]
pub struct LoggingHandler {
    name: String,
    url: String,
    refresh_interval: Duration,
}

impl LoggingHandler {
    pub fn new(name: impl Into<String>, url: impl Into<String>, refresh_interval: Duration) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            refresh_interval,
        }
    }

    pub fn from_entry(entry: &HandlerEntry) -> Self {
        Self::new(entry.name.clone(), entry.url.clone(), entry.refresh_interval())
    }
}

#[async_trait]
impl Handler for LoggingHandler {
    async fn handle(&self, payload: Bytes) -> anyhow::Result<()> {
        tracing::debug_span!("example_handle", handler = %self.name).in_scope(|| {
            tracing::debug!(url = %self.url, bytes = payload.len(), "Handle response");
        });
        Ok(())
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    fn name(&self) -> &str {
        &self.name
    }
}
