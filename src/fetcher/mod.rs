//! Fetcher module for periodic polling and dispatch
//!
//! This module contains the core polling logic, including:
//! - HTTP fetching with retry logic
//! - The handler contract
//! - Per-handler tickers with queue backpressure
//! - The single dispatch worker and its failure isolation
//! - Overall lifecycle coordination

mod client;
mod coordinator;
mod dispatcher;
mod handler;
mod scheduler;

#[cfg(test)]
mod test_support;

pub use client::{Fetch, HttpClient};
pub use coordinator::{Fetcher, FetcherState, FetcherStats};
pub use handler::{Handler, SharedHandler, MAX_REFRESH_INTERVAL};

use crate::config::Config;
use crate::FetcherError;
use std::sync::Arc;

/// Builds an unstarted fetcher from configuration
///
/// Creates the HTTP client from `[http]` and registers one
/// [`LoggingHandler`](crate::handlers::LoggingHandler) per `[[handler]]` entry.
///
/// # Returns
///
/// * `Ok(Fetcher)` - Ready to run
/// * `Err(FetcherError)` - The HTTP client could not be built or a handler was rejected
pub fn build_fetcher(config: &Config) -> Result<Fetcher, FetcherError> {
    let client = HttpClient::new(&config.http)?;

    let mut fetcher = Fetcher::new(Arc::new(client), config.fetcher.clone());
    fetcher.register_handlers(crate::handlers::from_config(&config.handlers))?;

    Ok(fetcher)
}
