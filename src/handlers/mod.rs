//! Concrete handlers registered by the service

mod logging;

pub use logging::LoggingHandler;

use crate::config::HandlerEntry;
use crate::fetcher::SharedHandler;
use std::sync::Arc;

/// Builds one handler per configured `[[handler]]` entry
pub fn from_config(entries: &[HandlerEntry]) -> Vec<SharedHandler> {
    entries
        .iter()
        .map(|entry| Arc::new(LoggingHandler::from_entry(entry)) as SharedHandler)
        .collect()
}
