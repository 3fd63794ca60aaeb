//! Configuration module for api-fetcher
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use api_fetcher::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("fetcher.toml")).unwrap();
//! println!("Polling {} sources", config.handlers.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, FetcherConfig, HandlerEntry, HttpConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
