use crate::config::types::{Config, FetcherConfig, HandlerEntry, HttpConfig};
use crate::fetcher::MAX_REFRESH_INTERVAL;
use crate::ConfigError;
use url::Url;

const MAX_RETRIES: u32 = 10;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_fetcher_config(&config.fetcher)?;
    validate_http_config(&config.http)?;
    validate_handlers(&config.handlers)?;
    Ok(())
}

/// Validates queue and timeout settings
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.queue_capacity < 1 {
        return Err(ConfigError::Validation(format!(
            "queue_capacity must be >= 1, got {}",
            config.queue_capacity
        )));
    }

    if config.fetch_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "fetch_timeout_secs must be >= 1, got {}",
            config.fetch_timeout_secs
        )));
    }

    Ok(())
}

/// Validates HTTP client settings
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 || config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request and connect timeouts must be >= 1s, got {}s and {}s",
            config.request_timeout_secs, config.connect_timeout_secs
        )));
    }

    if config.max_retries > MAX_RETRIES {
        return Err(ConfigError::Validation(format!(
            "max_retries must be between 0 and {}, got {}",
            MAX_RETRIES, config.max_retries
        )));
    }

    Ok(())
}

/// Validates every `[[handler]]` entry
fn validate_handlers(handlers: &[HandlerEntry]) -> Result<(), ConfigError> {
    for entry in handlers {
        if entry.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Handler for '{}' must have a non-empty name",
                entry.url
            )));
        }

        validate_source_url(&entry.url)?;

        if entry.refresh_secs == 0 || entry.refresh_secs > MAX_REFRESH_INTERVAL.as_secs() {
            return Err(ConfigError::Validation(format!(
                "Handler '{}' must have refresh_secs between 1 and {}, got {}",
                entry.name,
                MAX_REFRESH_INTERVAL.as_secs(),
                entry.refresh_secs
            )));
        }
    }

    Ok(())
}

/// Source URLs must parse and use http or https
fn validate_source_url(raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid source URL '{}': {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidUrl(format!(
            "Source URL '{}' must use http or https, got '{}'",
            raw, other
        ))),
    }
}
