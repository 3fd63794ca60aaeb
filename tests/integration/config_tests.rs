use api_fetcher::config::load_config_with_hash;
use api_fetcher::{build_fetcher, ConfigError, FetcherState};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write config");
    file.flush().expect("Failed to flush config");
    file
}

#[test]
fn test_config_file_builds_fetcher() {
    let file = write_config(
        r#"
[fetcher]
queue-capacity = 3

[[handler]]
name = "example"
url = "http://google.com"
refresh-secs = 10
"#,
    );

    let (config, hash) = load_config_with_hash(file.path()).unwrap();
    assert_eq!(hash.len(), 64);

    let fetcher = build_fetcher(&config).unwrap();
    assert_eq!(fetcher.handler_count(), 1);
    assert_eq!(fetcher.state(), FetcherState::Unstarted);
}

#[test]
fn test_non_http_source_is_rejected() {
    let file = write_config(
        r#"
[[handler]]
name = "files"
url = "file:///etc/passwd"
refresh-secs = 10
"#,
    );

    let result = load_config_with_hash(file.path());
    assert!(matches!(result, Err(ConfigError::InvalidUrl(_))));
}

#[test]
fn test_oversized_refresh_interval_is_rejected() {
    let file = write_config(
        r#"
[[handler]]
name = "forever"
url = "http://google.com"
refresh-secs = 9223372036854775807
"#,
    );

    let result = load_config_with_hash(file.path());
    assert!(matches!(result, Err(ConfigError::Validation(_))));
}
