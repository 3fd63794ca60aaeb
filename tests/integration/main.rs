//! Integration tests for api-fetcher
//!
//! These tests use wiremock to create mock HTTP servers and exercise the
//! HTTP client and the full fetch-and-handle cycle end-to-end.

mod config_tests;
mod http_client_tests;
