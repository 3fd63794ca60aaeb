use crate::support::create_test_http_config;
use api_fetcher::{Fetch, FetchError, HttpClient};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_get_returns_body_on_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .and(header("user-agent", "TestFetcher/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(&create_test_http_config(0)).unwrap();
    let body = client
        .get(&format!("{}/data", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn test_server_error_is_retried_then_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(&create_test_http_config(2)).unwrap();
    let result = client.get(&format!("{}/broken", mock_server.uri())).await;

    match result {
        Err(FetchError::Status { status, body, .. }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "internal");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(&create_test_http_config(3)).unwrap();
    let result = client.get(&format!("{}/missing", mock_server.uri())).await;

    assert!(matches!(
        result,
        Err(FetchError::Status { status: 404, .. })
    ));
}

#[tokio::test]
async fn test_transient_failure_recovers_on_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
        .with_priority(2)
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(&create_test_http_config(1)).unwrap();
    let body = client
        .get(&format!("{}/flaky", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(&body[..], b"recovered");
}

#[tokio::test]
async fn test_connection_refused_is_request_error() {
    // Bind and drop a server so its port is very likely closed
    let uri = {
        let mock_server = MockServer::start().await;
        mock_server.uri()
    };

    let client = HttpClient::new(&create_test_http_config(0)).unwrap();
    let result = client.get(&format!("{}/gone", uri)).await;

    assert!(matches!(result, Err(FetchError::Request { .. })));
}
