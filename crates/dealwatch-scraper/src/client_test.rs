use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

fn test_client() -> FetchClient {
    FetchClient::new(5, "dealwatch-test/0.1", ProxyPool::new("http://unused.example")).unwrap()
}

#[tokio::test]
async fn fetch_returns_body_on_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&server)
        .await;

    let client = test_client();
    let body = client.fetch(&server.uri()).await.unwrap();
    assert_eq!(body, "<html>ok</html>");
}

#[tokio::test]
async fn fetch_maps_server_error_to_unexpected_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = test_client();
    let err = client.fetch(&server.uri()).await.unwrap_err();
    assert!(
        matches!(err, ScraperError::UnexpectedStatus { status: 500, .. }),
        "expected UnexpectedStatus(500), got: {err:?}"
    );
}

#[tokio::test]
async fn blocked_fetch_with_empty_pool_exhausts_proxies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let client = test_client();
    let err = client.fetch(&server.uri()).await.unwrap_err();
    assert!(
        matches!(err, ScraperError::ProxiesExhausted { status: 403, .. }),
        "expected ProxiesExhausted(403), got: {err:?}"
    );
}

#[tokio::test]
async fn nonstandard_block_status_also_triggers_proxy_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(430))
        .mount(&server)
        .await;

    let client = test_client();
    let err = client.fetch(&server.uri()).await.unwrap_err();
    assert!(
        matches!(err, ScraperError::ProxiesExhausted { status: 430, .. }),
        "expected ProxiesExhausted(430), got: {err:?}"
    );
}

#[tokio::test]
async fn blocked_fetch_recovers_through_working_proxy() {
    // The "proxy" is a second mock server: an HTTP proxy receives the plain
    // GET with an absolute-form URL, which wiremock happily answers.
    let blocked = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&blocked)
        .await;

    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("via proxy"))
        .mount(&proxy)
        .await;

    let client = test_client();
    client
        .proxy_pool()
        .seed(vec!["http://dead.invalid:1".to_owned(), proxy.uri()])
        .await;

    let body = client.fetch(&blocked.uri()).await.unwrap();
    assert_eq!(body, "via proxy");

    // The dead proxy was reported bad along the way; only the live one rotates.
    assert_eq!(client.proxy_pool().next().await, Some(proxy.uri()));
}
