use std::time::Duration;

use fl_integrations::github::transport::{HttpRequest, HttpTransport, ReqwestTransport};
use httpmock::prelude::*;
use reqwest::header::{HeaderValue, IF_NONE_MATCH};

fn transport() -> ReqwestTransport {
    ReqwestTransport::new(Duration::from_secs(5), "forgelink-test").unwrap()
}

#[tokio::test]
async fn passes_etag_through() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/repos/a/b/issues/1")
            .header("user-agent", "forgelink-test");
        then.status(200)
            .header("etag", "\"v1\"")
            .body(r#"{"title":"hello"}"#);
    });

    let response = transport()
        .request(HttpRequest::get(server.url("/repos/a/b/issues/1")))
        .await
        .unwrap();

    mock.assert_calls(1);
    assert_eq!(response.status, 200);
    assert_eq!(response.etag().as_deref(), Some("\"v1\""));
    assert_eq!(&*response.body, br#"{"title":"hello"}"#);
}

#[tokio::test]
async fn reports_not_modified_verbatim() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/repos/a/b/issues/2")
            .header("if-none-match", "\"v1\"");
        then.status(304);
    });

    let mut request = HttpRequest::get(server.url("/repos/a/b/issues/2"));
    request
        .headers
        .insert(IF_NONE_MATCH, HeaderValue::from_static("\"v1\""));
    let response = transport().request(request).await.unwrap();

    mock.assert_calls(1);
    assert_eq!(response.status, 304);
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn error_statuses_are_not_transport_errors() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/repos/a/b/issues/3");
        then.status(404).body(r#"{"message":"Not Found"}"#);
    });

    let response = transport()
        .request(HttpRequest::get(server.url("/repos/a/b/issues/3")))
        .await
        .unwrap();
    assert_eq!(response.status, 404);
    assert!(!response.is_success());
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
    let result = transport()
        .request(HttpRequest::get("http://127.0.0.1:1/unreachable"))
        .await;
    assert!(result.is_err());
}
