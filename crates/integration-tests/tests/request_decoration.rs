//! Integration tests for how outgoing requests are decorated.

use std::sync::Arc;

use reqwest::StatusCode;
use sahha_client::{ApiClient, ClientConfig, ClientError, CredentialStore, MemoryCredentialStore};
use sahha_integration_tests::{REFRESH_PATH, client_for, config_for, logged_in};
use serde::Deserialize;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Profile {
    profile_id: String,
    display_name: String,
}

async fn refresh_never_called(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_bearer_token_and_query_are_attached() {
    //* Given
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/profile"))
        .and(header("Authorization", "Bearer T1"))
        .and(query_param("include", "devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "profileId": "p-1",
            "displayName": "Ada",
        })))
        .expect(1)
        .mount(&server)
        .await;
    refresh_never_called(&server).await;

    let client = client_for(&server, logged_in("T1", "R1"));

    //* When
    let profile: Profile = client
        .get("/profile")
        .query("include", "devices")
        .send_json()
        .await
        .unwrap();

    //* Then
    assert_eq!(profile.profile_id, "p-1");
    assert_eq!(profile.display_name, "Ada");

    let requests = server.received_requests().await.unwrap();
    let request = requests.first().unwrap();
    assert!(request.headers.get("x-request-id").is_some());
    assert_eq!(request.headers.get("accept").unwrap(), "application/json");

    server.verify().await;
}

#[tokio::test]
async fn test_anonymous_request_has_no_authorization_header() {
    //* Given
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, logged_in("T1", "R1"));

    //* When
    client
        .post("/auth/login")
        .json(&json!({ "email": "ada@example.com" }))
        .without_credential()
        .send()
        .await
        .unwrap();

    //* Then
    let requests = server.received_requests().await.unwrap();
    assert!(requests.first().unwrap().headers.get("authorization").is_none());

    server.verify().await;
}

#[tokio::test]
async fn test_anonymous_401_is_returned_without_refresh() {
    //* Given
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad password"))
        .expect(1)
        .mount(&server)
        .await;
    refresh_never_called(&server).await;

    let store = logged_in("T1", "R1");
    let client = client_for(&server, store.clone());

    //* When
    let err = client
        .post("/auth/login")
        .without_credential()
        .send()
        .await
        .unwrap_err();

    //* Then
    assert!(err.is_unauthorized());
    assert!(store.credentials().is_some());

    server.verify().await;
}

#[tokio::test]
async fn test_no_credentials_sends_without_bearer() {
    //* Given
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::new());
    let client = client_for(&server, store);

    //* When
    let products: Vec<serde_json::Value> = client.get("/products").send_json().await.unwrap();

    //* Then
    assert!(products.is_empty());
    let requests = server.received_requests().await.unwrap();
    assert!(requests.first().unwrap().headers.get("authorization").is_none());

    server.verify().await;
}

#[tokio::test]
async fn test_non_401_errors_pass_through() {
    //* Given
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(1)
        .mount(&server)
        .await;
    refresh_never_called(&server).await;

    let store = logged_in("T1", "R1");
    let client = client_for(&server, store.clone());

    //* When
    let err = client.get("/orders").send().await.unwrap_err();

    //* Then
    match err {
        ClientError::Status { status, body, .. } => {
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(body, "maintenance");
        }
        other => panic!("expected status error, got {other:?}"),
    }
    assert_eq!(store.access_token().map(|t| t.expose().to_string()), Some("T1".into()));

    server.verify().await;
}

#[tokio::test]
async fn test_empty_body_decodes_as_unit() {
    //* Given
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/favourites/42"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, logged_in("T1", "R1"));

    //* When
    let result: Option<serde_json::Value> =
        client.delete("/favourites/42").send_json().await.unwrap();

    //* Then
    assert!(result.is_none());

    server.verify().await;
}

#[tokio::test]
async fn test_base_path_is_preserved() {
    //* Given
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "orders": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.base_url = format!("{}/api/v1/", server.uri()).parse().unwrap();
    let client = ApiClient::new(config, logged_in("T1", "R1")).unwrap();

    //* When
    let response = client.get("/orders").send().await.unwrap();

    //* Then
    assert_eq!(response.status(), StatusCode::OK);

    server.verify().await;
}

#[tokio::test]
async fn test_truncated_error_body_still_reports_status() {
    //* Given
    // A backend that promises more body than it sends, then hangs up.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let backend = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0_u8; 4096];
        let _ = socket.read(&mut request).await.unwrap();
        socket
            .write_all(b"HTTP/1.1 502 Bad Gateway\r\ncontent-length: 64\r\n\r\nupstream")
            .await
            .unwrap();
        socket.shutdown().await.unwrap();
    });

    let config = ClientConfig::new(Url::parse(&format!("http://{addr}")).unwrap());
    let client = ApiClient::new(config, Arc::new(MemoryCredentialStore::new())).unwrap();

    //* When
    let err = client.get("/orders").send().await.unwrap_err();

    //* Then
    match err {
        ClientError::Status { status, body, .. } => {
            assert_eq!(status, StatusCode::BAD_GATEWAY);
            assert!(body.is_empty());
        }
        other => panic!("expected status error, got {other:?}"),
    }

    backend.await.unwrap();
}
