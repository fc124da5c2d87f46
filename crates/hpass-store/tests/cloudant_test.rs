//! Integration tests for `CloudantClient` against a wiremock CouchDB.

use std::sync::Arc;
use std::time::Duration;

use hpass_store::{
    ClientState, CloudantClient, DocumentResult, DocumentStore, StoreAuth, StoreConfig,
    StoreError,
};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AUDIT_COLLECTION: &str = "gdpr-audit-log";

/// Mounts `GET /` answering like a CouchDB server root.
async fn mount_root(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "couchdb": "Welcome",
            "version": "3.3.3"
        })))
        .mount(server)
        .await;
}

/// Starts a mock store and returns a client that has already connected.
async fn connected_client() -> (MockServer, CloudantClient) {
    let server = MockServer::start().await;
    mount_root(&server).await;

    let client = CloudantClient::new(StoreConfig::new(server.uri())).unwrap();
    client.connect().await.expect("connect failed");
    (server, client)
}

#[tokio::test]
async fn test_connect_with_iam_token_is_idempotent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/identity/token"))
        .and(body_string_contains("apikey=test-key"))
        .and(body_string_contains("grant_type=urn%3Aibm%3Aparams%3Aoauth%3Agrant-type%3Aapikey"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "iam-token",
            "refresh_token": "not_supported",
            "token_type": "Bearer",
            "expires_in": 3600,
            "expiration": 1_900_000_000
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("authorization", "Bearer iam-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"couchdb": "Welcome"})))
        .expect(1)
        .mount(&server)
        .await;

    let config =
        StoreConfig::new(server.uri()).with_auth(StoreAuth::iam("test-key", server.uri()));
    let client = CloudantClient::new(config).unwrap();
    assert_eq!(client.state(), ClientState::Uninitialized);

    client.connect().await.unwrap();
    client.connect().await.unwrap();
    assert_eq!(client.state(), ClientState::Connected);
}

#[tokio::test]
async fn test_connect_rejected_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "unauthorized",
            "reason": "Name or password is incorrect."
        })))
        .mount(&server)
        .await;

    let client = CloudantClient::new(StoreConfig::new(server.uri())).unwrap();
    let err = client.connect().await.unwrap_err();

    assert!(matches!(
        err,
        StoreError::AuthenticationFailed { ref message } if message == "unauthorized"
    ));
    assert_eq!(client.state(), ClientState::Uninitialized);
}

#[tokio::test]
async fn test_connect_iam_exchange_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/identity/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errorCode": "BXNIM0415E",
            "errorMessage": "Provided API key could not be found."
        })))
        .mount(&server)
        .await;

    let config = StoreConfig::new(server.uri()).with_auth(StoreAuth::iam("bad", server.uri()));
    let client = CloudantClient::new(config).unwrap();

    let err = client.connect().await.unwrap_err();
    assert!(matches!(err, StoreError::AuthenticationFailed { .. }));
    assert!(err.to_string().contains("400"));
}

#[tokio::test]
async fn test_ensure_collection_creates_once() {
    let (server, client) = connected_client().await;

    Mock::given(method("HEAD"))
        .and(path("/gdpr-audit-log"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/gdpr-audit-log"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    client.ensure_collection(AUDIT_COLLECTION).await.unwrap();
    client.ensure_collection(AUDIT_COLLECTION).await.unwrap();

    assert_eq!(client.state(), ClientState::CollectionReady);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_setup_is_single_flight() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"couchdb": "Welcome"}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("HEAD"))
        .and(path("/gdpr-audit-log"))
        .respond_with(ResponseTemplate::new(404).set_delay(Duration::from_millis(100)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/gdpr-audit-log"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = Arc::new(CloudantClient::new(StoreConfig::new(server.uri())).unwrap());

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.setup(AUDIT_COLLECTION).await })
        })
        .collect();
    let (a, b, c) = tokio::join!(
        client.connect(),
        client.setup(AUDIT_COLLECTION),
        client.setup(AUDIT_COLLECTION),
    );

    a.unwrap();
    b.unwrap();
    c.unwrap();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(client.state(), ClientState::CollectionReady);
    server.verify().await;
}

#[tokio::test]
async fn test_ensure_collection_existing_skips_create() {
    let (server, client) = connected_client().await;

    Mock::given(method("HEAD"))
        .and(path("/gdpr-audit-log"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/gdpr-audit-log"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    client.ensure_collection(AUDIT_COLLECTION).await.unwrap();
}

#[tokio::test]
async fn test_ensure_collection_tolerates_concurrent_create() {
    let (server, client) = connected_client().await;

    Mock::given(method("HEAD"))
        .and(path("/gdpr-audit-log"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/gdpr-audit-log"))
        .respond_with(ResponseTemplate::new(412).set_body_json(json!({
            "error": "file_exists",
            "reason": "The database could not be created, the file already exists."
        })))
        .mount(&server)
        .await;

    client.ensure_collection(AUDIT_COLLECTION).await.unwrap();
}

#[tokio::test]
async fn test_setup_propagates_create_failure() {
    let (server, client) = connected_client().await;

    Mock::given(method("HEAD"))
        .and(path("/gdpr-audit-log"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/gdpr-audit-log"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": "forbidden",
            "reason": "server_admin access is required for this request"
        })))
        .mount(&server)
        .await;

    let err = client.setup(AUDIT_COLLECTION).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::CollectionCreateFailed { ref message, .. } if message == "forbidden"
    ));
    assert_eq!(client.state(), ClientState::Connected);
}

#[tokio::test]
async fn test_create_document_safe_success() {
    let (server, client) = connected_client().await;
    let document = json!({"subjectId": "subject-42", "message": "CREATE"});

    Mock::given(method("POST"))
        .and(path("/gdpr-audit-log"))
        .and(body_json(&document))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "ok": true,
            "id": "a1b2c3",
            "rev": "1-967a00dff5e02add41819138abb3284d"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client
        .create_document_safe(&document, AUDIT_COLLECTION)
        .await;

    assert_eq!(result.status(), Some(201));
    assert_eq!(result.data().unwrap()["id"], "a1b2c3");
}

#[tokio::test]
async fn test_create_document_safe_rejected() {
    let (server, client) = connected_client().await;

    Mock::given(method("POST"))
        .and(path("/gdpr-audit-log"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": "forbidden",
            "reason": "You are not allowed to access this db."
        })))
        .mount(&server)
        .await;

    let result = client
        .create_document_safe(&json!({"subjectId": "s"}), AUDIT_COLLECTION)
        .await;

    assert_eq!(result, DocumentResult::failure(Some(403), "forbidden"));
}

#[tokio::test]
async fn test_read_document_safe_success() {
    let (server, client) = connected_client().await;

    Mock::given(method("GET"))
        .and(path("/entityA-cos-info/file.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "file.json",
            "_rev": "1-abc",
            "holder_id": "subject-7"
        })))
        .mount(&server)
        .await;

    let result = client
        .read_document_safe("file.json", "entityA-cos-info")
        .await;

    assert_eq!(result.status(), Some(200));
    assert_eq!(result.data().unwrap()["holder_id"], "subject-7");
}

#[tokio::test]
async fn test_read_document_safe_not_found() {
    let (server, client) = connected_client().await;

    Mock::given(method("GET"))
        .and(path("/entityA-cos-info/missing.json"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "not_found",
            "reason": "missing"
        })))
        .mount(&server)
        .await;

    let result = client
        .read_document_safe("missing.json", "entityA-cos-info")
        .await;

    assert_eq!(result, DocumentResult::failure(Some(404), "not_found"));
}

/// Answers one request like a CouchDB server root, then stops listening.
async fn single_response_store() -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut chunk = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..n]);
        }

        let body = r#"{"couchdb":"Welcome"}"#;
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
    });

    (url, handle)
}

#[tokio::test]
async fn test_safe_operations_survive_lost_server() {
    let (url, server) = single_response_store().await;
    let client = CloudantClient::new(StoreConfig::new(url)).unwrap();
    client.connect().await.unwrap();
    assert_eq!(client.state(), ClientState::Connected);

    // The listener is dropped once the task finishes.
    server.await.unwrap();

    let created = client
        .create_document_safe(&json!({"subjectId": "s"}), AUDIT_COLLECTION)
        .await;
    let read = client.read_document_safe("doc", AUDIT_COLLECTION).await;

    for result in [created, read] {
        assert!(!result.is_success());
        assert_eq!(result.status(), None);
    }
}
