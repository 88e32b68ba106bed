//! Integration tests for the HTTP catalog and content store.
//!
//! Each test stands up a mock server and checks the wire contract:
//! listing pagination, record reads, form-encoded record posts, status
//! handling and streamed content.

use std::sync::Arc;
use std::time::Duration;

use fixity_spider::{
    CatalogError, ContentError, ContentStore, EventOutcome, EventRecord, FixityAuditor,
    HttpCatalog, HttpCatalogConfig, HttpContentConfig, HttpContentStore, ObjectPager,
    ProvenanceCatalog, RecordKind, RelationshipRecord, FIXITY_CHECK_EVENT_TYPE,
};
use futures_util::StreamExt;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// md5("hello world")
const HELLO_MD5: &str = "5eb63bbbe01eeed093cb22bb8f5acdc3";

fn catalog(server: &MockServer) -> HttpCatalog {
    HttpCatalog::new(HttpCatalogConfig::new(server.uri())).unwrap()
}

fn content(server: &MockServer) -> HttpContentStore {
    HttpContentStore::new(HttpContentConfig::new(server.uri())).unwrap()
}

fn object_json(id: &str, digest: &str) -> serde_json::Value {
    json!({
        "objectIdentifier": [{"objectIdentifierType": "uuid", "objectIdentifierValue": id}],
        "objectCharacteristics": [{
            "fixity": [{"messageDigestAlgorithm": "md5", "messageDigest": digest}]
        }],
        "linkingRelationshipIdentifier": []
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Catalog
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_listing_follows_cursor_until_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/object_list"))
        .and(query_param("cursor", "0"))
        .and(query_param("limit", "500"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object_list": [{"id": "a"}, {"id": "b"}],
            "pagination": {"next_cursor": "c2"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/object_list"))
        .and(query_param("cursor", "c2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object_list": [{"id": "c"}],
            "pagination": {"next_cursor": ""}
        })))
        .mount(&server)
        .await;

    let mut pager = ObjectPager::new(Arc::new(catalog(&server)));
    let mut ids = Vec::new();
    while let Some(page) = pager.next_page().await.unwrap() {
        ids.extend(page);
    }

    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(pager.pages_fetched(), 2);
}

#[tokio::test]
async fn test_listing_without_pagination_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/object_list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object_list": [{"id": "a"}]
        })))
        .mount(&server)
        .await;

    let mut pager = ObjectPager::new(Arc::new(catalog(&server)));
    let err = pager.next_page().await.unwrap_err();
    assert!(matches!(err, CatalogError::Decode { .. }));
}

#[tokio::test]
async fn test_fetch_object_decodes_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/object_list/obj-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(object_json("obj-1", HELLO_MD5)))
        .mount(&server)
        .await;

    let object = catalog(&server).fetch_object("obj-1").await.unwrap();
    assert_eq!(object.id(), Some("obj-1"));
    assert_eq!(object.fixities().next().unwrap().message_digest, HELLO_MD5);
}

#[tokio::test]
async fn test_reserved_characters_in_id_stay_in_one_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/object_list/a%2Fb%3Fc%23d"))
        .respond_with(ResponseTemplate::new(200).set_body_json(object_json("a/b?c#d", HELLO_MD5)))
        .expect(1)
        .mount(&server)
        .await;

    let object = catalog(&server).fetch_object("a/b?c#d").await.unwrap();
    assert_eq!(object.id(), Some("a/b?c#d"));
}

#[tokio::test]
async fn test_missing_record_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/event_list/ev-9"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = catalog(&server).fetch_event("ev-9").await.unwrap_err();
    assert!(matches!(err, CatalogError::NotFound { kind: RecordKind::Event, .. }));
}

#[tokio::test]
async fn test_server_error_is_unexpected_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/relationship_list/rel-1"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = catalog(&server).fetch_relationship("rel-1").await.unwrap_err();
    assert!(matches!(err, CatalogError::UnexpectedStatus { status: 503, .. }));
}

#[tokio::test]
async fn test_garbage_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/object_list/obj-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = catalog(&server).fetch_object("obj-1").await.unwrap_err();
    assert!(matches!(err, CatalogError::Decode { .. }));
}

#[tokio::test]
async fn test_agent_and_rights_fields_pass_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/agent_list/ag-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "agentIdentifier": [{"agentIdentifierType": "uuid", "agentIdentifierValue": "ag-1"}],
            "agentName": "fixity checker"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rights_list/rt-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rightsStatementIdentifier": [{"rightsStatementIdentifierType": "uuid", "rightsStatementIdentifierValue": "rt-1"}],
            "rightsBasis": "license"
        })))
        .mount(&server)
        .await;

    let client = catalog(&server);
    let agent = client.fetch_agent("ag-1").await.unwrap();
    let rights = client.fetch_rights("rt-1").await.unwrap();
    assert_eq!(agent.fields["agentName"], "fixity checker");
    assert_eq!(rights.fields["rightsBasis"], "license");
    assert_eq!(rights.rights_statement_identifier[0].value, "rt-1");
    assert!(!agent.fields.contains_key("agentIdentifier"));
}

#[tokio::test]
async fn test_create_posts_form_encoded_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/event_list"))
        .and(body_string_contains("record="))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let event = EventRecord::new("ev-1", FIXITY_CHECK_EVENT_TYPE, chrono::Utc::now());
    catalog(&server).create_event(&event).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let content_type = requests[0].headers.get("content-type").unwrap().to_str().unwrap();
    assert_eq!(content_type, "application/x-www-form-urlencoded");
}

#[tokio::test]
async fn test_create_requires_200() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/relationship_list"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let rel = RelationshipRecord::new("rel-1", "link", "simple");
    let err = catalog(&server).create_relationship(&rel).await.unwrap_err();
    assert!(matches!(err, CatalogError::UnexpectedStatus { status: 201, .. }));
}

// ─────────────────────────────────────────────────────────────────────────────
// Content store
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_content_streams_body() {
    let server = MockServer::start().await;
    let body = vec![7u8; 64 * 1024];
    Mock::given(method("GET"))
        .and(path("/obj-1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let mut stream = content(&server).open("obj-1").await.unwrap();
    let mut received = Vec::new();
    while let Some(chunk) = stream.next().await {
        received.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(received, body);
}

#[tokio::test]
async fn test_missing_content_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/obj-x"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = content(&server).open("obj-x").await.err().unwrap();
    assert!(matches!(err, ContentError::NotFound(_)));
}

#[tokio::test]
async fn test_content_id_is_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dir%2Fobj%3F1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"x".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let mut stream = content(&server).open("dir/obj?1").await.unwrap();
    assert_eq!(&stream.next().await.unwrap().unwrap()[..], b"x");
}

/// Accepts connections and never answers them.
async fn silent_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{addr}")
}

/// Sends headers and the first few body bytes, then stalls.
async fn stalling_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\nabc")
                .await;
            let _ = socket.flush().await;
            held.push(socket);
        }
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_content_without_response_times_out() {
    let base = silent_server().await;
    let store = HttpContentStore::new(
        HttpContentConfig::new(base).with_response_timeout(Duration::from_millis(200)),
    )
    .unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), store.open("obj-1"))
        .await
        .expect("open must give up on its own");
    let err = result.err().unwrap();
    assert!(matches!(err, ContentError::Transport(_)));
}

#[tokio::test]
async fn test_stalled_content_body_times_out() {
    let base = stalling_server().await;
    let store = HttpContentStore::new(
        HttpContentConfig::new(base).with_idle_timeout(Duration::from_millis(200)),
    )
    .unwrap();

    let mut stream = store.open("obj-1").await.unwrap();
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(&first[..], b"abc");

    let next = tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("stream must give up on its own");
    assert!(matches!(next, Some(Err(ContentError::Transport(_)))));
    assert!(stream.next().await.is_none());
}

// ─────────────────────────────────────────────────────────────────────────────
// Audit over HTTP
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_audit_over_http_posts_event_then_relationship() {
    let catalog_server = MockServer::start().await;
    let content_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/object_list/obj-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(object_json("obj-1", HELLO_MD5)))
        .mount(&catalog_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/event_list"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&catalog_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/relationship_list"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&catalog_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/obj-1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello world".to_vec()))
        .mount(&content_server)
        .await;

    let auditor = FixityAuditor::new(Arc::new(catalog(&catalog_server)), Arc::new(content(&content_server)));
    let finding = auditor.audit("obj-1").await.unwrap();
    assert_eq!(finding.outcome, EventOutcome::Success);

    let posts: Vec<String> = catalog_server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "POST")
        .map(|r| r.url.path().to_string())
        .collect();
    assert_eq!(posts, vec!["/event_list", "/relationship_list"]);
}
