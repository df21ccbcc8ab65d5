mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use code_structure_service::core::workspace::Workspace;
use code_structure_service::persistence::memory::InMemoryRepositoryStore;
use code_structure_service::persistence::{DynStore, RepositoryStore};
use code_structure_service::web::server::{app, AppState};

fn state(store: DynStore, root: &std::path::Path) -> AppState {
    AppState {
        store,
        analyzer: common::FakeAnalyzer::new(),
        workspace: Workspace::new(root),
        clone_timeout: Duration::from_secs(5),
        parse_batch_size: 10,
        progress_queue_capacity: 16,
    }
}

async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(state(Arc::new(InMemoryRepositoryStore::new()), tmp.path()));

    let resp = app.oneshot(request("GET", "/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await, json!({"status": "ok"}));
}

#[tokio::test]
async fn list_returns_ids_and_uris_in_submission_order() {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryRepositoryStore::new());
    let a = store.insert("git@example.com:u/a.git").await.unwrap();
    let b = store.insert("https://example.com/u/b.git").await.unwrap();
    let app = app(state(store, tmp.path()));

    let resp = app.oneshot(request("GET", "/repo/list")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        json_body(resp).await,
        json!([
            {"id": a.id, "uri": "git@example.com:u/a.git"},
            {"id": b.id, "uri": "https://example.com/u/b.git"}
        ])
    );
}

#[tokio::test]
async fn list_hides_store_errors() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(state(Arc::new(common::UnavailableStore), tmp.path()));

    let resp = app.oneshot(request("GET", "/repo/list")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(resp).await;
    assert!(!body.to_string().contains("connection refused"));
}

#[tokio::test]
async fn unsupported_methods_are_rejected_without_upgrade() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(state(Arc::new(InMemoryRepositoryStore::new()), tmp.path()));

    for (method, uri) in [
        ("POST", "/repo/add"),
        ("PUT", "/repo/add"),
        ("DELETE", "/repo/list"),
        ("POST", "/repo/abc/initial"),
    ] {
        let resp = app.clone().oneshot(request(method, uri)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED, "{method} {uri}");
    }
}

#[tokio::test]
async fn websocket_routes_require_an_upgrade() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(state(Arc::new(InMemoryRepositoryStore::new()), tmp.path()));

    for uri in ["/repo/add", "/repo/abc/initial"] {
        let resp = app.clone().oneshot(request("GET", uri)).await.unwrap();
        assert!(resp.status().is_client_error(), "{uri}: {}", resp.status());
    }
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(state(Arc::new(InMemoryRepositoryStore::new()), tmp.path()));

    let req = Request::builder()
        .method("GET")
        .uri("/repo/list")
        .header("origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.headers().get("access-control-allow-origin").unwrap(), "*");
}
