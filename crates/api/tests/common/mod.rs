#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use shotserver_core::dispatch::{DispatchStore, MemoryStore, NoBrowserPolicy};
use tower::ServiceExt;

use shotserver_api::config::{ServerConfig, StoreBackend};
use shotserver_api::router::build_app_router;
use shotserver_api::state::AppState;

/// Remote address every test request appears to come from.
pub const REMOTE_ADDR: ([u8; 4], u16) = ([10, 0, 0, 7], 40_000);

/// Password used for factories registered through [`register_factory`].
pub const FACTORY_PASSWORD: &str = "factory-secret";

/// Origin allowed by [`test_config`].
pub const STATUS_PAGE_ORIGIN: &str = "https://status.example.org";

/// Build a test `ServerConfig` with safe defaults and the memory backend.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec![STATUS_PAGE_ORIGIN.to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        store_backend: StoreBackend::Memory,
        database_url: None,
        lease_ttl_secs: 300,
        select_page_size: 50,
        no_browser_policy: NoBrowserPolicy::Keep,
    }
}

/// Build the production router over a fresh in-memory store.
pub fn build_test_app() -> Router {
    build_test_app_with(Arc::new(MemoryStore::new()))
}

/// Build the production router over `store`, with a fixed peer address in
/// place of a real TCP connection.
pub fn build_test_app_with(store: Arc<dyn DispatchStore>) -> Router {
    build_test_app_with_config(store, test_config())
}

/// Build the production router over `store` with a custom configuration.
pub fn build_test_app_with_config(store: Arc<dyn DispatchStore>, config: ServerConfig) -> Router {
    build_app_router(AppState::new(store, config))
        .layer(MockConnectInfo(SocketAddr::from(REMOTE_ADDR)))
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Register a factory with one 1024x768 screen at 24 bpp.
pub async fn register_factory(app: &Router, name: &str) -> serde_json::Value {
    let body = serde_json::json!({
        "name": name,
        "password": FACTORY_PASSWORD,
        "screen_sizes": [{ "width": 1024, "height": 768 }],
        "color_depths": [24],
    });
    let response = post_json(app.clone(), "/api/v1/factories", body).await;
    assert_eq!(response.status(), 201);
    body_json(response).await["data"].clone()
}

/// Register a browser variant on a factory.
pub async fn add_browser(app: &Router, factory: &str, group: &str, major: i32, minor: i32) {
    let body = serde_json::json!({
        "browser_group": group,
        "version": format!("{major}.{minor}"),
        "major": major,
        "minor": minor,
    });
    let uri = format!("/api/v1/factories/{factory}/browsers");
    let response = post_json(app.clone(), &uri, body).await;
    assert_eq!(response.status(), 201);
}

/// Submit a request group and return the created requests.
pub async fn submit(app: &Router, body: serde_json::Value) -> Vec<serde_json::Value> {
    let response = post_json(app.clone(), "/api/v1/requests", body).await;
    assert_eq!(response.status(), 201);
    body_json(response).await["data"]
        .as_array()
        .expect("data should be an array")
        .clone()
}

/// Poll as `factory` with the standard password.
pub async fn poll(app: &Router, factory: &str) -> Response<Body> {
    let body = serde_json::json!({ "factory": factory, "password": FACTORY_PASSWORD });
    post_json(app.clone(), "/api/v1/poll", body).await
}
