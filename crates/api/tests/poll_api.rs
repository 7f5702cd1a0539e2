//! HTTP-level tests for polling, request lookup, and completion.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::{add_browser, body_json, get, poll, post_json, register_factory, submit};
use serde_json::json;
use shotserver_core::dispatch::{DispatchStore, MemoryStore};

fn firefox_group() -> serde_json::Value {
    json!({ "browsers": [{ "browser_group": "firefox" }] })
}

// ---------------------------------------------------------------------------
// Poll
// ---------------------------------------------------------------------------

#[tokio::test]
async fn poll_assigns_then_reports_no_matching_request() {
    let app = common::build_test_app();
    register_factory(&app, "alpha").await;
    add_browser(&app, "alpha", "firefox", 3, 6).await;
    let requests = submit(&app, firefox_group()).await;

    let response = poll(&app, "alpha").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["request"], requests[0]["id"]);
    assert_eq!(data["browser"], "firefox");
    assert_eq!(data["version"], "3.6");
    assert_eq!(data["major"], 3);
    assert_eq!(data["minor"], 6);
    assert_eq!(data["width"], 0);
    assert_eq!(data["bpp"], 0);
    assert_eq!(data["javascript"], "");

    let response = poll(&app, "alpha").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NO_MATCHING_REQUEST");
}

#[tokio::test]
async fn poll_carries_screen_and_plugin_requirements() {
    let app = common::build_test_app();
    register_factory(&app, "alpha").await;
    add_browser(&app, "alpha", "firefox", 3, 6).await;
    submit(
        &app,
        json!({
            "width": 1024,
            "bpp": 24,
            "plugins": { "flash": { "constraint": "unconstrained", "version": "9.0" } },
            "browsers": [{ "browser_group": "firefox", "major": { "at_least": 3 } }],
        }),
    )
    .await;

    let json = body_json(poll(&app, "alpha").await).await;
    assert_eq!(json["data"]["width"], 1024);
    assert_eq!(json["data"]["height"], 0);
    assert_eq!(json["data"]["bpp"], 24);
    // Unconstrained plugins never report a version label.
    assert_eq!(json["data"]["flash"], "");
}

#[tokio::test]
async fn poll_reports_label_of_constrained_plugin() {
    let app = common::build_test_app();
    register_factory(&app, "alpha").await;
    let browser = json!({
        "browser_group": "firefox",
        "version": "3.6",
        "major": 3,
        "minor": 6,
        "flash_id": 10,
    });
    let response = post_json(app.clone(), "/api/v1/factories/alpha/browsers", browser).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let unlabelled = json!({
        "plugins": { "flash": { "constraint": { "exact": 10 } } },
        "browsers": [{ "browser_group": "firefox" }],
    });
    let response = post_json(app.clone(), "/api/v1/requests", unlabelled).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(poll(&app, "alpha").await.status(), StatusCode::NOT_FOUND);

    submit(
        &app,
        json!({
            "plugins": { "flash": { "constraint": { "exact": 10 }, "version": "10.1" } },
            "browsers": [{ "browser_group": "firefox" }],
        }),
    )
    .await;
    let json = body_json(poll(&app, "alpha").await).await;
    assert_eq!(json["data"]["flash"], "10.1");
}

#[tokio::test]
async fn poll_skips_requests_the_factory_cannot_serve() {
    let app = common::build_test_app();
    register_factory(&app, "alpha").await;
    add_browser(&app, "alpha", "firefox", 2, 0).await;
    submit(
        &app,
        json!({ "browsers": [{ "browser_group": "firefox", "major": { "exact": 3 } }] }),
    )
    .await;
    submit(&app, json!({ "browsers": [{ "browser_group": "opera" }] })).await;
    submit(&app, json!({ "width": 1280, "browsers": [{ "browser_group": "firefox" }] })).await;

    let response = poll(&app, "alpha").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NO_MATCHING_REQUEST");
}

#[tokio::test]
async fn poll_unknown_factory_is_404() {
    let app = common::build_test_app();
    let response = poll(&app, "ghost").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNKNOWN_FACTORY");
    assert!(json["error"].as_str().unwrap().contains("ghost"));
}

#[tokio::test]
async fn poll_with_wrong_password_is_401() {
    let app = common::build_test_app();
    register_factory(&app, "alpha").await;

    let body = json!({ "factory": "alpha", "password": "not-the-password" });
    let response = post_json(app, "/api/v1/poll", body).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn poll_name_is_case_insensitive() {
    let app = common::build_test_app();
    register_factory(&app, "alpha").await;

    let response = poll(&app, "ALPHA").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NO_MATCHING_REQUEST");
}

#[tokio::test]
async fn poll_records_heartbeat_and_remote_address() {
    let store = Arc::new(MemoryStore::new());
    let app = common::build_test_app_with(store.clone());
    register_factory(&app, "alpha").await;

    let before = store.find_factory_by_name("alpha").await.unwrap().unwrap();
    assert!(before.last_poll_at.is_none());

    poll(&app, "alpha").await;

    let after = store.find_factory_by_name("alpha").await.unwrap().unwrap();
    assert!(after.last_poll_at.is_some());
    assert_eq!(after.ip_address.as_deref(), Some("10.0.0.7"));
}

// ---------------------------------------------------------------------------
// Request state and completion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn leased_request_shows_its_holder() {
    let app = common::build_test_app();
    let factory = register_factory(&app, "alpha").await;
    add_browser(&app, "alpha", "firefox", 3, 6).await;
    let requests = submit(&app, firefox_group()).await;
    let id = requests[0]["id"].as_i64().unwrap();

    let json = body_json(get(app.clone(), &format!("/api/v1/requests/{id}")).await).await;
    assert!(json["data"]["factory_id"].is_null());

    poll(&app, "alpha").await;

    let json = body_json(get(app, &format!("/api/v1/requests/{id}")).await).await;
    assert_eq!(json["data"]["factory_id"], factory["id"]);
    assert!(json["data"]["locked_at"].is_string());
    assert!(json["data"]["completed_at"].is_null());
}

#[tokio::test]
async fn only_the_lease_holder_can_complete() {
    let app = common::build_test_app();
    register_factory(&app, "alpha").await;
    register_factory(&app, "beta").await;
    add_browser(&app, "alpha", "firefox", 3, 6).await;
    let requests = submit(&app, firefox_group()).await;
    let id = requests[0]["id"].as_i64().unwrap();
    let uri = format!("/api/v1/requests/{id}/complete");

    assert_eq!(poll(&app, "alpha").await.status(), StatusCode::OK);

    let beta = json!({ "factory": "beta", "password": common::FACTORY_PASSWORD });
    let response = post_json(app.clone(), &uri, beta).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let alpha = json!({ "factory": "alpha", "password": common::FACTORY_PASSWORD });
    let response = post_json(app.clone(), &uri, alpha.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["data"]["completed_at"].is_string());

    let response = post_json(app, &uri, alpha).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn complete_requires_valid_credentials() {
    let app = common::build_test_app();
    register_factory(&app, "alpha").await;

    let body = json!({ "factory": "alpha", "password": "wrong-password" });
    let response = post_json(app, "/api/v1/requests/1/complete", body).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_request_is_404() {
    let app = common::build_test_app();
    let response = get(app, "/api/v1/requests/999").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

// ---------------------------------------------------------------------------
// Lease configuration
// ---------------------------------------------------------------------------

#[test]
#[should_panic(expected = "LEASE_TTL_SECS")]
fn lease_ttl_that_would_wrap_is_rejected() {
    let mut config = common::test_config();
    config.lease_ttl_secs = u64::MAX;
    shotserver_api::state::AppState::new(Arc::new(MemoryStore::new()), config);
}

#[test]
#[should_panic(expected = "LEASE_TTL_SECS")]
fn zero_lease_ttl_is_rejected() {
    let mut config = common::test_config();
    config.lease_ttl_secs = 0;
    shotserver_api::state::AppState::new(Arc::new(MemoryStore::new()), config);
}
