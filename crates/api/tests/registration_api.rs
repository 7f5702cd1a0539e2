//! HTTP-level tests for factory, browser, and request group registration.

mod common;

use axum::http::StatusCode;
use common::{body_json, post_json, register_factory, submit};
use serde_json::json;

// ---------------------------------------------------------------------------
// Factories
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_factory_lowercases_and_hides_hash() {
    let app = common::build_test_app();
    let factory = register_factory(&app, "Alpha").await;

    assert_eq!(factory["name"], "alpha");
    assert!(factory.get("password_hash").is_none());
    assert_eq!(factory["screen_sizes"][0]["width"], 1024);
    assert_eq!(factory["color_depths"], json!([24]));
}

#[tokio::test]
async fn duplicate_factory_is_conflict() {
    let app = common::build_test_app();
    register_factory(&app, "alpha").await;

    let body = json!({ "name": "ALPHA", "password": "another-secret" });
    let response = post_json(app, "/api/v1/factories", body).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CONFLICT");
}

#[tokio::test]
async fn factory_validation_errors_are_400() {
    let app = common::build_test_app();

    let cases = [
        json!({ "name": "has space", "password": "long-enough" }),
        json!({ "name": "alpha", "password": "short" }),
        json!({ "name": "alpha", "password": "long-enough", "color_depths": [12] }),
    ];
    for body in cases {
        let response = post_json(app.clone(), "/api/v1/factories", body.clone()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    }
}

// ---------------------------------------------------------------------------
// Browsers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn add_browser_creates_group_on_first_use() {
    let app = common::build_test_app();
    let factory = register_factory(&app, "alpha").await;

    let body = json!({
        "browser_group": "Dillo",
        "version": "2.1",
        "major": 2,
        "minor": 1,
        "command": "dillo --geometry 1024x768",
    });
    let response = post_json(app, "/api/v1/factories/alpha/browsers", body).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["data"]["browser_group"], "dillo");
    assert_eq!(json["data"]["factory_id"], factory["id"]);
    assert_eq!(json["data"]["active"], true);
}

#[tokio::test]
async fn add_browser_to_unknown_factory_is_404() {
    let app = common::build_test_app();

    let body = json!({ "browser_group": "firefox", "version": "3.0", "major": 3, "minor": 0 });
    let response = post_json(app, "/api/v1/factories/ghost/browsers", body).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "UNKNOWN_FACTORY");
}

// ---------------------------------------------------------------------------
// Request groups
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_creates_one_request_per_browser() {
    let app = common::build_test_app();

    let requests = submit(
        &app,
        json!({
            "width": 800,
            "height": 600,
            "expire_minutes": 60,
            "browsers": [
                { "browser_group": "firefox", "major": { "at_least": 3 } },
                { "browser_group": "msie", "major": { "exact": 7 }, "minor": { "exact": 0 } },
            ],
        }),
    )
    .await;

    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0]["request_group_id"], requests[1]["request_group_id"]);
    assert_eq!(requests[0]["predicate"]["major"], json!({ "at_least": 3 }));
    assert_eq!(requests[0]["predicate"]["minor"], "unconstrained");
    assert_eq!(requests[1]["predicate"]["major"], json!({ "exact": 7 }));
    assert_eq!(requests[0]["width"], 800);
    assert!(requests[0]["factory_id"].is_null());
}

#[tokio::test]
async fn submit_validation_errors_are_400() {
    let app = common::build_test_app();

    let cases = [
        json!({ "browsers": [] }),
        json!({ "bpp": 12, "browsers": [{ "browser_group": "firefox" }] }),
        json!({ "expire_minutes": 0, "browsers": [{ "browser_group": "firefox" }] }),
        json!({ "width": 0, "browsers": [{ "browser_group": "firefox" }] }),
        json!({
            "plugins": { "flash": { "constraint": { "exact": 10 } } },
            "browsers": [{ "browser_group": "firefox" }],
        }),
        json!({
            "plugins": { "java": { "constraint": { "at_least": -1 }, "version": "1.6" } },
            "browsers": [{ "browser_group": "firefox" }],
        }),
    ];
    for body in cases {
        let response = post_json(app.clone(), "/api/v1/requests", body.clone()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    }
}
