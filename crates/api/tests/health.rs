//! Health endpoint and middleware stack behaviour.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{body_json, build_test_app, get, send};

#[tokio::test]
async fn health_reports_degraded_without_database() {
    let app = build_test_app();

    let response = get(&app, "/api/health", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"], "disconnected");
    assert!(body["timestamp"].is_string());
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = build_test_app();

    let response = get(&app, "/api/groups", None).await;

    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn supplied_request_id_is_propagated() {
    let app = build_test_app();
    let request = Request::get("/api/groups")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();

    let response = send(&app, request).await;

    assert_eq!(response.headers()["x-request-id"], "req-123");
}

#[tokio::test]
async fn unknown_route_is_404() {
    let app = build_test_app();

    let response = get(&app, "/api/nope", None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cors_preflight_allows_configured_origin() {
    let app = build_test_app();
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/groups")
        .header("origin", "http://localhost:5173")
        .header("access-control-request-method", "GET")
        .body(Body::empty())
        .unwrap();

    let response = send(&app, request).await;

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://localhost:5173"
    );
}

#[tokio::test]
async fn cors_preflight_lists_write_methods() {
    let app = build_test_app();
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/children/1")
        .header("origin", "http://localhost:5173")
        .header("access-control-request-method", "PATCH")
        .body(Body::empty())
        .unwrap();

    let response = send(&app, request).await;

    let allowed = response.headers()["access-control-allow-methods"]
        .to_str()
        .unwrap()
        .to_owned();
    for method in ["GET", "POST", "PUT", "DELETE", "PATCH"] {
        assert!(allowed.contains(method), "{method} missing from {allowed}");
    }
}
