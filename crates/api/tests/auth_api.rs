//! HTTP-level tests for the auth endpoints and bearer-token handling.

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{body_json, build_test_app, get, post_json, token_for, TestApp};
use rkids_api::auth::jwt::hash_challenge_token;
use rkids_api::codes::{CodePurpose, MfaChallenge, PendingCode, PendingCodeStore};
use serde_json::json;
use uuid::Uuid;

const CHALLENGE_TOKEN: &str = "challenge-token-under-test";

async fn seed_challenge(app: &TestApp, code: &str, expires_in: Duration) {
    let challenge = MfaChallenge {
        user_id: Uuid::new_v4(),
        church_id: Uuid::new_v4(),
        code: code.to_string(),
    };
    let inserted = app
        .codes
        .insert(PendingCode {
            purpose: CodePurpose::Mfa,
            code: hash_challenge_token(CHALLENGE_TOKEN),
            payload: serde_json::to_value(&challenge).unwrap(),
            expires_at: Utc::now() + expires_in,
        })
        .await
        .unwrap();
    assert!(inserted);
}

#[tokio::test]
async fn login_without_credentials_is_rejected() {
    let app = build_test_app();

    let response = post_json(&app, "/api/auth/login", None, json!({ "email": "a@b.test" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(&app, "/api/auth/login", None, json!({ "password": "pw" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn verify_mfa_with_unknown_challenge_asks_to_login_again() {
    let app = build_test_app();

    let response = post_json(
        &app,
        "/api/auth/verify-mfa",
        None,
        json!({ "token": "never-issued", "code": "123456" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "MFA code expired. Please login again.");
}

#[tokio::test]
async fn verify_mfa_with_expired_challenge_removes_it() {
    let app = build_test_app();
    seed_challenge(&app, "123456", Duration::minutes(-1)).await;

    let response = post_json(
        &app,
        "/api/auth/verify-mfa",
        None,
        json!({ "token": CHALLENGE_TOKEN, "code": "123456" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "MFA code expired. Please login again.");
    assert!(app.codes.is_empty().await);
}

#[tokio::test]
async fn verify_mfa_with_wrong_code_keeps_challenge() {
    let app = build_test_app();
    seed_challenge(&app, "123456", Duration::minutes(5)).await;

    let response = post_json(
        &app,
        "/api/auth/verify-mfa",
        None,
        json!({ "token": CHALLENGE_TOKEN, "code": "654321" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid verification code");
    assert_eq!(app.codes.len().await, 1);
}

#[tokio::test]
async fn logout_requires_a_token() {
    let app = build_test_app();

    let response = post_json(&app, "/api/auth/logout", None, json!({})).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_with_token_succeeds() {
    let app = build_test_app();
    let token = token_for("teacher");

    let response = post_json(&app, "/api/auth/logout", Some(&token), json!({})).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["success"], true);
}

#[tokio::test]
async fn malformed_authorization_header_is_rejected() {
    let app = build_test_app();

    let response = get(&app, "/api/groups", Some("not-a-jwt")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn token_signed_with_another_secret_is_rejected() {
    let app = build_test_app();
    let mut foreign = common::test_config().jwt;
    foreign.secret = "some-other-secret".into();
    let token = rkids_api::auth::jwt::generate_access_token(
        Uuid::new_v4(),
        Uuid::new_v4(),
        "admin",
        &foreign,
    )
    .unwrap();

    let response = get(&app, "/api/users", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
