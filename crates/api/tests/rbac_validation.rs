//! Role enforcement and request validation at the HTTP boundary.
//!
//! Every case here is decided before the handler touches the database.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get, post_json, send_json, token_for};
use serde_json::json;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Authentication required
// ---------------------------------------------------------------------------

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = build_test_app();
    let child = Uuid::new_v4();

    for uri in [
        "/api/users".to_string(),
        "/api/children".to_string(),
        "/api/groups".to_string(),
        "/api/checkin/active".to_string(),
        format!("/api/checkin/status/{child}"),
        "/api/sessions".to_string(),
        "/api/notifications".to_string(),
        "/api/notifications/unread-count".to_string(),
        "/api/attendance".to_string(),
        "/api/reports/attendance".to_string(),
        "/api/analytics/admin".to_string(),
        "/api/teachers/groups".to_string(),
        "/api/audit".to_string(),
    ] {
        let response = get(&app, &uri, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "GET {uri}");
    }
}

// ---------------------------------------------------------------------------
// Role checks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn admin_routes_reject_teachers() {
    let app = build_test_app();
    let token = token_for("teacher");

    for uri in ["/api/users", "/api/audit", "/api/audit/export", "/api/analytics/admin"] {
        let response = get(&app, uri, Some(&token)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "GET {uri}");
    }

    let response = post_json(&app, "/api/groups", Some(&token), json!({ "name": "Tots" })).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn staff_routes_reject_parents() {
    let app = build_test_app();
    let token = token_for("parent");
    let child = Uuid::new_v4();

    let cases = [
        ("/api/checkin/scan-qr".to_string(), json!({ "qr_code": "ABC" })),
        ("/api/checkin/manual".to_string(), json!({ "child_id": child })),
        ("/api/checkin/verify-otp".to_string(), json!({ "otp_code": "123456" })),
        (format!("/api/checkout/notify/{child}"), json!({})),
        ("/api/checkout/verify".to_string(), json!({ "pickup_code": "X" })),
        (format!("/api/checkout/release/{child}"), json!({})),
        ("/api/attendance/submit".to_string(), json!({ "groupId": Uuid::new_v4() })),
        ("/api/sessions".to_string(), json!({ "title": "Sunday" })),
    ];
    for (uri, body) in cases {
        let response = post_json(&app, &uri, Some(&token), body).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "POST {uri}");
    }

    let response = get(&app, "/api/checkin/active", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn super_admin_passes_admin_checks() {
    let app = build_test_app();
    let token = token_for("super_admin");

    // Past the role check the request fails validation, not authorization.
    let response = post_json(&app, "/api/groups", Some(&token), json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn teen_routes_are_for_teens_only() {
    let app = build_test_app();

    for uri in [
        "/api/teens/profile",
        "/api/teens/attendance",
        "/api/teens/stats",
        "/api/teens/dashboard",
    ] {
        let response = get(&app, uri, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "GET {uri}");

        for role in ["parent", "teacher", "admin"] {
            let response = get(&app, uri, Some(&token_for(role))).await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "GET {uri} as {role}");
        }
    }

    let response = post_json(
        &app,
        "/api/teens/attendance/submit",
        Some(&token_for("parent")),
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Teen role required");
}

#[tokio::test]
async fn check_in_desk_rejects_teens() {
    let app = build_test_app();
    let token = token_for("teen");

    let response = post_json(&app, "/api/checkin/manual", Some(&token), json!({})).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get(&app, "/api/checkin/active", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Required fields
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_group_requires_name_and_age_range() {
    let app = build_test_app();
    let token = token_for("admin");

    let response = post_json(&app, "/api/groups", Some(&token), json!({ "name": "Tots" })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "name, ageRangeMin, and ageRangeMax are required");
}

#[tokio::test]
async fn create_group_rejects_inverted_age_range() {
    let app = build_test_app();
    let token = token_for("admin");

    let response = post_json(
        &app,
        "/api/groups",
        Some(&token),
        json!({ "name": "Tots", "ageRangeMin": 6, "ageRangeMax": 3 }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn create_user_requires_name_and_email() {
    let app = build_test_app();
    let token = token_for("admin");

    let response = post_json(&app, "/api/users", Some(&token), json!({ "name": "Ruth" })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "name and email are required");
}

#[tokio::test]
async fn create_child_requires_core_fields() {
    let app = build_test_app();
    let token = token_for("admin");

    let response = post_json(&app, "/api/children", Some(&token), json!({ "name": "Ada" })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "name, parentId and dateOfBirth are required");
}

#[tokio::test]
async fn create_session_requires_title_and_date() {
    let app = build_test_app();
    let token = token_for("teacher");

    let response = post_json(&app, "/api/sessions", Some(&token), json!({ "title": "Sunday" })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "title and session_date are required");
}

#[tokio::test]
async fn booking_requires_a_child() {
    let app = build_test_app();
    let token = token_for("parent");
    let uri = format!("/api/sessions/{}/book", Uuid::new_v4());

    let response = post_json(&app, &uri, Some(&token), json!({ "child_ids": [] })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "child_id or child_ids is required");
}

#[tokio::test]
async fn checkin_endpoints_require_their_codes() {
    let app = build_test_app();
    let token = token_for("teacher");

    let response = post_json(&app, "/api/checkin/scan-qr", Some(&token), json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "QR code is required");

    let response = post_json(&app, "/api/checkin/manual", Some(&token), json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "child_id is required");

    let response = post_json(&app, "/api/checkout/verify", Some(&token), json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Pickup code (QR or OTP) is required"
    );
}

#[tokio::test]
async fn unknown_codes_are_unauthorized() {
    let app = build_test_app();
    let token = token_for("teacher");

    let response = post_json(
        &app,
        "/api/checkin/scan-qr",
        Some(&token),
        json!({ "qr_code": "NOPE" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post_json(
        &app,
        "/api/checkout/verify",
        Some(&token),
        json!({ "pickup_code": "NOPE" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["error"],
        "Invalid or expired pickup code"
    );
}

#[tokio::test]
async fn attendance_submit_validates_counts() {
    let app = build_test_app();
    let token = token_for("teacher");

    let response = post_json(&app, "/api/attendance/submit", Some(&token), json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "groupId is required");

    let response = post_json(
        &app,
        "/api/attendance/submit",
        Some(&token),
        json!({ "groupId": Uuid::new_v4(), "presentCount": -1 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profile_update_needs_a_field() {
    let app = build_test_app();
    let token = token_for("parent");

    let response = send_json(&app, "PUT", "/api/users/profile", Some(&token), json!({})).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "No fields to update");
}

#[tokio::test]
async fn short_new_password_is_rejected() {
    let app = build_test_app();
    let token = token_for("teacher");

    let response = post_json(
        &app,
        "/api/users/change-password",
        Some(&token),
        json!({ "currentPassword": "old-secret", "newPassword": "abc" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unsupported_export_format_is_rejected() {
    let app = build_test_app();
    let token = token_for("admin");

    let response = get(&app, "/api/reports/export?format=xml", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
