//! Check-in, pickup and release against a real database.
//!
//! Each test gets its own migrated database from `#[sqlx::test]`.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app_with_pool, get, post_json, seed, send_json, token_for_user};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Desk check-in through release
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_manual_check_in_pickup_and_release(pool: PgPool) {
    let church = seed::church(&pool, "teacher").await;
    let parent = seed::guardian(&pool, church.id, "RS001").await;
    let ann = seed::child(&pool, church.id, parent.id, "Ann").await;
    let app = build_test_app_with_pool(pool);
    let token = church.staff_token();

    let response = post_json(&app, "/api/checkin/manual", Some(&token), json!({ "child_id": ann.id })).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["childName"], "Ann");
    assert_eq!(body["data"]["method"], "PARENT_ID");
    assert_eq!(body["data"]["status"], "checked_in");

    // A child with an open record cannot be checked in twice.
    let response = post_json(&app, "/api/checkin/manual", Some(&token), json!({ "child_id": ann.id })).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["error"], "Ann is already checked in");

    let response = get(&app, &format!("/api/checkin/status/{}", ann.id), Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "checked_in");
    assert_eq!(body["data"]["checkedIn"], true);

    let response = post_json(&app, &format!("/api/checkout/notify/{}", ann.id), Some(&token), json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let pickup_otp = body["data"]["pickupOTP"].as_str().unwrap().to_string();
    assert_eq!(pickup_otp.len(), 6);
    assert!(body["data"]["pickupQR"].as_str().is_some());

    let response = post_json(
        &app,
        "/api/checkout/verify",
        Some(&token),
        json!({ "pickup_code": pickup_otp, "child_id": ann.id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["verified"], true);
    assert_eq!(body["data"]["authorized"], true);

    let response = post_json(&app, &format!("/api/checkout/release/{}", ann.id), Some(&token), json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "checked_out");

    // Release retires the pickup codes.
    let response = post_json(&app, "/api/checkout/verify", Some(&token), json!({ "pickup_code": pickup_otp })).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Invalid or expired pickup code");

    let response = post_json(&app, &format!("/api/checkout/release/{}", ann.id), Some(&token), json!({})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Child is not currently checked in");

    let response = get(&app, &format!("/api/checkin/status/{}", ann.id), Some(&token)).await;
    assert_eq!(body_json(response).await["data"]["status"], "checked_out");

    // Checked out children may come back the same day.
    let response = post_json(&app, "/api/checkin/manual", Some(&token), json!({ "child_id": ann.id })).await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_release_requires_an_open_record(pool: PgPool) {
    let church = seed::church(&pool, "teacher").await;
    let parent = seed::guardian(&pool, church.id, "RS001").await;
    let ben = seed::child(&pool, church.id, parent.id, "Ben").await;
    let app = build_test_app_with_pool(pool);
    let token = church.staff_token();

    let response = post_json(&app, &format!("/api/checkout/release/{}", ben.id), Some(&token), json!({})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Child is not checked in");

    let response = post_json(&app, &format!("/api/checkout/notify/{}", ben.id), Some(&token), json!({})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Child is not checked in");

    let unknown = uuid::Uuid::new_v4();
    let response = post_json(&app, &format!("/api/checkout/release/{unknown}"), Some(&token), json!({})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await["error"],
        format!("Child with id {unknown} not found")
    );
}

// ---------------------------------------------------------------------------
// Session bookings
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_booking_cancel_rebook_and_redeem(pool: PgPool) {
    let church = seed::church(&pool, "admin").await;
    let parent = seed::guardian(&pool, church.id, "RS001").await;
    let ann = seed::child(&pool, church.id, parent.id, "Ann").await;
    let session = seed::session(&pool, church.id, church.staff.id, "Sunday School").await;
    let app = build_test_app_with_pool(pool);
    let token = church.staff_token();
    let book_uri = format!("/api/sessions/{}/book", session.id);

    let response = post_json(&app, &book_uri, Some(&token), json!({ "child_ids": [ann.id] })).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let first = body_json(response).await["data"]["bookings"][0].clone();
    assert_eq!(first["status"], "booked");
    let booking_id = first["id"].as_str().unwrap().to_string();

    // Booking the same child again is refused while the booking stands.
    let response = post_json(&app, &book_uri, Some(&token), json!({ "child_id": ann.id })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send_json(&app, "DELETE", &format!("/api/bookings/{booking_id}"), Some(&token), json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = get(&app, &format!("/api/bookings/{booking_id}"), Some(&token)).await;
    assert_eq!(body_json(response).await["data"]["status"], "cancelled");

    let response = post_json(&app, &book_uri, Some(&token), json!({ "child_ids": [ann.id] })).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let rebooked = body_json(response).await["data"]["bookings"][0].clone();
    assert_eq!(rebooked["id"], first["id"]);
    assert_eq!(rebooked["status"], "booked");
    assert_ne!(rebooked["qrCode"], first["qrCode"]);

    let otp = rebooked["otpCode"].as_str().unwrap();
    let response = post_json(
        &app,
        "/api/checkin/verify-otp",
        Some(&token),
        json!({ "otp_code": otp, "session_id": session.id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["method"], "OTP");
    assert_eq!(body["data"]["bookingId"], first["id"]);

    let response = get(&app, &format!("/api/bookings/{booking_id}"), Some(&token)).await;
    assert_eq!(body_json(response).await["data"]["status"], "checked_in");

    // A redeemed booking cannot be cancelled or redeemed again.
    let response = send_json(&app, "DELETE", &format!("/api/bookings/{booking_id}"), Some(&token), json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(&app, &format!("/api/checkout/release/{}", ann.id), Some(&token), json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = get(&app, &format!("/api/bookings/{booking_id}"), Some(&token)).await;
    assert_eq!(body_json(response).await["data"]["status"], "checked_out");

    let response = post_json(
        &app,
        "/api/checkin/verify-otp",
        Some(&token),
        json!({ "otp_code": otp, "session_id": session.id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Child already checked in or cancelled");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_manual_session_check_in_books_the_child(pool: PgPool) {
    let church = seed::church(&pool, "teacher").await;
    let parent = seed::guardian(&pool, church.id, "RS001").await;
    let ann = seed::child(&pool, church.id, parent.id, "Ann").await;
    let session = seed::session(&pool, church.id, church.staff.id, "Sunday School").await;
    let app = build_test_app_with_pool(pool);
    let token = church.staff_token();

    let response = post_json(
        &app,
        "/api/checkin/manual",
        Some(&token),
        json!({ "childId": ann.id, "sessionId": session.id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let booking_id = body["data"]["bookingId"].as_str().unwrap().to_string();

    let response = get(&app, &format!("/api/bookings/{booking_id}"), Some(&token)).await;
    assert_eq!(body_json(response).await["data"]["status"], "checked_in");
}

// ---------------------------------------------------------------------------
// Teen self check-in
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_teen_self_check_in_and_stats(pool: PgPool) {
    let church = seed::church(&pool, "teacher").await;
    let parent = seed::guardian(&pool, church.id, "RS001").await;
    let tia = seed::child(&pool, church.id, parent.id, "Tia").await;
    let teen = seed::user(&pool, church.id, "teen", Some(tia.id)).await;
    let app = build_test_app_with_pool(pool);
    let token = token_for_user(teen.id, church.id, "teen");

    let response = get(&app, "/api/teens/profile", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["childName"], "Tia");
    assert_eq!(body["data"]["parentName"], "Hope Parent");

    let response = post_json(&app, "/api/teens/attendance/submit", Some(&token), json!({})).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["data"]["method"], "PARENT_ID");

    let response = post_json(&app, "/api/teens/attendance/submit", Some(&token), json!({})).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["error"], "Tia is already checked in");

    let response = get(&app, "/api/teens/attendance", Some(&token)).await;
    let body = body_json(response).await;
    let history = body["data"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["checkedOut"], false);

    let response = get(&app, "/api/teens/stats", Some(&token)).await;
    let body = body_json(response).await;
    assert_eq!(body["data"]["attendedLast30Days"], 1);
    assert_eq!(body["data"]["attendanceRate"], 3.33);

    let response = get(&app, "/api/teens/dashboard", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["recentAttendance"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["profile"]["childId"], json!(tia.id));

    // Staff see the teen's record like any other.
    let response = get(&app, &format!("/api/checkin/status/{}", tia.id), Some(&church.staff_token())).await;
    assert_eq!(body_json(response).await["data"]["status"], "checked_in");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_teen_submit_for_session_uses_its_booking(pool: PgPool) {
    let church = seed::church(&pool, "admin").await;
    let parent = seed::guardian(&pool, church.id, "RS001").await;
    let tia = seed::child(&pool, church.id, parent.id, "Tia").await;
    let sam = seed::child(&pool, church.id, parent.id, "Sam").await;
    let teen = seed::user(&pool, church.id, "teen", Some(tia.id)).await;
    let session = seed::session(&pool, church.id, church.staff.id, "Youth Night").await;
    let app = build_test_app_with_pool(pool);
    let token = token_for_user(teen.id, church.id, "teen");
    let staff_token = church.staff_token();

    // A booking for another child is invisible to the teen.
    let response = post_json(
        &app,
        &format!("/api/sessions/{}/book", session.id),
        Some(&staff_token),
        json!({ "child_ids": [sam.id] }),
    )
    .await;
    let sams = body_json(response).await["data"]["bookings"][0]["id"].clone();
    let response = post_json(
        &app,
        "/api/teens/attendance/submit",
        Some(&token),
        json!({ "bookingId": sams }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = post_json(
        &app,
        "/api/teens/attendance/submit",
        Some(&token),
        json!({ "sessionId": session.id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["sessionId"], json!(session.id));
    let booking_id = body["data"]["bookingId"].as_str().unwrap().to_string();

    let response = get(&app, &format!("/api/bookings/{booking_id}"), Some(&staff_token)).await;
    assert_eq!(body_json(response).await["data"]["status"], "checked_in");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_unlinked_teen_gets_not_found(pool: PgPool) {
    let church = seed::church(&pool, "admin").await;
    let teen = seed::user(&pool, church.id, "teen", None).await;
    let app = build_test_app_with_pool(pool);
    let token = token_for_user(teen.id, church.id, "teen");

    for uri in ["/api/teens/profile", "/api/teens/stats", "/api/teens/dashboard"] {
        let response = get(&app, uri, Some(&token)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "GET {uri}");
        assert_eq!(body_json(response).await["error"], "Teen account not linked to a child");
    }
}
