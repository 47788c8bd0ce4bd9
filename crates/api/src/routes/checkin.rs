//! Route definitions for the `/checkin` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::checkin;
use crate::state::AppState;

/// Routes mounted at `/checkin`.
///
/// ```text
/// POST /generate-qr         -> generate_qr (parent or staff)
/// POST /scan-qr             -> scan_qr (staff)
/// POST /manual              -> manual_checkin (staff)
/// POST /verify-otp          -> verify_otp (staff)
/// GET  /active              -> list_active (staff)
/// GET  /status/{child_id}   -> checkin_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate-qr", post(checkin::generate_qr))
        .route("/scan-qr", post(checkin::scan_qr))
        .route("/manual", post(checkin::manual_checkin))
        .route("/verify-otp", post(checkin::verify_otp))
        .route("/active", get(checkin::list_active))
        .route("/status/{child_id}", get(checkin::checkin_status))
}
