//! Route definitions for the `/teens` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::teens;
use crate::state::AppState;

/// Routes mounted at `/teens`. Teen accounts only.
///
/// ```text
/// GET  /profile             -> get_profile
/// GET  /attendance          -> list_attendance
/// POST /attendance/submit   -> submit_attendance
/// GET  /stats               -> get_stats
/// GET  /dashboard           -> get_dashboard
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(teens::get_profile))
        .route("/attendance", get(teens::list_attendance))
        .route("/attendance/submit", post(teens::submit_attendance))
        .route("/stats", get(teens::get_stats))
        .route("/dashboard", get(teens::get_dashboard))
}
