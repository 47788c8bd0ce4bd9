//! Route definitions for the `/attendance` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::attendance;
use crate::state::AppState;

/// Routes mounted at `/attendance` (staff).
///
/// ```text
/// GET  /         -> list_attendance (?child_id=&group=&date=)
/// POST /submit   -> submit_attendance
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(attendance::list_attendance))
        .route("/submit", post(attendance::submit_attendance))
}
