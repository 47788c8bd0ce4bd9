//! Route definitions for the `/reports` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::reports;
use crate::state::AppState;

/// Routes mounted at `/reports` (staff).
///
/// ```text
/// GET /attendance  -> attendance_report (?group=)
/// GET /export      -> export_report (?format=csv|json)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/attendance", get(reports::attendance_report))
        .route("/export", get(reports::export_report))
}
