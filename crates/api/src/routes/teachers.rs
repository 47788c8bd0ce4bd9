//! Route definitions for the `/teachers` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::teachers;
use crate::state::AppState;

/// Routes mounted at `/teachers`, scoped to the caller's assigned groups.
///
/// ```text
/// GET /groups     -> teacher_groups
/// GET /children   -> teacher_children (?group_id=)
/// GET /checkins   -> teacher_checkins (today)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/groups", get(teachers::teacher_groups))
        .route("/children", get(teachers::teacher_children))
        .route("/checkins", get(teachers::teacher_checkins))
}
