//! Route definitions for the `/analytics` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::analytics;
use crate::state::AppState;

/// Routes mounted at `/analytics`.
///
/// ```text
/// GET /admin          -> admin_analytics (admin)
/// GET /teacher        -> teacher_analytics (staff)
/// GET /group/{name}   -> group_analytics (staff)
/// GET /child/{id}     -> child_analytics
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin", get(analytics::admin_analytics))
        .route("/teacher", get(analytics::teacher_analytics))
        .route("/group/{name}", get(analytics::group_analytics))
        .route("/child/{id}", get(analytics::child_analytics))
}
