//! Route definitions for the `/groups` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::groups;
use crate::state::AppState;

/// Routes mounted at `/groups`.
///
/// ```text
/// GET    /            -> list_groups
/// POST   /            -> create_group (admin)
/// GET    /{id}        -> get_group
/// PUT    /{id}        -> update_group (admin)
/// DELETE /{id}        -> delete_group (admin)
/// GET    /{id}/stats  -> group_stats
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(groups::list_groups).post(groups::create_group))
        .route(
            "/{id}",
            get(groups::get_group)
                .put(groups::update_group)
                .delete(groups::delete_group),
        )
        .route("/{id}/stats", get(groups::group_stats))
}
