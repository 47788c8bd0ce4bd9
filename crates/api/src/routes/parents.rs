//! Route definitions for the `/parents` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::parents;
use crate::state::AppState;

/// Routes mounted at `/parents`.
///
/// ```text
/// GET    /      -> list_parents (staff)
/// POST   /      -> create_parent (admin)
/// GET    /{id}  -> get_parent (staff)
/// DELETE /{id}  -> delete_parent (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(parents::list_parents).post(parents::create_parent))
        .route(
            "/{id}",
            get(parents::get_parent).delete(parents::delete_parent),
        )
}
