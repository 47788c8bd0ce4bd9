//! Route definitions for the `/children` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{bookings, children};
use crate::state::AppState;

/// Routes mounted at `/children`.
///
/// ```text
/// GET    /                -> list_children (?parent_id=&group=&status=)
/// POST   /                -> create_child
/// GET    /{id}            -> get_child
/// PUT    /{id}            -> update_child (admin)
/// DELETE /{id}            -> delete_child (admin)
/// POST   /{id}/approve    -> approve_child (admin)
/// POST   /{id}/reject     -> reject_child (admin)
/// GET    /{id}/bookings   -> list_child_bookings
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(children::list_children).post(children::create_child),
        )
        .route(
            "/{id}",
            get(children::get_child)
                .put(children::update_child)
                .delete(children::delete_child),
        )
        .route("/{id}/approve", post(children::approve_child))
        .route("/{id}/reject", post(children::reject_child))
        .route("/{id}/bookings", get(bookings::list_child_bookings))
}
