//! Route definitions for the `/sessions` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{bookings, sessions};
use crate::state::AppState;

/// Routes mounted at `/sessions`.
///
/// ```text
/// GET    /                -> list_sessions (?group_id=&date=&year=&month=)
/// POST   /                -> create_session (staff)
/// GET    /{id}            -> get_session
/// PUT    /{id}            -> update_session (staff)
/// DELETE /{id}            -> delete_session (staff)
/// GET    /{id}/children   -> session_children (staff)
/// GET    /{id}/history    -> session_history (staff)
/// GET    /{id}/bookings   -> list_session_bookings (staff)
/// POST   /{id}/book       -> book_session
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(sessions::list_sessions).post(sessions::create_session),
        )
        .route(
            "/{id}",
            get(sessions::get_session)
                .put(sessions::update_session)
                .delete(sessions::delete_session),
        )
        .route("/{id}/children", get(sessions::session_children))
        .route("/{id}/history", get(sessions::session_history))
        .route("/{id}/bookings", get(bookings::list_session_bookings))
        .route("/{id}/book", post(bookings::book_session))
}
