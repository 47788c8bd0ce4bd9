//! Route definitions for the `/notifications` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::notifications;
use crate::state::AppState;

/// Routes mounted at `/notifications`. Every route acts on the caller's
/// own notifications.
///
/// ```text
/// GET  /               -> list_notifications (?child_id=&unread_only=)
/// POST /read-all       -> mark_all_read
/// GET  /unread-count   -> unread_count
/// GET  /{id}           -> get_notification
/// POST /{id}/read      -> mark_read
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(notifications::list_notifications))
        .route("/read-all", post(notifications::mark_all_read))
        .route("/unread-count", get(notifications::unread_count))
        .route("/{id}", get(notifications::get_notification))
        .route("/{id}/read", post(notifications::mark_read))
}
