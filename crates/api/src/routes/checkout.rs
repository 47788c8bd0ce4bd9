//! Route definitions for the `/checkout` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::checkout;
use crate::state::AppState;

/// Routes mounted at `/checkout`. All staff only.
///
/// ```text
/// POST /notify/{child_id}        -> notify_pickup
/// POST /pickup-code/{child_id}   -> notify_pickup (alias)
/// POST /verify                   -> verify_pickup
/// POST /release/{child_id}       -> release_child
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notify/{child_id}", post(checkout::notify_pickup))
        .route("/pickup-code/{child_id}", post(checkout::notify_pickup))
        .route("/verify", post(checkout::verify_pickup))
        .route("/release/{child_id}", post(checkout::release_child))
}
