//! Route definitions for the `/guardians` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::guardians;
use crate::state::AppState;

/// Routes mounted at `/guardians`.
///
/// ```text
/// GET    /             -> list_guardians (?child_id=)
/// POST   /             -> create_guardian (secondary guardian)
/// GET    /{id}         -> get_guardian
/// POST   /{id}/renew   -> renew_guardian
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(guardians::list_guardians).post(guardians::create_guardian),
        )
        .route("/{id}", get(guardians::get_guardian))
        .route("/{id}/renew", post(guardians::renew_guardian))
}
