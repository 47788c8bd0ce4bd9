//! Route definitions for the `/bookings` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::bookings;
use crate::state::AppState;

/// Routes mounted at `/bookings`.
///
/// ```text
/// GET    /{id}  -> get_booking
/// DELETE /{id}  -> cancel_booking
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{id}",
        get(bookings::get_booking).delete(bookings::cancel_booking),
    )
}
