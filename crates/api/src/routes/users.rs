//! Route definitions for the `/users` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::users;
use crate::state::AppState;

/// Routes mounted at `/users`.
///
/// ```text
/// GET    /                    -> list_users (admin, ?role=)
/// POST   /                    -> create_user (admin)
/// PUT    /profile             -> update_profile (self)
/// POST   /change-password     -> change_password (self)
/// POST   /resend-invitation   -> resend_invitation (admin)
/// GET    /{id}                -> get_user (admin)
/// PUT    /{id}                -> update_user (admin)
/// POST   /{id}/suspend        -> suspend_user (admin)
/// POST   /{id}/activate       -> activate_user (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route("/profile", put(users::update_profile))
        .route("/change-password", post(users::change_password))
        .route("/resend-invitation", post(users::resend_invitation))
        .route("/{id}", get(users::get_user).put(users::update_user))
        .route("/{id}/suspend", post(users::suspend_user))
        .route("/{id}/activate", post(users::activate_user))
}
