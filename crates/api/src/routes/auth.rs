//! Route definitions for the `/auth` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST /login       -> login (public, starts MFA challenge)
/// POST /verify-mfa  -> verify_mfa (public, issues access token)
/// POST /logout      -> logout (requires auth)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/verify-mfa", post(auth::verify_mfa))
        .route("/logout", post(auth::logout))
}
