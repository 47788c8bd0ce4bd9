//! Route definitions for the `/audit` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::audit;
use crate::state::AppState;

/// Routes mounted at `/audit` (admin only).
///
/// ```text
/// GET /          -> list_audit_logs (?user_id=&action=&entity_type=&from=&to=&limit=&offset=)
/// GET /export    -> export_audit_logs (?format=json|csv)
/// GET /{id}      -> get_audit_log
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(audit::list_audit_logs))
        .route("/export", get(audit::export_audit_logs))
        .route("/{id}", get(audit::get_audit_log))
}
