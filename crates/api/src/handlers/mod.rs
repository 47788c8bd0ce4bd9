//! Request handlers, one module per resource.
//!
//! Handlers validate input, delegate to the repositories in `rkids_db`,
//! publish notification events and map errors via [`AppError`].

pub mod analytics;
pub mod attendance;
pub mod audit;
pub mod auth;
pub mod bookings;
pub mod checkin;
pub mod checkout;
pub mod children;
pub mod groups;
pub mod guardians;
pub mod notifications;
pub mod parents;
pub mod reports;
pub mod sessions;
pub mod teachers;
pub mod teens;
pub mod users;

use rkids_core::error::CoreError;
use rkids_core::types::DbId;
use rkids_db::models::child::Child;
use rkids_db::repositories::ChildRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Trim an optional string field, dropping it when blank.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Load a child of the caller's church or fail with 404.
pub(crate) async fn find_child(state: &AppState, church_id: DbId, id: DbId) -> AppResult<Child> {
    ChildRepo::find_by_id(&state.pool, church_id, id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Child", id)))
}

/// Load a child the caller may see: any child for staff, only their own
/// for parents. Others get the same 404 as a missing child.
pub(crate) async fn find_accessible_child(
    state: &AppState,
    auth: &AuthUser,
    id: DbId,
) -> AppResult<Child> {
    let child = find_child(state, auth.church_id, id).await?;
    if !auth.is_staff() && !guardians::owns_child(state, auth, child.parent_id).await? {
        return Err(CoreError::not_found("Child", id).into());
    }
    Ok(child)
}
