//! Handlers for the `/users` resource (account management).
//!
//! Listing, creation and administrative updates require [`RequireAdmin`];
//! profile and password changes act on the caller's own account.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use rkids_core::error::CoreError;
use rkids_core::notification::invitation_message;
use rkids_core::roles::{is_known_role, normalize_role, ROLE_PARENT};
use rkids_core::types::DbId;
use rkids_core::validation::{normalize_email, normalize_phone, require_field, validate_new_password};
use rkids_db::models::user::{CreateUser, UpdateUser, User, UserResponse};
use rkids_db::repositories::UserRepo;
use rkids_events::MinistryEvent;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::non_blank;
use crate::audit::{
    self, AuditEntry, ClientInfo, ACTION_ACTIVATE_USER, ACTION_CHANGE_PASSWORD,
    ACTION_CREATE_USER, ACTION_SUSPEND_USER, ACTION_UPDATE_USER,
};
use crate::auth::password::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::{DataResponse, SuccessResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ListUsersParams {
    pub role: Option<String>,
}

/// Request body for `POST /users`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[serde(alias = "linked_guardian_id")]
    pub linked_guardian_id: Option<DbId>,
    #[serde(alias = "linked_child_id")]
    pub linked_child_id: Option<DbId>,
}

/// Request body for `PUT /users/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Request body for `PUT /users/profile`.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Request body for `POST /users/change-password`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(alias = "current_password")]
    pub current_password: Option<String>,
    #[serde(alias = "new_password")]
    pub new_password: Option<String>,
}

/// Request body for `POST /users/resend-invitation`.
#[derive(Debug, Deserialize)]
pub struct ResendInvitationRequest {
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/users?role=
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(params): Query<ListUsersParams>,
) -> AppResult<Json<DataResponse<Vec<UserResponse>>>> {
    let role = params
        .role
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(normalize_role);
    let users = UserRepo::list(&state.pool, admin.church_id, role.as_deref()).await?;
    Ok(Json(DataResponse {
        data: users.into_iter().map(UserResponse::from).collect(),
    }))
}

/// POST /api/users
///
/// Create an account without a password and send the invitation.
pub async fn create_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    client: ClientInfo,
    Json(input): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<UserResponse>>)> {
    let (Some(name), Some(email)) = (
        input.name.as_deref().map(str::trim).filter(|v| !v.is_empty()),
        input.email.as_deref().map(str::trim).filter(|v| !v.is_empty()),
    ) else {
        return Err(AppError::BadRequest("name and email are required".into()));
    };
    let email = normalize_email(email)?;
    let role = parse_role(input.role.as_deref().unwrap_or(ROLE_PARENT))?;
    let phone = input.phone.as_deref().map(normalize_phone).transpose()?;

    if UserRepo::find_by_email(&state.pool, admin.church_id, &email)
        .await?
        .is_some()
    {
        return Err(AppError::Core(CoreError::Conflict(
            "User with this email already exists".into(),
        )));
    }

    let dto = CreateUser {
        email,
        name: name.to_string(),
        role,
        password_hash: None,
        phone,
        address: input.address,
        linked_guardian_id: input.linked_guardian_id,
        linked_child_id: input.linked_child_id,
    };
    let user = UserRepo::create(&state.pool, admin.church_id, &dto).await?;

    send_invitation(&state, &user);
    audit::record(
        &state.pool,
        AuditEntry {
            church_id: admin.church_id,
            user_id: Some(admin.user_id),
            action: ACTION_CREATE_USER,
            entity_type: "user",
            entity_id: Some(user.id.to_string()),
            details: Some(json!({ "email": user.email, "role": user.role })),
            client: &client,
        },
    )
    .await;

    tracing::info!(user_id = %user.id, role = %user.role, "User created");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: UserResponse::from(user),
        }),
    ))
}

/// GET /api/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = find_user(&state, admin.church_id, id).await?;
    Ok(Json(DataResponse {
        data: UserResponse::from(user),
    }))
}

/// PUT /api/users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    client: ClientInfo,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateUserRequest>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let dto = UpdateUser {
        email: input.email.as_deref().map(normalize_email).transpose()?,
        name: non_blank(input.name),
        role: input.role.as_deref().map(parse_role).transpose()?,
        phone: input.phone.as_deref().map(normalize_phone).transpose()?,
        address: non_blank(input.address),
        ..Default::default()
    };
    if !dto.has_changes() {
        return Err(AppError::BadRequest("No fields to update".into()));
    }

    let user = UserRepo::update(&state.pool, admin.church_id, id, &dto)
        .await?
        .ok_or_else(|| CoreError::not_found("User", id))?;

    audit::record(
        &state.pool,
        AuditEntry {
            church_id: admin.church_id,
            user_id: Some(admin.user_id),
            action: ACTION_UPDATE_USER,
            entity_type: "user",
            entity_id: Some(id.to_string()),
            details: None,
            client: &client,
        },
    )
    .await;

    Ok(Json(DataResponse {
        data: UserResponse::from(user),
    }))
}

/// POST /api/users/{id}/suspend
pub async fn suspend_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    client: ClientInfo,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<SuccessResponse>>> {
    if id == admin.user_id {
        return Err(AppError::BadRequest("You cannot suspend your own account".into()));
    }
    set_active(&state, &admin, &client, id, false).await
}

/// POST /api/users/{id}/activate
pub async fn activate_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    client: ClientInfo,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<SuccessResponse>>> {
    set_active(&state, &admin, &client, id, true).await
}

/// PUT /api/users/profile
///
/// Update the caller's own name, email, phone or address.
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<UpdateProfileRequest>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let mut dto = UpdateUser {
        email: input.email.as_deref().map(normalize_email).transpose()?,
        name: non_blank(input.name),
        phone: input.phone.as_deref().map(normalize_phone).transpose()?,
        address: non_blank(input.address),
        ..Default::default()
    };
    if !dto.has_changes() {
        return Err(AppError::BadRequest("No fields to update".into()));
    }
    dto.profile_updated = Some(true);

    let user = UserRepo::update(&state.pool, auth.church_id, auth.user_id, &dto)
        .await?
        .ok_or_else(|| CoreError::not_found("User", auth.user_id))?;

    Ok(Json(DataResponse {
        data: UserResponse::from(user),
    }))
}

/// POST /api/users/change-password
///
/// Requires the current password unless the account has none yet (an
/// invited user setting their first password).
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Json(input): Json<ChangePasswordRequest>,
) -> AppResult<Json<DataResponse<MessageResponse>>> {
    let new_password = require_field("newPassword", input.new_password.as_deref())?;
    validate_new_password(new_password)?;

    let user = find_user(&state, auth.church_id, auth.user_id).await?;

    if let Some(stored) = user.password_hash.as_deref() {
        let current = require_field("currentPassword", input.current_password.as_deref())?;
        let valid = verify_password(current, stored)
            .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
        if !valid {
            return Err(AppError::unauthorized("Current password is incorrect"));
        }
    }

    let hash = hash_password(new_password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    if !UserRepo::update_password(&state.pool, user.id, &hash).await? {
        return Err(CoreError::not_found("User", user.id).into());
    }

    audit::record(
        &state.pool,
        AuditEntry {
            church_id: auth.church_id,
            user_id: Some(auth.user_id),
            action: ACTION_CHANGE_PASSWORD,
            entity_type: "user",
            entity_id: Some(user.id.to_string()),
            details: None,
            client: &client,
        },
    )
    .await;

    Ok(Json(DataResponse {
        data: MessageResponse {
            success: true,
            message: "Password changed successfully",
        },
    }))
}

/// POST /api/users/resend-invitation
pub async fn resend_invitation(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<ResendInvitationRequest>,
) -> AppResult<Json<DataResponse<MessageResponse>>> {
    let email = normalize_email(require_field("email", input.email.as_deref())?)?;
    let user = UserRepo::find_by_email(&state.pool, admin.church_id, &email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    send_invitation(&state, &user);

    Ok(Json(DataResponse {
        data: MessageResponse {
            success: true,
            message: "Invitation sent",
        },
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_user(state: &AppState, church_id: DbId, id: DbId) -> AppResult<User> {
    UserRepo::find_by_id(&state.pool, church_id, id)
        .await?
        .ok_or_else(|| CoreError::not_found("User", id).into())
}

async fn set_active(
    state: &AppState,
    admin: &AuthUser,
    client: &ClientInfo,
    id: DbId,
    active: bool,
) -> AppResult<Json<DataResponse<SuccessResponse>>> {
    UserRepo::set_active(&state.pool, admin.church_id, id, active)
        .await?
        .ok_or_else(|| CoreError::not_found("User", id))?;

    audit::record(
        &state.pool,
        AuditEntry {
            church_id: admin.church_id,
            user_id: Some(admin.user_id),
            action: if active {
                ACTION_ACTIVATE_USER
            } else {
                ACTION_SUSPEND_USER
            },
            entity_type: "user",
            entity_id: Some(id.to_string()),
            details: None,
            client,
        },
    )
    .await;

    tracing::info!(user_id = %id, active, "User activation changed");
    Ok(Json(SuccessResponse::ok()))
}

fn send_invitation(state: &AppState, user: &User) {
    state.event_bus.publish(
        MinistryEvent::new(
            "user.invited",
            user.church_id,
            invitation_message(&user.name),
        )
        .for_user(user.id),
    );
}

fn parse_role(role: &str) -> Result<String, CoreError> {
    if !is_known_role(role) {
        return Err(CoreError::Validation(format!("Unknown role '{}'", role.trim())));
    }
    Ok(normalize_role(role))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn roles_are_normalized_or_rejected() {
        assert_eq!(parse_role("Teacher").unwrap(), "teacher");
        assert_eq!(parse_role("SuperAdmin").unwrap(), "super_admin");
        assert_matches!(parse_role("janitor"), Err(CoreError::Validation(_)));
    }

}
