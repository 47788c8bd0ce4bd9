//! Handlers for the `/guardians` resource (secondary guardians and the
//! guardians authorized for a child).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, Utc};
use rkids_core::codes::secondary_parent_code;
use rkids_core::error::CoreError;
use rkids_core::types::{DbId, Timestamp};
use rkids_core::validation::{normalize_email, normalize_phone};
use rkids_db::models::guardian::{CreateGuardian, Guardian, LinkedGuardian};
use rkids_db::repositories::GuardianRepo;
use serde::{Deserialize, Serialize};

use super::{find_child, non_blank};
use crate::audit::{self, AuditEntry, ClientInfo, ACTION_CREATE_GUARDIAN, ACTION_RENEW_GUARDIAN};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireStaff;
use crate::query::ChildIdParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /guardians`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGuardianRequest {
    #[serde(alias = "child_id")]
    pub child_id: Option<DbId>,
    pub name: Option<String>,
    pub relationship: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(alias = "photo_url")]
    pub photo_url: Option<String>,
    #[serde(alias = "active_until")]
    pub active_until: Option<Timestamp>,
    #[serde(alias = "expires_at")]
    pub expires_at: Option<Timestamp>,
}

/// Request body for `POST /guardians/{id}/renew`.
#[derive(Debug, Default, Deserialize)]
pub struct RenewRequest {
    pub days: Option<i64>,
}

/// Either every guardian in the church or those authorized for one child.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum GuardianList {
    Church(Vec<Guardian>),
    Child(Vec<LinkedGuardian>),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedGuardian {
    #[serde(flatten)]
    pub guardian: Guardian,
    pub child_id: DbId,
    pub expires_at: Option<Timestamp>,
}

/// GET /api/guardians?child_id=
pub async fn list_guardians(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Query(params): Query<ChildIdParams>,
) -> AppResult<Json<DataResponse<GuardianList>>> {
    let data = match params.child_id {
        Some(child_id) => GuardianList::Child(
            GuardianRepo::list_for_child(&state.pool, user.church_id, child_id).await?,
        ),
        None => GuardianList::Church(GuardianRepo::list(&state.pool, user.church_id).await?),
    };
    Ok(Json(DataResponse { data }))
}

/// POST /api/guardians
///
/// Create a secondary guardian and authorize them for a child. An email or
/// phone already registered in the church is rejected with 409.
pub async fn create_guardian(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Json(input): Json<CreateGuardianRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<CreatedGuardian>>)> {
    let (Some(child_id), Some(name), Some(relationship)) = (
        input.child_id,
        non_blank(input.name),
        non_blank(input.relationship),
    ) else {
        return Err(AppError::BadRequest(
            "child_id, name, and relationship are required".into(),
        ));
    };

    let child = find_child(&state, auth.church_id, child_id).await?;
    // Parents may only add guardians for their own children.
    if !auth.is_staff() && !owns_child(&state, &auth, child.parent_id).await? {
        return Err(AppError::forbidden(
            "You can only add guardians for your own children",
        ));
    }

    let email = non_blank(input.email)
        .as_deref()
        .map(normalize_email)
        .transpose()?;
    let phone = non_blank(input.phone)
        .as_deref()
        .map(normalize_phone)
        .transpose()?;

    if let Some(existing) = GuardianRepo::find_by_contact(
        &state.pool,
        auth.church_id,
        email.as_deref(),
        phone.as_deref(),
    )
    .await?
    {
        let field = if email.is_some() && existing.email.as_deref() == email.as_deref() {
            "email"
        } else {
            "phone"
        };
        return Err(CoreError::Conflict(format!(
            "A guardian with this {field} already exists"
        ))
        .into());
    }

    let dto = CreateGuardian {
        parent_code: secondary_parent_code(),
        name,
        email,
        phone,
        relationship: relationship.clone(),
        is_primary: false,
        photo_url: non_blank(input.photo_url),
        active_until: input.active_until,
    };
    let guardian = GuardianRepo::create(&state.pool, auth.church_id, &dto).await?;
    let link = GuardianRepo::link_child(
        &state.pool,
        child.id,
        guardian.id,
        &relationship,
        input.expires_at,
    )
    .await?;

    audit::record(
        &state.pool,
        AuditEntry {
            church_id: auth.church_id,
            user_id: Some(auth.user_id),
            action: ACTION_CREATE_GUARDIAN,
            entity_type: "guardian",
            entity_id: Some(guardian.id.to_string()),
            details: Some(serde_json::json!({ "childId": child.id })),
            client: &client,
        },
    )
    .await;

    tracing::info!(guardian_id = %guardian.id, child_id = %child.id, "Secondary guardian created");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: CreatedGuardian {
                guardian,
                child_id: child.id,
                expires_at: link.expires_at,
            },
        }),
    ))
}

/// GET /api/guardians/{id}
pub async fn get_guardian(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Guardian>>> {
    let guardian = GuardianRepo::find_by_id(&state.pool, user.church_id, id)
        .await?
        .ok_or_else(|| CoreError::not_found("Guardian", id))?;
    Ok(Json(DataResponse { data: guardian }))
}

/// POST /api/guardians/{id}/renew
///
/// Extend the guardian's `active_until` by `days` from now (default from
/// configuration, 365).
pub async fn renew_guardian(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    client: ClientInfo,
    Path(id): Path<DbId>,
    input: Option<Json<RenewRequest>>,
) -> AppResult<Json<DataResponse<Guardian>>> {
    let days = input
        .and_then(|Json(r)| r.days)
        .unwrap_or(state.config.codes.guardian_renewal_days);
    if days <= 0 {
        return Err(CoreError::Validation("days must be positive".into()).into());
    }

    let active_until = Utc::now() + Duration::days(days);
    let guardian = GuardianRepo::renew(&state.pool, user.church_id, id, active_until)
        .await?
        .ok_or_else(|| CoreError::not_found("Guardian", id))?;

    audit::record(
        &state.pool,
        AuditEntry {
            church_id: user.church_id,
            user_id: Some(user.user_id),
            action: ACTION_RENEW_GUARDIAN,
            entity_type: "guardian",
            entity_id: Some(id.to_string()),
            details: Some(serde_json::json!({ "days": days })),
            client: &client,
        },
    )
    .await;

    Ok(Json(DataResponse { data: guardian }))
}

/// Whether the parent making the request is the given primary guardian.
pub(crate) async fn owns_child(
    state: &AppState,
    auth: &AuthUser,
    parent_id: DbId,
) -> AppResult<bool> {
    Ok(super::children::caller_guardian_id(state, auth).await? == Some(parent_id))
}
