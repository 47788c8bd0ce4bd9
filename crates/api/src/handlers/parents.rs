//! Handlers for the `/parents` resource (primary guardians).
//!
//! Staff may read; creating and deleting require [`RequireAdmin`].

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rkids_core::codes::primary_parent_code;
use rkids_core::error::CoreError;
use rkids_core::types::{DbId, Timestamp};
use rkids_core::validation::{normalize_email, normalize_phone};
use rkids_db::models::guardian::{CreateGuardian, ParentSummary, RELATIONSHIP_PRIMARY};
use rkids_db::repositories::GuardianRepo;
use serde::{Deserialize, Serialize};

use super::non_blank;
use crate::audit::{self, AuditEntry, ClientInfo, ACTION_CREATE_PARENT, ACTION_DELETE_PARENT};
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireAdmin, RequireStaff};
use crate::response::{DataResponse, SuccessResponse};
use crate::state::AppState;

/// Request body for `POST /parents`.
#[derive(Debug, Deserialize)]
pub struct CreateParentRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// A primary guardian as shown in the parents directory.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentView {
    pub id: DbId,
    pub parent_code: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: &'static str,
    pub active_until: Option<Timestamp>,
    pub children_count: i64,
}

impl From<ParentSummary> for ParentView {
    fn from(p: ParentSummary) -> Self {
        Self {
            id: p.id,
            parent_code: p.parent_code,
            name: p.name,
            email: p.email.unwrap_or_default(),
            phone: p.phone,
            status: parent_status(p.active_until),
            active_until: p.active_until,
            children_count: p.children_count,
        }
    }
}

/// Primaries with an end date are shown as inactive.
fn parent_status(active_until: Option<Timestamp>) -> &'static str {
    if active_until.is_some() {
        "inactive"
    } else {
        "active"
    }
}

/// GET /api/parents
pub async fn list_parents(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
) -> AppResult<Json<DataResponse<Vec<ParentView>>>> {
    let parents = GuardianRepo::list_parents(&state.pool, user.church_id).await?;
    Ok(Json(DataResponse {
        data: parents.into_iter().map(ParentView::from).collect(),
    }))
}

/// POST /api/parents
///
/// Register a primary guardian with the next free `RS###` code.
pub async fn create_parent(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    client: ClientInfo,
    Json(input): Json<CreateParentRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<ParentView>>)> {
    let name = non_blank(input.name).ok_or_else(|| AppError::BadRequest("Name is required".into()))?;
    let email = non_blank(input.email)
        .as_deref()
        .map(normalize_email)
        .transpose()?;
    let phone = non_blank(input.phone)
        .as_deref()
        .map(normalize_phone)
        .transpose()?;

    let highest = GuardianRepo::max_primary_code_number(&state.pool, admin.church_id).await?;
    let dto = CreateGuardian {
        parent_code: primary_parent_code(highest),
        name,
        email,
        phone,
        relationship: RELATIONSHIP_PRIMARY.to_string(),
        is_primary: true,
        photo_url: None,
        active_until: None,
    };
    let guardian = GuardianRepo::create(&state.pool, admin.church_id, &dto).await?;

    audit::record(
        &state.pool,
        AuditEntry {
            church_id: admin.church_id,
            user_id: Some(admin.user_id),
            action: ACTION_CREATE_PARENT,
            entity_type: "guardian",
            entity_id: Some(guardian.id.to_string()),
            details: Some(serde_json::json!({ "parentCode": guardian.parent_code })),
            client: &client,
        },
    )
    .await;

    tracing::info!(guardian_id = %guardian.id, parent_code = %guardian.parent_code, "Parent created");

    let view = ParentView {
        id: guardian.id,
        parent_code: guardian.parent_code,
        name: guardian.name,
        email: guardian.email.unwrap_or_default(),
        phone: guardian.phone,
        status: parent_status(guardian.active_until),
        active_until: guardian.active_until,
        children_count: 0,
    };
    Ok((StatusCode::CREATED, Json(DataResponse { data: view })))
}

/// GET /api/parents/{id}
pub async fn get_parent(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ParentView>>> {
    let parent = GuardianRepo::find_parent(&state.pool, user.church_id, id)
        .await?
        .ok_or_else(|| CoreError::not_found("Parent", id))?;
    Ok(Json(DataResponse {
        data: ParentView::from(parent),
    }))
}

/// DELETE /api/parents/{id}
pub async fn delete_parent(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    client: ClientInfo,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<SuccessResponse>>> {
    if !GuardianRepo::delete(&state.pool, admin.church_id, id).await? {
        return Err(CoreError::not_found("Parent", id).into());
    }

    audit::record(
        &state.pool,
        AuditEntry {
            church_id: admin.church_id,
            user_id: Some(admin.user_id),
            action: ACTION_DELETE_PARENT,
            entity_type: "guardian",
            entity_id: Some(id.to_string()),
            details: None,
            client: &client,
        },
    )
    .await;

    Ok(Json(SuccessResponse::ok()))
}
