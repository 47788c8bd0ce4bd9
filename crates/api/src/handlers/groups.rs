//! Handlers for the `/groups` resource (age-banded classes).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rkids_core::error::CoreError;
use rkids_core::groups::validate_age_range;
use rkids_core::types::DbId;
use rkids_db::models::attendance::AttendanceSummary;
use rkids_db::models::group::{CreateGroup, Group, UpdateGroup};
use rkids_db::repositories::{AttendanceRepo, ChildRepo, GroupRepo};
use serde::{Deserialize, Serialize};

use super::non_blank;
use crate::audit::{self, AuditEntry, ClientInfo, ACTION_CREATE_GROUP, ACTION_DELETE_GROUP};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::{DataResponse, SuccessResponse};
use crate::state::AppState;

/// Number of attendance summaries included in group stats.
const RECENT_ATTENDANCE_LIMIT: i64 = 7;

/// Request body for `POST /groups`. Fields are optional so a missing one
/// is reported as 400 rather than a deserialization rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub name: Option<String>,
    pub age_range_min: Option<i32>,
    pub age_range_max: Option<i32>,
    pub room: Option<String>,
    pub schedule: Option<String>,
    pub teacher_id: Option<DbId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStats {
    pub group_id: DbId,
    pub group_name: String,
    pub children_count: i64,
    pub recent_attendance: Vec<AttendanceSummary>,
}

/// GET /api/groups
pub async fn list_groups(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<Vec<Group>>>> {
    let groups = GroupRepo::list(&state.pool, auth.church_id).await?;
    Ok(Json(DataResponse { data: groups }))
}

/// POST /api/groups
pub async fn create_group(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    client: ClientInfo,
    Json(input): Json<CreateGroupRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Group>>)> {
    let (Some(name), Some(age_range_min), Some(age_range_max)) =
        (non_blank(input.name), input.age_range_min, input.age_range_max)
    else {
        return Err(AppError::BadRequest(
            "name, ageRangeMin, and ageRangeMax are required".into(),
        ));
    };
    validate_age_range(age_range_min, age_range_max).map_err(CoreError::Validation)?;

    let dto = CreateGroup {
        name,
        age_range_min,
        age_range_max,
        room: non_blank(input.room),
        schedule: non_blank(input.schedule),
        teacher_id: input.teacher_id,
    };
    let group = GroupRepo::create(&state.pool, admin.church_id, &dto).await?;

    audit::record(
        &state.pool,
        AuditEntry {
            church_id: admin.church_id,
            user_id: Some(admin.user_id),
            action: ACTION_CREATE_GROUP,
            entity_type: "group",
            entity_id: Some(group.id.to_string()),
            details: Some(serde_json::json!({ "name": group.name })),
            client: &client,
        },
    )
    .await;

    tracing::info!(group_id = %group.id, name = %group.name, "Group created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: group })))
}

/// GET /api/groups/{id}
pub async fn get_group(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Group>>> {
    let group = find_group(&state, auth.church_id, id).await?;
    Ok(Json(DataResponse { data: group }))
}

/// PUT /api/groups/{id}
///
/// When only one bound of the age range changes it is checked against the
/// stored other bound.
pub async fn update_group(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(mut input): Json<UpdateGroup>,
) -> AppResult<Json<DataResponse<Group>>> {
    if input.name.is_some() {
        input.name = non_blank(input.name);
        if input.name.is_none() {
            return Err(CoreError::Validation("name cannot be blank".into()).into());
        }
    }
    if !input.has_changes() {
        return Err(AppError::BadRequest("No fields to update".into()));
    }

    if input.age_range_min.is_some() || input.age_range_max.is_some() {
        let current = find_group(&state, admin.church_id, id).await?;
        validate_age_range(
            input.age_range_min.unwrap_or(current.age_range_min),
            input.age_range_max.unwrap_or(current.age_range_max),
        )
        .map_err(CoreError::Validation)?;
    }

    let group = GroupRepo::update(&state.pool, admin.church_id, id, &input)
        .await?
        .ok_or_else(|| CoreError::not_found("Group", id))?;
    Ok(Json(DataResponse { data: group }))
}

/// DELETE /api/groups/{id}
pub async fn delete_group(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    client: ClientInfo,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<SuccessResponse>>> {
    if !GroupRepo::delete(&state.pool, admin.church_id, id).await? {
        return Err(CoreError::not_found("Group", id).into());
    }

    audit::record(
        &state.pool,
        AuditEntry {
            church_id: admin.church_id,
            user_id: Some(admin.user_id),
            action: ACTION_DELETE_GROUP,
            entity_type: "group",
            entity_id: Some(id.to_string()),
            details: None,
            client: &client,
        },
    )
    .await;

    Ok(Json(SuccessResponse::ok()))
}

/// GET /api/groups/{id}/stats
pub async fn group_stats(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<GroupStats>>> {
    let group = find_group(&state, auth.church_id, id).await?;
    let children_count = ChildRepo::count_active(&state.pool, auth.church_id, Some(id)).await?;
    let recent_attendance = AttendanceRepo::list(
        &state.pool,
        auth.church_id,
        None,
        Some(id),
        RECENT_ATTENDANCE_LIMIT,
    )
    .await?;

    Ok(Json(DataResponse {
        data: GroupStats {
            group_id: group.id,
            group_name: group.name,
            children_count,
            recent_attendance,
        },
    }))
}

async fn find_group(state: &AppState, church_id: DbId, id: DbId) -> AppResult<Group> {
    GroupRepo::find_by_id(&state.pool, church_id, id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Group", id)))
}
