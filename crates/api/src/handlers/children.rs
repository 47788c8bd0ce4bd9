//! Handlers for the `/children` resource.
//!
//! Parents only ever see and register their own children; staff see the
//! whole church. Updates, deletion and approval require [`RequireAdmin`].

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use rkids_core::codes::registration_id;
use rkids_core::error::CoreError;
use rkids_core::groups::{age_on, select_group_for_age, AgeBand};
use rkids_core::notification::{child_approved_message, child_rejected_message};
use rkids_core::types::DbId;
use rkids_db::models::child::{
    ChildDetail, CreateChild, UpdateChild, CHILD_STATUS_ACTIVE, CHILD_STATUS_PENDING,
    CHILD_STATUS_REJECTED,
};
use rkids_db::models::guardian::LinkedGuardian;
use rkids_db::repositories::child_repo::ChildFilter;
use rkids_db::repositories::{ChildRepo, GroupRepo, GuardianRepo, UserRepo};
use rkids_events::MinistryEvent;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{find_child, non_blank};
use crate::audit::{
    self, AuditEntry, ClientInfo, ACTION_APPROVE_CHILD, ACTION_CREATE_CHILD,
    ACTION_DELETE_CHILD, ACTION_REJECT_CHILD, ACTION_UPDATE_CHILD,
};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::{DataResponse, SuccessResponse};
use crate::state::AppState;

/// Statuses an admin may set directly.
const EDITABLE_STATUSES: [&str; 4] = [
    CHILD_STATUS_PENDING,
    CHILD_STATUS_ACTIVE,
    CHILD_STATUS_REJECTED,
    "inactive",
];

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ListChildrenParams {
    pub parent_id: Option<DbId>,
    pub group: Option<String>,
    pub status: Option<String>,
}

/// Request body for `POST /children`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChildRequest {
    pub name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub parent_id: Option<DbId>,
    pub gender: Option<String>,
    pub group_id: Option<DbId>,
    pub status: Option<String>,
}

/// Request body for `POST /children/{id}/reject`.
#[derive(Debug, Default, Deserialize)]
pub struct RejectRequest {
    pub reason: Option<String>,
}

/// A child with its computed age.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildView {
    #[serde(flatten)]
    pub child: ChildDetail,
    pub age: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guardians: Option<Vec<LinkedGuardian>>,
}

impl ChildView {
    pub fn new(child: ChildDetail, today: NaiveDate) -> Self {
        let age = age_on(child.date_of_birth, today).max(0);
        Self {
            child,
            age,
            guardians: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/children?parent_id=&group=&status=
pub async fn list_children(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ListChildrenParams>,
) -> AppResult<Json<DataResponse<Vec<ChildView>>>> {
    let parent_id = if auth.is_staff() {
        params.parent_id
    } else {
        match caller_guardian_id(&state, &auth).await? {
            Some(id) => Some(id),
            None => return Ok(Json(DataResponse { data: Vec::new() })),
        }
    };

    let group = non_blank(params.group);
    let status = non_blank(params.status);
    let filter = ChildFilter {
        parent_id,
        group_name: group.as_deref(),
        status: status.as_deref(),
    };
    let children = ChildRepo::list(&state.pool, auth.church_id, &filter).await?;

    let today = Utc::now().date_naive();
    Ok(Json(DataResponse {
        data: children
            .into_iter()
            .map(|c| ChildView::new(c, today))
            .collect(),
    }))
}

/// POST /api/children
///
/// Register a child. The registration id continues the family's numbering
/// and a group is picked by age when none is given. Registrations by
/// parents start `pending` until an admin approves them.
pub async fn create_child(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Json(input): Json<CreateChildRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<ChildView>>)> {
    let own_guardian = if auth.is_staff() {
        None
    } else {
        Some(
            caller_guardian_id(&state, &auth)
                .await?
                .ok_or_else(|| AppError::forbidden("No guardian record is linked to this account"))?,
        )
    };

    let name = non_blank(input.name);
    let parent_id = input.parent_id.or(own_guardian);
    let (Some(name), Some(parent_id), Some(date_of_birth)) =
        (name, parent_id, input.date_of_birth)
    else {
        return Err(AppError::BadRequest(
            "name, parentId and dateOfBirth are required".into(),
        ));
    };
    if own_guardian.is_some_and(|own| own != parent_id) {
        return Err(AppError::forbidden(
            "You can only register your own children",
        ));
    }

    let today = Utc::now().date_naive();
    if date_of_birth > today {
        return Err(CoreError::Validation("dateOfBirth cannot be in the future".into()).into());
    }

    let parent = GuardianRepo::find_by_id(&state.pool, auth.church_id, parent_id)
        .await?
        .ok_or_else(|| CoreError::Validation(format!("Parent {parent_id} does not exist")))?;

    let group_id = match input.group_id {
        Some(id) => Some(id),
        None => {
            let bands: Vec<AgeBand<DbId>> = GroupRepo::list(&state.pool, auth.church_id)
                .await?
                .into_iter()
                .map(|g| AgeBand {
                    id: g.id,
                    min_age: g.age_range_min,
                    max_age: g.age_range_max,
                })
                .collect();
            select_group_for_age(&bands, age_on(date_of_birth, today))
        }
    };

    let status = if auth.is_staff() {
        parse_status(input.status.as_deref().unwrap_or(CHILD_STATUS_ACTIVE))?
    } else {
        CHILD_STATUS_PENDING.to_string()
    };

    let next_number = ChildRepo::max_child_number(&state.pool, parent.id).await? + 1;
    let dto = CreateChild {
        parent_id: parent.id,
        group_id,
        registration_id: registration_id(Some(&parent.parent_code), next_number),
        name,
        date_of_birth,
        gender: non_blank(input.gender),
        status,
        submitted_by: Some(auth.user_id),
    };
    let child = ChildRepo::create(&state.pool, auth.church_id, &dto).await?;

    audit::record(
        &state.pool,
        AuditEntry {
            church_id: auth.church_id,
            user_id: Some(auth.user_id),
            action: ACTION_CREATE_CHILD,
            entity_type: "child",
            entity_id: Some(child.id.to_string()),
            details: Some(json!({ "registrationId": child.registration_id })),
            client: &client,
        },
    )
    .await;

    tracing::info!(
        child_id = %child.id,
        registration_id = %child.registration_id,
        group_id = ?child.group_id,
        "Child registered"
    );

    let detail = ChildRepo::find_detail(&state.pool, auth.church_id, child.id)
        .await?
        .ok_or_else(|| CoreError::not_found("Child", child.id))?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: ChildView::new(detail, today),
        }),
    ))
}

/// GET /api/children/{id}
///
/// Includes the guardians authorized to collect the child.
pub async fn get_child(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ChildView>>> {
    let detail = ChildRepo::find_detail(&state.pool, auth.church_id, id)
        .await?
        .ok_or_else(|| CoreError::not_found("Child", id))?;
    if !auth.is_staff() && caller_guardian_id(&state, &auth).await? != Some(detail.parent_id) {
        return Err(CoreError::not_found("Child", id).into());
    }

    let guardians = GuardianRepo::list_for_child(&state.pool, auth.church_id, id).await?;
    let mut view = ChildView::new(detail, Utc::now().date_naive());
    view.guardians = Some(guardians);
    Ok(Json(DataResponse { data: view }))
}

/// PUT /api/children/{id}
pub async fn update_child(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    client: ClientInfo,
    Path(id): Path<DbId>,
    Json(mut input): Json<UpdateChild>,
) -> AppResult<Json<DataResponse<ChildView>>> {
    input.name = non_blank(input.name);
    input.gender = non_blank(input.gender);
    input.status = input.status.as_deref().map(parse_status).transpose()?;
    if !input.has_changes() {
        return Err(AppError::BadRequest("No fields to update".into()));
    }

    ChildRepo::update(&state.pool, admin.church_id, id, &input)
        .await?
        .ok_or_else(|| CoreError::not_found("Child", id))?;

    audit::record(
        &state.pool,
        AuditEntry {
            church_id: admin.church_id,
            user_id: Some(admin.user_id),
            action: ACTION_UPDATE_CHILD,
            entity_type: "child",
            entity_id: Some(id.to_string()),
            details: None,
            client: &client,
        },
    )
    .await;

    let detail = ChildRepo::find_detail(&state.pool, admin.church_id, id)
        .await?
        .ok_or_else(|| CoreError::not_found("Child", id))?;
    Ok(Json(DataResponse {
        data: ChildView::new(detail, Utc::now().date_naive()),
    }))
}

/// DELETE /api/children/{id}
pub async fn delete_child(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    client: ClientInfo,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<SuccessResponse>>> {
    if !ChildRepo::delete(&state.pool, admin.church_id, id).await? {
        return Err(CoreError::not_found("Child", id).into());
    }

    audit::record(
        &state.pool,
        AuditEntry {
            church_id: admin.church_id,
            user_id: Some(admin.user_id),
            action: ACTION_DELETE_CHILD,
            entity_type: "child",
            entity_id: Some(id.to_string()),
            details: None,
            client: &client,
        },
    )
    .await;

    Ok(Json(SuccessResponse::ok()))
}

/// POST /api/children/{id}/approve
pub async fn approve_child(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    client: ClientInfo,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ChildView>>> {
    let child = find_child(&state, admin.church_id, id).await?;
    ChildRepo::set_status(&state.pool, admin.church_id, id, CHILD_STATUS_ACTIVE).await?;

    state.event_bus.publish(
        MinistryEvent::new(
            "child.approved",
            admin.church_id,
            child_approved_message(Some(&child.name)),
        )
        .for_child(child.id)
        .for_guardian(Some(child.parent_id)),
    );

    review_response(&state, &admin, &client, id, ACTION_APPROVE_CHILD, None).await
}

/// POST /api/children/{id}/reject
pub async fn reject_child(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    client: ClientInfo,
    Path(id): Path<DbId>,
    input: Option<Json<RejectRequest>>,
) -> AppResult<Json<DataResponse<ChildView>>> {
    let reason = input.and_then(|Json(r)| non_blank(r.reason));
    let child = find_child(&state, admin.church_id, id).await?;
    ChildRepo::set_status(&state.pool, admin.church_id, id, CHILD_STATUS_REJECTED).await?;

    state.event_bus.publish(
        MinistryEvent::new(
            "child.rejected",
            admin.church_id,
            child_rejected_message(Some(&child.name), reason.as_deref()),
        )
        .for_child(child.id)
        .for_guardian(Some(child.parent_id)),
    );

    review_response(&state, &admin, &client, id, ACTION_REJECT_CHILD, reason).await
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The guardian record behind a parent account: the explicitly linked
/// guardian, else the guardian registered with the account's email.
pub(crate) async fn caller_guardian_id(
    state: &AppState,
    auth: &AuthUser,
) -> AppResult<Option<DbId>> {
    let Some(user) = UserRepo::find_by_id(&state.pool, auth.church_id, auth.user_id).await? else {
        return Ok(None);
    };
    if user.linked_guardian_id.is_some() {
        return Ok(user.linked_guardian_id);
    }
    Ok(GuardianRepo::find_by_email(&state.pool, auth.church_id, &user.email)
        .await?
        .map(|g| g.id))
}

async fn review_response(
    state: &AppState,
    admin: &AuthUser,
    client: &ClientInfo,
    id: DbId,
    action: &'static str,
    reason: Option<String>,
) -> AppResult<Json<DataResponse<ChildView>>> {
    audit::record(
        &state.pool,
        AuditEntry {
            church_id: admin.church_id,
            user_id: Some(admin.user_id),
            action,
            entity_type: "child",
            entity_id: Some(id.to_string()),
            details: reason.map(|r| json!({ "reason": r })),
            client,
        },
    )
    .await;

    let detail = ChildRepo::find_detail(&state.pool, admin.church_id, id)
        .await?
        .ok_or_else(|| CoreError::not_found("Child", id))?;
    tracing::info!(child_id = %id, status = %detail.status, "Child registration reviewed");
    Ok(Json(DataResponse {
        data: ChildView::new(detail, Utc::now().date_naive()),
    }))
}

fn parse_status(status: &str) -> Result<String, CoreError> {
    let status = status.trim().to_lowercase();
    if EDITABLE_STATUSES.contains(&status.as_str()) {
        Ok(status)
    } else {
        Err(CoreError::Validation(format!("Unknown child status '{status}'")))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use uuid::Uuid;

    use super::*;

    fn detail(dob: NaiveDate) -> ChildDetail {
        ChildDetail {
            id: Uuid::new_v4(),
            registration_id: "RS001/01".into(),
            name: "Grace".into(),
            date_of_birth: dob,
            group_id: None,
            group_name: Some("Little Lambs".into()),
            parent_id: Uuid::new_v4(),
            status: "active".into(),
            gender: Some("female".into()),
            submitted_by: None,
            submitted_at: Utc::now(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn view_computes_age_on_the_given_day() {
        let view = ChildView::new(detail(date(2018, 6, 15)), date(2026, 6, 14));
        assert_eq!(view.age, 7);
        let view = ChildView::new(detail(date(2018, 6, 15)), date(2026, 6, 15));
        assert_eq!(view.age, 8);
    }

    #[test]
    fn view_serializes_flat_with_group_name() {
        let view = ChildView::new(detail(date(2020, 1, 1)), date(2026, 1, 1));
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["registrationId"], "RS001/01");
        assert_eq!(value["group"], "Little Lambs");
        assert_eq!(value["age"], 6);
        assert!(value.get("guardians").is_none());
    }

    #[test]
    fn statuses_are_validated() {
        assert_eq!(parse_status(" Active ").unwrap(), "active");
        assert_eq!(parse_status("inactive").unwrap(), "inactive");
        assert_matches!(parse_status("archived"), Err(CoreError::Validation(_)));
    }
}
