//! Handlers for `/attendance`: per-group daily summaries and the
//! check-in records behind them.

use axum::extract::{Query, State};
use axum::Json;
use chrono::{NaiveDate, Utc};
use rkids_core::error::CoreError;
use rkids_core::types::DbId;
use rkids_db::models::attendance::{AttendanceSummary, SubmitAttendance};
use rkids_db::models::check_in::CheckInDetail;
use rkids_db::repositories::check_in_repo::CheckInFilter;
use rkids_db::repositories::{AttendanceRepo, CheckInRepo, GroupRepo};
use serde::{Deserialize, Serialize};

use super::non_blank;
use crate::audit::{self, AuditEntry, ClientInfo, ACTION_SUBMIT_ATTENDANCE};
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireStaff;
use crate::response::DataResponse;
use crate::state::AppState;

/// Cap on check-in records returned by the attendance listing.
const RECORD_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct AttendanceParams {
    #[serde(alias = "childId")]
    pub child_id: Option<DbId>,
    /// Group id or group name.
    pub group: Option<String>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAttendanceRequest {
    #[serde(alias = "group_id")]
    pub group_id: Option<DbId>,
    pub date: Option<NaiveDate>,
    #[serde(default, alias = "present_count")]
    pub present_count: i32,
    #[serde(default, alias = "absent_count")]
    pub absent_count: i32,
    #[serde(default, alias = "male_count")]
    pub male_count: i32,
    #[serde(default, alias = "female_count")]
    pub female_count: i32,
}

/// Summaries when a date is given, check-in records otherwise.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AttendanceList {
    Summaries(Vec<AttendanceSummary>),
    Records(Vec<CheckInDetail>),
}

/// GET /api/attendance?child_id=&group=&date=
pub async fn list_attendance(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Query(params): Query<AttendanceParams>,
) -> AppResult<Json<DataResponse<AttendanceList>>> {
    let group_id = match non_blank(params.group) {
        Some(group) => match resolve_group(&state, staff.church_id, &group).await? {
            Some(id) => Some(id),
            None => {
                let empty = if params.date.is_some() {
                    AttendanceList::Summaries(Vec::new())
                } else {
                    AttendanceList::Records(Vec::new())
                };
                return Ok(Json(DataResponse { data: empty }));
            }
        },
        None => None,
    };

    if let Some(date) = params.date {
        let summaries =
            AttendanceRepo::list(&state.pool, staff.church_id, Some(date), group_id, RECORD_LIMIT)
                .await?;
        return Ok(Json(DataResponse {
            data: AttendanceList::Summaries(summaries),
        }));
    }

    let group_ids: Vec<DbId> = group_id.into_iter().collect();
    let filter = CheckInFilter {
        child_id: params.child_id,
        group_ids: group_id.map(|_| group_ids.as_slice()),
        ..Default::default()
    };
    let records =
        CheckInRepo::list(&state.pool, staff.church_id, &filter, false, RECORD_LIMIT).await?;
    Ok(Json(DataResponse {
        data: AttendanceList::Records(records),
    }))
}

/// POST /api/attendance/submit
///
/// Record a group's head count for a day, replacing any earlier submission
/// for the same group and date.
pub async fn submit_attendance(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    client: ClientInfo,
    Json(input): Json<SubmitAttendanceRequest>,
) -> AppResult<Json<DataResponse<AttendanceSummary>>> {
    let group_id = input
        .group_id
        .ok_or_else(|| AppError::BadRequest("groupId is required".into()))?;
    let counts = [
        input.present_count,
        input.absent_count,
        input.male_count,
        input.female_count,
    ];
    if counts.iter().any(|c| *c < 0) {
        return Err(CoreError::Validation("Counts cannot be negative".into()).into());
    }
    GroupRepo::find_by_id(&state.pool, staff.church_id, group_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Group", group_id))?;

    let dto = SubmitAttendance {
        group_id,
        date: input.date.unwrap_or_else(|| Utc::now().date_naive()),
        present_count: input.present_count,
        absent_count: input.absent_count,
        male_count: input.male_count,
        female_count: input.female_count,
    };
    let summary = AttendanceRepo::upsert(&state.pool, staff.church_id, staff.user_id, &dto).await?;

    audit::record(
        &state.pool,
        AuditEntry {
            church_id: staff.church_id,
            user_id: Some(staff.user_id),
            action: ACTION_SUBMIT_ATTENDANCE,
            entity_type: "attendance_summary",
            entity_id: Some(summary.id.to_string()),
            details: Some(serde_json::json!({
                "groupId": group_id,
                "date": summary.date,
                "presentCount": summary.present_count,
            })),
            client: &client,
        },
    )
    .await;

    Ok(Json(DataResponse { data: summary }))
}

/// Resolve a `group` filter given as an id or a name.
pub(crate) async fn resolve_group(
    state: &AppState,
    church_id: DbId,
    group: &str,
) -> AppResult<Option<DbId>> {
    if let Ok(id) = group.parse::<DbId>() {
        return Ok(Some(id));
    }
    Ok(GroupRepo::find_by_name(&state.pool, church_id, group)
        .await?
        .map(|g| g.id))
}
