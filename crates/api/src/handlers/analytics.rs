//! Handlers for `/analytics` dashboards.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{Duration, Utc};
use rkids_core::checkin::start_of_day;
use rkids_core::error::CoreError;
use rkids_core::reports::average_daily;
use rkids_core::search::MAX_LIST_LIMIT;
use rkids_core::types::DbId;
use rkids_db::models::attendance::AttendanceSummary;
use rkids_db::models::check_in::CheckInDetail;
use rkids_db::models::group::Group;
use rkids_db::repositories::check_in_repo::CheckInFilter;
use rkids_db::repositories::{AttendanceRepo, CheckInRepo, ChildRepo, GroupRepo};
use serde::{Deserialize, Serialize};

use super::find_accessible_child;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireAdmin, RequireStaff};
use crate::response::DataResponse;
use crate::state::AppState;

/// Window for group and child analytics.
const WINDOW_DAYS: i64 = 30;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAnalytics {
    pub total_children: i64,
    pub checked_in_today: i64,
    pub check_ins_today: i64,
    pub groups_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct TeacherParams {
    #[serde(alias = "teacherId")]
    pub teacher_id: Option<DbId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherAnalytics {
    pub teacher_id: DbId,
    pub groups_count: usize,
    pub groups: Vec<Group>,
    pub check_ins_today: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupAnalytics {
    pub group_name: String,
    pub group_id: DbId,
    pub total_present: i64,
    pub average_attendance: f64,
    pub attendance_records: Vec<AttendanceSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildAnalytics {
    pub child_id: DbId,
    pub attendance_count: usize,
    pub attendance_rate: f64,
    pub recent_check_ins: Vec<CheckInDetail>,
}

/// GET /api/analytics/admin
pub async fn admin_analytics(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> AppResult<Json<DataResponse<AdminAnalytics>>> {
    let today = start_of_day(Utc::now());
    let total_children = ChildRepo::count_active(&state.pool, admin.church_id, None).await?;
    let checked_in_today = CheckInRepo::count(
        &state.pool,
        admin.church_id,
        &CheckInFilter {
            since: Some(today),
            open_only: true,
            ..Default::default()
        },
    )
    .await?;
    let check_ins_today = CheckInRepo::count(
        &state.pool,
        admin.church_id,
        &CheckInFilter {
            since: Some(today),
            ..Default::default()
        },
    )
    .await?;
    let groups_count = GroupRepo::list(&state.pool, admin.church_id).await?.len();

    Ok(Json(DataResponse {
        data: AdminAnalytics {
            total_children,
            checked_in_today,
            check_ins_today,
            groups_count,
        },
    }))
}

/// GET /api/analytics/teacher
///
/// The caller's own figures; admins may ask for another teacher with
/// `?teacher_id=`.
pub async fn teacher_analytics(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Query(params): Query<TeacherParams>,
) -> AppResult<Json<DataResponse<TeacherAnalytics>>> {
    let teacher_id = match params.teacher_id {
        Some(id) if staff.is_admin() => id,
        _ => staff.user_id,
    };
    let groups = GroupRepo::list_for_teacher(&state.pool, staff.church_id, teacher_id).await?;
    let check_ins_today = CheckInRepo::count_for_teacher_since(
        &state.pool,
        staff.church_id,
        teacher_id,
        start_of_day(Utc::now()),
    )
    .await?;

    Ok(Json(DataResponse {
        data: TeacherAnalytics {
            teacher_id,
            groups_count: groups.len(),
            groups,
            check_ins_today,
        },
    }))
}

/// GET /api/analytics/group/{name}
pub async fn group_analytics(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(name): Path<String>,
) -> AppResult<Json<DataResponse<GroupAnalytics>>> {
    let group = GroupRepo::find_by_name(&state.pool, staff.church_id, &name)
        .await?
        .ok_or_else(|| CoreError::not_found("Group", &name))?;
    let since = (Utc::now() - Duration::days(WINDOW_DAYS)).date_naive();
    let records =
        AttendanceRepo::list_for_group_since(&state.pool, staff.church_id, group.id, since).await?;
    let total_present: i64 = records.iter().map(|r| i64::from(r.present_count)).sum();

    Ok(Json(DataResponse {
        data: GroupAnalytics {
            group_name: group.name,
            group_id: group.id,
            total_present,
            average_attendance: average_daily(total_present, WINDOW_DAYS),
            attendance_records: records,
        },
    }))
}

/// GET /api/analytics/child/{id}
///
/// `attendanceRate` is check-ins over the window as a percentage of its
/// days.
pub async fn child_analytics(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ChildAnalytics>>> {
    let child = find_accessible_child(&state, &auth, id).await?;
    let filter = CheckInFilter {
        child_id: Some(child.id),
        since: Some(Utc::now() - Duration::days(WINDOW_DAYS)),
        ..Default::default()
    };
    let recent_check_ins =
        CheckInRepo::list(&state.pool, auth.church_id, &filter, false, MAX_LIST_LIMIT).await?;
    let attendance_count = recent_check_ins.len();

    Ok(Json(DataResponse {
        data: ChildAnalytics {
            child_id: child.id,
            attendance_count,
            attendance_rate: child_attendance_rate(attendance_count),
            recent_check_ins,
        },
    }))
}

fn child_attendance_rate(check_ins: usize) -> f64 {
    average_daily(check_ins as i64 * 100, WINDOW_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_rate_is_share_of_window_days() {
        assert_eq!(child_attendance_rate(0), 0.0);
        assert_eq!(child_attendance_rate(3), 10.0);
        assert_eq!(child_attendance_rate(4), 13.33);
        assert_eq!(child_attendance_rate(30), 100.0);
    }
}
