//! Handlers for `/teachers`: a teacher's view of their assigned groups.
//!
//! Every listing is scoped to the groups whose `teacher_id` is the caller.

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use rkids_core::checkin::start_of_day;
use rkids_core::search::MAX_LIST_LIMIT;
use rkids_core::types::DbId;
use rkids_db::models::check_in::CheckInDetail;
use rkids_db::models::child::ChildDetail;
use rkids_db::models::group::Group;
use rkids_db::repositories::check_in_repo::CheckInFilter;
use rkids_db::repositories::{CheckInRepo, ChildRepo, GroupRepo};
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireStaff;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TeacherChildrenParams {
    #[serde(alias = "groupId")]
    pub group_id: Option<DbId>,
}

/// GET /api/teachers/groups
pub async fn teacher_groups(
    State(state): State<AppState>,
    RequireStaff(teacher): RequireStaff,
) -> AppResult<Json<DataResponse<Vec<Group>>>> {
    let groups = assigned_groups(&state, &teacher).await?;
    Ok(Json(DataResponse { data: groups }))
}

/// GET /api/teachers/children?group_id=
///
/// A `group_id` outside the caller's groups yields an empty list.
pub async fn teacher_children(
    State(state): State<AppState>,
    RequireStaff(teacher): RequireStaff,
    Query(params): Query<TeacherChildrenParams>,
) -> AppResult<Json<DataResponse<Vec<ChildDetail>>>> {
    let group_ids = scoped_group_ids(assigned_groups(&state, &teacher).await?, params.group_id);
    if group_ids.is_empty() {
        return Ok(Json(DataResponse { data: Vec::new() }));
    }
    let children = ChildRepo::list_for_groups(&state.pool, teacher.church_id, &group_ids).await?;
    Ok(Json(DataResponse { data: children }))
}

/// GET /api/teachers/checkins
///
/// Today's check-ins of children in the caller's groups, newest first.
pub async fn teacher_checkins(
    State(state): State<AppState>,
    RequireStaff(teacher): RequireStaff,
) -> AppResult<Json<DataResponse<Vec<CheckInDetail>>>> {
    let group_ids = scoped_group_ids(assigned_groups(&state, &teacher).await?, None);
    if group_ids.is_empty() {
        return Ok(Json(DataResponse { data: Vec::new() }));
    }
    let filter = CheckInFilter {
        group_ids: Some(group_ids.as_slice()),
        since: Some(start_of_day(Utc::now())),
        ..Default::default()
    };
    let records =
        CheckInRepo::list(&state.pool, teacher.church_id, &filter, false, MAX_LIST_LIMIT).await?;
    Ok(Json(DataResponse { data: records }))
}

async fn assigned_groups(state: &AppState, teacher: &AuthUser) -> AppResult<Vec<Group>> {
    Ok(GroupRepo::list_for_teacher(&state.pool, teacher.church_id, teacher.user_id).await?)
}

fn scoped_group_ids(groups: Vec<Group>, only: Option<DbId>) -> Vec<DbId> {
    groups
        .into_iter()
        .map(|g| g.id)
        .filter(|id| only.map_or(true, |only| only == *id))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn group(id: DbId) -> Group {
        Group {
            id,
            name: "Juniors".into(),
            age_range_min: 6,
            age_range_max: 9,
            room: None,
            schedule: None,
            teacher_id: None,
            teacher_name: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn all_assigned_groups_without_filter() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(scoped_group_ids(vec![group(a), group(b)], None), vec![a, b]);
    }

    #[test]
    fn filter_outside_assignment_is_empty() {
        let a = Uuid::new_v4();
        assert!(scoped_group_ids(vec![group(a)], Some(Uuid::new_v4())).is_empty());
        assert_eq!(scoped_group_ids(vec![group(a)], Some(a)), vec![a]);
    }
}
