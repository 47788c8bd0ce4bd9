//! Handlers for the `/sessions` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, NaiveTime};
use rkids_core::error::CoreError;
use rkids_core::groups::gender_allowed;
use rkids_core::search::MAX_LIST_LIMIT;
use rkids_core::types::DbId;
use rkids_db::models::check_in::CheckInDetail;
use rkids_db::models::child::ChildDetail;
use rkids_db::models::session::{CreateSession, Session, SessionFilter, UpdateSession};
use rkids_db::repositories::check_in_repo::CheckInFilter;
use rkids_db::repositories::{CheckInRepo, ChildRepo, SessionRepo};
use serde::Deserialize;

use super::non_blank;
use crate::audit::{self, AuditEntry, ClientInfo, ACTION_CREATE_SESSION, ACTION_DELETE_SESSION};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireStaff;
use crate::response::{DataResponse, SuccessResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListSessionsParams {
    #[serde(alias = "groupId")]
    pub group_id: Option<DbId>,
    pub date: Option<NaiveDate>,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

/// Request body for `POST /sessions`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "session_date")]
    pub session_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub group_id: Option<DbId>,
    pub teacher_id: Option<DbId>,
    pub session_type: Option<String>,
    pub location: Option<String>,
    pub is_recurring: Option<bool>,
    pub recurrence_pattern: Option<String>,
    pub gender_restriction: Option<String>,
}

/// GET /api/sessions?group_id=&date=&year=&month=
///
/// `month` only applies together with `year`.
pub async fn list_sessions(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ListSessionsParams>,
) -> AppResult<Json<DataResponse<Vec<Session>>>> {
    let date_range = params
        .year
        .map(|year| period_range(year, params.month))
        .transpose()?;
    let filter = SessionFilter {
        group_id: params.group_id,
        date: params.date,
        date_range,
    };
    let sessions = SessionRepo::list(&state.pool, auth.church_id, &filter).await?;
    Ok(Json(DataResponse { data: sessions }))
}

/// POST /api/sessions
pub async fn create_session(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    client: ClientInfo,
    Json(input): Json<CreateSessionRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Session>>)> {
    let (Some(title), Some(session_date)) = (non_blank(input.title), input.session_date) else {
        return Err(AppError::BadRequest(
            "title and session_date are required".into(),
        ));
    };
    validate_times(input.start_time, input.end_time)?;

    let dto = CreateSession {
        title,
        description: non_blank(input.description),
        session_date,
        start_time: input.start_time,
        end_time: input.end_time,
        group_id: input.group_id,
        teacher_id: input.teacher_id,
        session_type: non_blank(input.session_type),
        location: non_blank(input.location),
        is_recurring: input.is_recurring,
        recurrence_pattern: non_blank(input.recurrence_pattern),
        gender_restriction: non_blank(input.gender_restriction),
    };
    let session = SessionRepo::create(&state.pool, staff.church_id, staff.user_id, &dto).await?;

    audit::record(
        &state.pool,
        AuditEntry {
            church_id: staff.church_id,
            user_id: Some(staff.user_id),
            action: ACTION_CREATE_SESSION,
            entity_type: "session",
            entity_id: Some(session.id.to_string()),
            details: Some(serde_json::json!({
                "title": session.title,
                "sessionDate": session.session_date,
            })),
            client: &client,
        },
    )
    .await;

    tracing::info!(session_id = %session.id, date = %session.session_date, "Session created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: session })))
}

/// GET /api/sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Session>>> {
    let session = find_session(&state, auth.church_id, id).await?;
    Ok(Json(DataResponse { data: session }))
}

/// PUT /api/sessions/{id}
pub async fn update_session(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateSession>,
) -> AppResult<Json<DataResponse<Session>>> {
    if !input.has_changes() {
        return Err(AppError::BadRequest("No fields to update".into()));
    }
    if input.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(CoreError::Validation("title cannot be blank".into()).into());
    }
    validate_times(input.start_time, input.end_time)?;

    let session = SessionRepo::update(&state.pool, staff.church_id, id, &input)
        .await?
        .ok_or_else(|| CoreError::not_found("Session", id))?;
    Ok(Json(DataResponse { data: session }))
}

/// DELETE /api/sessions/{id}
pub async fn delete_session(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    client: ClientInfo,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<SuccessResponse>>> {
    if !SessionRepo::delete(&state.pool, staff.church_id, id).await? {
        return Err(CoreError::not_found("Session", id).into());
    }

    audit::record(
        &state.pool,
        AuditEntry {
            church_id: staff.church_id,
            user_id: Some(staff.user_id),
            action: ACTION_DELETE_SESSION,
            entity_type: "session",
            entity_id: Some(id.to_string()),
            details: None,
            client: &client,
        },
    )
    .await;

    Ok(Json(SuccessResponse::ok()))
}

/// GET /api/sessions/{id}/children
///
/// Children eligible for the session: members of its group that satisfy
/// its gender restriction. Sessions without a group have none.
pub async fn session_children(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<ChildDetail>>>> {
    let session = find_session(&state, staff.church_id, id).await?;
    let Some(group_id) = session.group_id else {
        return Ok(Json(DataResponse { data: Vec::new() }));
    };

    let restriction = session.gender_restriction.as_deref();
    let children = ChildRepo::list_for_groups(&state.pool, staff.church_id, &[group_id])
        .await?
        .into_iter()
        .filter(|c| gender_allowed(restriction, c.gender.as_deref()))
        .collect();
    Ok(Json(DataResponse { data: children }))
}

/// GET /api/sessions/{id}/history
pub async fn session_history(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<CheckInDetail>>>> {
    find_session(&state, staff.church_id, id).await?;
    let filter = CheckInFilter {
        session_id: Some(id),
        ..Default::default()
    };
    let history =
        CheckInRepo::list(&state.pool, staff.church_id, &filter, false, MAX_LIST_LIMIT).await?;
    Ok(Json(DataResponse { data: history }))
}

pub(crate) async fn find_session(state: &AppState, church_id: DbId, id: DbId) -> AppResult<Session> {
    SessionRepo::find_by_id(&state.pool, church_id, id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Session", id)))
}

/// Half-open `[start, end)` range covering a year, or one month of it.
fn period_range(year: i32, month: Option<u32>) -> Result<(NaiveDate, NaiveDate), CoreError> {
    let invalid = || CoreError::Validation("Invalid year or month".into());
    let next_year = || year.checked_add(1).ok_or_else(invalid);
    let (start, end) = match month {
        None => (
            NaiveDate::from_ymd_opt(year, 1, 1),
            NaiveDate::from_ymd_opt(next_year()?, 1, 1),
        ),
        Some(12) => (
            NaiveDate::from_ymd_opt(year, 12, 1),
            NaiveDate::from_ymd_opt(next_year()?, 1, 1),
        ),
        Some(m) => (
            NaiveDate::from_ymd_opt(year, m, 1),
            NaiveDate::from_ymd_opt(year, m.checked_add(1).ok_or_else(invalid)?, 1),
        ),
    };
    Ok((start.ok_or_else(invalid)?, end.ok_or_else(invalid)?))
}

fn validate_times(start: Option<NaiveTime>, end: Option<NaiveTime>) -> Result<(), CoreError> {
    match (start, end) {
        (Some(s), Some(e)) if e <= s => Err(CoreError::Validation(
            "endTime must be after startTime".into(),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn year_range_is_half_open() {
        assert_eq!(
            period_range(2026, None).unwrap(),
            (date(2026, 1, 1), date(2027, 1, 1))
        );
    }

    #[test]
    fn month_range_rolls_over_december() {
        assert_eq!(
            period_range(2026, Some(3)).unwrap(),
            (date(2026, 3, 1), date(2026, 4, 1))
        );
        assert_eq!(
            period_range(2026, Some(12)).unwrap(),
            (date(2026, 12, 1), date(2027, 1, 1))
        );
    }

    #[test]
    fn invalid_month_is_rejected() {
        assert_matches!(period_range(2026, Some(13)), Err(CoreError::Validation(_)));
        assert_matches!(period_range(2026, Some(0)), Err(CoreError::Validation(_)));
    }

    #[test]
    fn out_of_range_year_is_rejected() {
        assert_matches!(period_range(i32::MAX, None), Err(CoreError::Validation(_)));
        assert_matches!(period_range(i32::MAX, Some(12)), Err(CoreError::Validation(_)));
        assert_matches!(period_range(2026, Some(u32::MAX)), Err(CoreError::Validation(_)));
    }

    #[test]
    fn end_time_must_follow_start_time() {
        let nine = NaiveTime::from_hms_opt(9, 0, 0);
        let ten = NaiveTime::from_hms_opt(10, 0, 0);
        assert!(validate_times(nine, ten).is_ok());
        assert!(validate_times(nine, None).is_ok());
        assert_matches!(validate_times(ten, nine), Err(CoreError::Validation(_)));
    }
}
