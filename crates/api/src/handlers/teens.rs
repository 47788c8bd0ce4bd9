//! Handlers for the `/teens` resource.
//!
//! A teen account is linked to exactly one child row through
//! `users.linked_child_id`. Every endpoint here resolves that child from the
//! caller's token; a teen never names a child id.

use axum::extract::{Query, State};
use axum::Json;
use chrono::{Duration, Utc};
use rkids_core::checkin::{BookingStatus, CheckInMethod};
use rkids_core::error::CoreError;
use rkids_core::groups::age_on;
use rkids_core::search::{clamp_limit, MAX_LIST_LIMIT};
use rkids_core::types::{DbId, Timestamp};
use rkids_db::models::check_in::CheckInDetail;
use rkids_db::models::user::User;
use rkids_db::repositories::check_in_repo::CheckInFilter;
use rkids_db::repositories::{BookingRepo, CheckInRepo, ChildRepo, GuardianRepo, UserRepo};
use serde::{Deserialize, Serialize};

use super::checkin::{
    create_checkin_record, ensure_session, session_booking, CheckInArgs, Created,
};
use super::find_child;
use crate::audit::ClientInfo;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireTeen;
use crate::response::DataResponse;
use crate::state::AppState;

/// Days covered by the attendance stats.
const STATS_WINDOW_DAYS: i64 = 30;

/// Default number of records on `GET /teens/attendance`.
const DEFAULT_HISTORY_LIMIT: i64 = 30;

/// Records shown on the dashboard.
const DASHBOARD_HISTORY_LIMIT: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct TeenAttendanceParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubmitAttendanceRequest {
    #[serde(alias = "sessionId")]
    pub session_id: Option<DbId>,
    #[serde(alias = "bookingId")]
    pub booking_id: Option<DbId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeenProfile {
    pub user_id: DbId,
    pub email: String,
    pub name: String,
    pub child_id: DbId,
    pub child_name: String,
    pub registration_id: String,
    pub date_of_birth: chrono::NaiveDate,
    pub age: i32,
    pub group: Option<String>,
    pub gender: Option<String>,
    pub parent_name: Option<String>,
    pub parent_email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeenAttendanceEntry {
    pub id: DbId,
    pub date: chrono::NaiveDate,
    pub timestamp_in: Timestamp,
    pub timestamp_out: Option<Timestamp>,
    pub method: String,
    pub group_name: Option<String>,
    pub attended: bool,
    pub checked_out: bool,
}

impl From<CheckInDetail> for TeenAttendanceEntry {
    fn from(record: CheckInDetail) -> Self {
        Self {
            id: record.record_id,
            date: record.timestamp_in.date_naive(),
            timestamp_in: record.timestamp_in,
            checked_out: record.timestamp_out.is_some(),
            timestamp_out: record.timestamp_out,
            method: record.method,
            group_name: record.group_name,
            attended: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeenStats {
    pub child_id: DbId,
    pub attended_last_30_days: i64,
    pub total_sessions: i64,
    pub attendance_rate: f64,
}

impl TeenStats {
    /// Rate against one expected session per day of the window, as a
    /// percentage rounded to two decimals and capped at 100.
    fn new(child_id: DbId, attended: i64) -> Self {
        let rate = (attended as f64 / STATS_WINDOW_DAYS as f64 * 100.0).min(100.0);
        Self {
            child_id,
            attended_last_30_days: attended,
            total_sessions: STATS_WINDOW_DAYS,
            attendance_rate: (rate * 100.0).round() / 100.0,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeenDashboard {
    pub profile: TeenProfile,
    pub recent_attendance: Vec<TeenAttendanceEntry>,
    pub stats: TeenStats,
}

/// GET /api/teens/profile
pub async fn get_profile(
    State(state): State<AppState>,
    RequireTeen(teen): RequireTeen,
) -> AppResult<Json<DataResponse<TeenProfile>>> {
    let (user, child_id) = linked_account(&state, &teen).await?;
    let profile = load_profile(&state, &teen, user, child_id).await?;
    Ok(Json(DataResponse { data: profile }))
}

/// GET /api/teens/attendance
///
/// The linked child's check-in records, newest first.
pub async fn list_attendance(
    State(state): State<AppState>,
    RequireTeen(teen): RequireTeen,
    Query(params): Query<TeenAttendanceParams>,
) -> AppResult<Json<DataResponse<Vec<TeenAttendanceEntry>>>> {
    let (_, child_id) = linked_account(&state, &teen).await?;
    let limit = clamp_limit(params.limit, DEFAULT_HISTORY_LIMIT, MAX_LIST_LIMIT);
    let history = attendance_history(&state, &teen, child_id, limit).await?;
    Ok(Json(DataResponse { data: history }))
}

/// GET /api/teens/stats
pub async fn get_stats(
    State(state): State<AppState>,
    RequireTeen(teen): RequireTeen,
) -> AppResult<Json<DataResponse<TeenStats>>> {
    let (_, child_id) = linked_account(&state, &teen).await?;
    let stats = attendance_stats(&state, &teen, child_id).await?;
    Ok(Json(DataResponse { data: stats }))
}

/// POST /api/teens/attendance/submit
///
/// Self check-in. With a booking id that booking is redeemed; with a
/// session id the child's booking for it is reused or created. The teen is
/// recorded as the checking-in user.
pub async fn submit_attendance(
    State(state): State<AppState>,
    RequireTeen(teen): RequireTeen,
    client: ClientInfo,
    input: Option<Json<SubmitAttendanceRequest>>,
) -> AppResult<Created> {
    let input = input.map(|Json(body)| body).unwrap_or_default();
    let (_, child_id) = linked_account(&state, &teen).await?;
    let child = find_child(&state, teen.church_id, child_id).await?;

    let (session_id, booking_id, guardian_id) = match (input.booking_id, input.session_id) {
        (Some(booking_id), session_id) => {
            let booking = BookingRepo::find_detail(&state.pool, teen.church_id, booking_id)
                .await?
                .filter(|b| b.child_id == child.id)
                .ok_or_else(|| CoreError::not_found("Booking", booking_id))?;
            if session_id.is_some_and(|id| id != booking.session_id) {
                return Err(AppError::BadRequest(
                    "Booking does not belong to this session".into(),
                ));
            }
            if !BookingStatus::parse(&booking.status)?.can_check_in() {
                return Err(AppError::BadRequest(
                    "Already checked in for this session".into(),
                ));
            }
            (Some(booking.session_id), Some(booking.id), booking.guardian_id)
        }
        (None, Some(session_id)) => {
            ensure_session(&state, teen.church_id, session_id).await?;
            let booking = session_booking(&state, session_id, &child, None).await?;
            (Some(session_id), Some(booking.id), booking.guardian_id)
        }
        (None, None) => (None, None, None),
    };

    let args = CheckInArgs {
        guardian_id: guardian_id.or(Some(child.parent_id)),
        child,
        method: CheckInMethod::ParentId,
        qr_code: None,
        otp_code: None,
        session_id,
        booking_id,
    };
    create_checkin_record(&state, &teen, &client, args).await
}

/// GET /api/teens/dashboard
///
/// Profile, the ten most recent records and the 30-day stats in one call.
pub async fn get_dashboard(
    State(state): State<AppState>,
    RequireTeen(teen): RequireTeen,
) -> AppResult<Json<DataResponse<TeenDashboard>>> {
    let (user, child_id) = linked_account(&state, &teen).await?;
    let profile = load_profile(&state, &teen, user, child_id).await?;
    let recent_attendance =
        attendance_history(&state, &teen, child_id, DASHBOARD_HISTORY_LIMIT).await?;
    let stats = attendance_stats(&state, &teen, child_id).await?;

    Ok(Json(DataResponse {
        data: TeenDashboard {
            profile,
            recent_attendance,
            stats,
        },
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The caller's user row and linked child id.
async fn linked_account(state: &AppState, teen: &AuthUser) -> AppResult<(User, DbId)> {
    let user = UserRepo::find_by_id(&state.pool, teen.church_id, teen.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Teen user not found".into()))?;
    let child_id = user
        .linked_child_id
        .ok_or_else(|| AppError::NotFound("Teen account not linked to a child".into()))?;
    Ok((user, child_id))
}

async fn load_profile(
    state: &AppState,
    teen: &AuthUser,
    user: User,
    child_id: DbId,
) -> AppResult<TeenProfile> {
    let child = ChildRepo::find_detail(&state.pool, teen.church_id, child_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Child", child_id))?;
    let guardian = GuardianRepo::find_by_id(&state.pool, teen.church_id, child.parent_id).await?;

    Ok(TeenProfile {
        user_id: user.id,
        email: user.email,
        name: user.name,
        child_id: child.id,
        child_name: child.name,
        registration_id: child.registration_id,
        date_of_birth: child.date_of_birth,
        age: age_on(child.date_of_birth, Utc::now().date_naive()),
        group: child.group_name,
        gender: child.gender,
        parent_name: guardian.as_ref().map(|g| g.name.clone()),
        parent_email: guardian.and_then(|g| g.email),
    })
}

async fn attendance_history(
    state: &AppState,
    teen: &AuthUser,
    child_id: DbId,
    limit: i64,
) -> AppResult<Vec<TeenAttendanceEntry>> {
    let filter = CheckInFilter {
        child_id: Some(child_id),
        ..Default::default()
    };
    let records = CheckInRepo::list(&state.pool, teen.church_id, &filter, false, limit).await?;
    Ok(records.into_iter().map(TeenAttendanceEntry::from).collect())
}

async fn attendance_stats(
    state: &AppState,
    teen: &AuthUser,
    child_id: DbId,
) -> AppResult<TeenStats> {
    let filter = CheckInFilter {
        child_id: Some(child_id),
        since: Some(Utc::now() - Duration::days(STATS_WINDOW_DAYS)),
        ..Default::default()
    };
    let attended = CheckInRepo::count(&state.pool, teen.church_id, &filter).await?;
    Ok(TeenStats::new(child_id, attended))
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn stats_rate_is_rounded_percentage() {
        let stats = TeenStats::new(Uuid::nil(), 4);
        assert_eq!(stats.total_sessions, 30);
        assert_eq!(stats.attendance_rate, 13.33);
    }

    #[test]
    fn stats_rate_is_capped() {
        assert_eq!(TeenStats::new(Uuid::nil(), 45).attendance_rate, 100.0);
        assert_eq!(TeenStats::new(Uuid::nil(), 0).attendance_rate, 0.0);
    }

    #[test]
    fn stats_use_camel_case_keys() {
        let value = serde_json::to_value(TeenStats::new(Uuid::nil(), 3)).unwrap();
        assert_eq!(value["attendedLast30Days"], 3);
        assert_eq!(value["attendanceRate"], 10.0);
    }

    #[test]
    fn submit_body_accepts_both_key_styles() {
        let id = Uuid::new_v4();
        let camel: SubmitAttendanceRequest =
            serde_json::from_value(serde_json::json!({ "sessionId": id })).unwrap();
        let snake: SubmitAttendanceRequest =
            serde_json::from_value(serde_json::json!({ "booking_id": id })).unwrap();
        assert_eq!(camel.session_id, Some(id));
        assert_eq!(snake.booking_id, Some(id));
    }
}
