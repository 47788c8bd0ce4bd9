//! Handlers for the `/checkin` resource.
//!
//! A child can be checked in four ways: a pre-generated QR token, a
//! session booking's QR or OTP, a pre-generated OTP, or manually by staff.
//! Every path ends in [`create_checkin_record`].

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use rkids_core::checkin::{start_of_day, AttendanceState, BookingStatus, CheckInMethod};
use rkids_core::codes::{generate_otp, generate_qr_token, OTP_LEN};
use rkids_core::error::CoreError;
use rkids_core::notification::check_in_message;
use rkids_core::search::MAX_LIST_LIMIT;
use rkids_core::types::{DbId, Timestamp};
use rkids_db::models::booking::Booking;
use rkids_db::models::check_in::{CheckInDetail, CreateCheckIn};
use rkids_db::models::child::Child;
use rkids_db::repositories::check_in_repo::CheckInFilter;
use rkids_db::repositories::{BookingRepo, CheckInRepo, GuardianRepo, SessionRepo};
use rkids_events::MinistryEvent;
use serde::{Deserialize, Serialize};

use super::bookings::booking_codes;
use super::children::caller_guardian_id;
use super::{find_child, non_blank};
use crate::audit::{self, AuditEntry, ClientInfo, ACTION_CHECK_IN};
use crate::codes::{self, CheckinGrant, CodePurpose, Redemption};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireStaff;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct GenerateQrRequest {
    #[serde(alias = "childId")]
    pub child_id: Option<DbId>,
    #[serde(alias = "guardianId")]
    pub guardian_id: Option<DbId>,
}

#[derive(Debug, Deserialize)]
pub struct ScanQrRequest {
    #[serde(alias = "qrCode")]
    pub qr_code: Option<String>,
    #[serde(alias = "sessionId")]
    pub session_id: Option<DbId>,
}

#[derive(Debug, Deserialize)]
pub struct ManualCheckInRequest {
    #[serde(alias = "childId")]
    pub child_id: Option<DbId>,
    #[serde(alias = "sessionId")]
    pub session_id: Option<DbId>,
    #[serde(alias = "guardianId")]
    pub guardian_id: Option<DbId>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    #[serde(alias = "otpCode")]
    pub otp_code: Option<String>,
    #[serde(alias = "childId")]
    pub child_id: Option<DbId>,
    #[serde(alias = "sessionId")]
    pub session_id: Option<DbId>,
}

/// A check-in QR token and its paired OTP.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCodes {
    pub qr_code: String,
    pub otp_code: String,
    pub expires_at: Timestamp,
    pub child_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInSummary {
    pub record_id: DbId,
    pub child_id: DbId,
    pub child_name: String,
    pub timestamp_in: Timestamp,
    pub method: &'static str,
    pub status: &'static str,
    pub session_id: Option<DbId>,
    pub booking_id: Option<DbId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInStatus {
    pub status: AttendanceState,
    pub checked_in: bool,
    pub checked_out: bool,
    pub timestamp_in: Option<Timestamp>,
    pub timestamp_out: Option<Timestamp>,
}

impl CheckInStatus {
    fn new(timestamp_in: Option<Timestamp>, timestamp_out: Option<Option<Timestamp>>) -> Self {
        let status = AttendanceState::from_latest(timestamp_out);
        Self {
            status,
            checked_in: status == AttendanceState::CheckedIn,
            checked_out: status == AttendanceState::CheckedOut,
            timestamp_in,
            timestamp_out: timestamp_out.flatten(),
        }
    }
}

/// Everything needed to write one check-in record.
pub(crate) struct CheckInArgs {
    pub(crate) child: Child,
    pub(crate) guardian_id: Option<DbId>,
    pub(crate) method: CheckInMethod,
    pub(crate) qr_code: Option<String>,
    pub(crate) otp_code: Option<String>,
    pub(crate) session_id: Option<DbId>,
    pub(crate) booking_id: Option<DbId>,
}

pub(crate) type Created = (StatusCode, Json<DataResponse<CheckInSummary>>);

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/checkin/generate-qr
///
/// Issue a QR token and a 6-digit OTP a guardian can present at the door.
/// Parents may only generate codes for children they are authorized for.
pub async fn generate_qr(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<GenerateQrRequest>,
) -> AppResult<Json<DataResponse<GeneratedCodes>>> {
    let child_id = input
        .child_id
        .ok_or_else(|| AppError::BadRequest("child_id is required".into()))?;
    let child = find_child(&state, auth.church_id, child_id).await?;

    let guardian_id = if auth.is_staff() {
        input.guardian_id.or(Some(child.parent_id))
    } else {
        let own = authorized_guardian(&state, &auth, &child)
            .await?
            .ok_or_else(|| AppError::forbidden("You are not authorized for this child"))?;
        Some(own)
    };

    let ttl = state.config.codes.checkin_expiry_mins;
    let mut grant = CheckinGrant {
        child_id: child.id,
        guardian_id,
        church_id: auth.church_id,
        pair: None,
    };
    let (qr_code, expires_at) = codes::issue(
        state.codes.as_ref(),
        CodePurpose::Checkin,
        &grant,
        ttl,
        generate_qr_token,
    )
    .await?;
    grant.pair = Some(qr_code.clone());
    let (otp_code, _) = codes::issue(
        state.codes.as_ref(),
        CodePurpose::Checkin,
        &grant,
        ttl,
        || generate_otp(OTP_LEN),
    )
    .await?;

    tracing::info!(child_id = %child.id, %expires_at, "Check-in codes issued");

    Ok(Json(DataResponse {
        data: GeneratedCodes {
            qr_code,
            otp_code,
            expires_at,
            child_name: child.name,
        },
    }))
}

/// POST /api/checkin/scan-qr
///
/// With a session the QR must belong to a `booked` booking of that
/// session; otherwise it must be a pending token from `generate-qr`.
pub async fn scan_qr(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    client: ClientInfo,
    Json(input): Json<ScanQrRequest>,
) -> AppResult<Created> {
    let qr_code = non_blank(input.qr_code)
        .ok_or_else(|| AppError::BadRequest("QR code is required".into()))?;

    let args = match input.session_id {
        Some(session_id) => {
            ensure_session(&state, staff.church_id, session_id).await?;
            let booking = BookingRepo::find_by_session_qr(&state.pool, session_id, &qr_code)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound("No booking found for this QR code and session".into())
                })?;
            ensure_bookable(&booking)?;
            CheckInArgs {
                child: find_child(&state, staff.church_id, booking.child_id).await?,
                guardian_id: booking.guardian_id,
                method: CheckInMethod::Qr,
                qr_code: Some(qr_code),
                otp_code: None,
                session_id: Some(session_id),
                booking_id: Some(booking.id),
            }
        }
        None => {
            let grant = pending_grant(&state, staff.church_id, &qr_code, "QR code").await?;
            CheckInArgs {
                child: find_child(&state, staff.church_id, grant.child_id).await?,
                guardian_id: grant.guardian_id,
                method: CheckInMethod::Qr,
                qr_code: Some(qr_code),
                otp_code: None,
                session_id: None,
                booking_id: None,
            }
        }
    };

    create_checkin_record(&state, &staff, &client, args).await
}

/// POST /api/checkin/manual
///
/// Staff check a child in directly. With a session the child's booking is
/// reused, re-opened when cancelled, or created with fresh codes.
pub async fn manual_checkin(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    client: ClientInfo,
    Json(input): Json<ManualCheckInRequest>,
) -> AppResult<Created> {
    let child_id = input
        .child_id
        .ok_or_else(|| AppError::BadRequest("child_id is required".into()))?;
    let child = find_child(&state, staff.church_id, child_id).await?;

    let mut guardian_id = input.guardian_id;
    let mut booking_id = None;
    if let Some(session_id) = input.session_id {
        ensure_session(&state, staff.church_id, session_id).await?;
        let booking = session_booking(&state, session_id, &child, guardian_id).await?;
        guardian_id = guardian_id.or(booking.guardian_id);
        booking_id = Some(booking.id);
    }

    let args = CheckInArgs {
        guardian_id: guardian_id.or(Some(child.parent_id)),
        child,
        method: CheckInMethod::ParentId,
        qr_code: None,
        otp_code: None,
        session_id: input.session_id,
        booking_id,
    };
    create_checkin_record(&state, &staff, &client, args).await
}

/// POST /api/checkin/verify-otp
///
/// Resolve the child from, in order: the session booking holding the OTP,
/// an explicit `child_id` entered by staff, or a pending OTP from
/// `generate-qr`.
pub async fn verify_otp(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    client: ClientInfo,
    Json(input): Json<VerifyOtpRequest>,
) -> AppResult<Created> {
    let otp_code = non_blank(input.otp_code)
        .ok_or_else(|| AppError::BadRequest("OTP code is required".into()))?;

    let args = if let Some(session_id) = input.session_id {
        ensure_session(&state, staff.church_id, session_id).await?;
        let booking = BookingRepo::find_by_session_otp(&state.pool, session_id, &otp_code)
            .await?
            .ok_or_else(|| AppError::NotFound("No booking found for this OTP and session".into()))?;
        ensure_bookable(&booking)?;
        CheckInArgs {
            child: find_child(&state, staff.church_id, booking.child_id).await?,
            guardian_id: booking.guardian_id,
            method: CheckInMethod::Otp,
            qr_code: None,
            otp_code: Some(otp_code),
            session_id: Some(session_id),
            booking_id: Some(booking.id),
        }
    } else if let Some(child_id) = input.child_id {
        let child = find_child(&state, staff.church_id, child_id).await?;
        CheckInArgs {
            guardian_id: Some(child.parent_id),
            child,
            method: CheckInMethod::Otp,
            qr_code: None,
            otp_code: Some(otp_code),
            session_id: None,
            booking_id: None,
        }
    } else {
        let grant = pending_grant(&state, staff.church_id, &otp_code, "OTP code").await?;
        CheckInArgs {
            child: find_child(&state, staff.church_id, grant.child_id).await?,
            guardian_id: grant.guardian_id,
            method: CheckInMethod::Otp,
            qr_code: None,
            otp_code: Some(otp_code),
            session_id: None,
            booking_id: None,
        }
    };

    create_checkin_record(&state, &staff, &client, args).await
}

/// GET /api/checkin/active
///
/// Children checked in today and not yet released, oldest first.
pub async fn list_active(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
) -> AppResult<Json<DataResponse<Vec<CheckInDetail>>>> {
    let filter = CheckInFilter {
        since: Some(start_of_day(Utc::now())),
        open_only: true,
        ..Default::default()
    };
    let records =
        CheckInRepo::list(&state.pool, staff.church_id, &filter, true, MAX_LIST_LIMIT).await?;
    Ok(Json(DataResponse { data: records }))
}

/// GET /api/checkin/status/{child_id}
pub async fn checkin_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(child_id): Path<DbId>,
) -> AppResult<Json<DataResponse<CheckInStatus>>> {
    let child = find_child(&state, auth.church_id, child_id).await?;
    if !auth.is_staff() && authorized_guardian(&state, &auth, &child).await?.is_none() {
        return Err(CoreError::not_found("Child", child_id).into());
    }

    let latest = CheckInRepo::latest_since(
        &state.pool,
        auth.church_id,
        child.id,
        start_of_day(Utc::now()),
    )
    .await?;
    let status = CheckInStatus::new(
        latest.as_ref().map(|r| r.timestamp_in),
        latest.map(|r| r.timestamp_out),
    );
    Ok(Json(DataResponse { data: status }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Write the check-in record and run its follow-ups. `actor` is stored as
/// the record's teacher: the staff member at the desk, or a teen checking
/// themselves in.
///
/// A child with an open record today cannot be checked in again. Booking
/// status, code retirement, notification and audit are best-effort.
pub(crate) async fn create_checkin_record(
    state: &AppState,
    actor: &AuthUser,
    client: &ClientInfo,
    args: CheckInArgs,
) -> AppResult<Created> {
    let now = Utc::now();
    let child = args.child;
    if CheckInRepo::find_open_since(&state.pool, actor.church_id, child.id, start_of_day(now))
        .await?
        .is_some()
    {
        return Err(already_checked_in(&child).into());
    }

    let dto = CreateCheckIn {
        child_id: child.id,
        guardian_id: args.guardian_id,
        teacher_id: actor.user_id,
        method: args.method.as_str().to_string(),
        qr_code: args.qr_code,
        otp_code: args.otp_code,
        session_id: args.session_id,
        booking_id: args.booking_id,
    };
    let record = match CheckInRepo::create(&state.pool, actor.church_id, &dto).await {
        Ok(record) => record,
        Err(e) if CheckInRepo::is_open_record_conflict(&e) => {
            return Err(already_checked_in(&child).into());
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(booking_id) = record.booking_id {
        if let Err(e) = BookingRepo::mark_checked_in(&state.pool, booking_id).await {
            tracing::warn!(%booking_id, error = %e, "Failed to mark booking checked in");
        }
    }
    if let Err(e) = state
        .codes
        .remove_for_child(CodePurpose::Checkin, child.id)
        .await
    {
        tracing::warn!(child_id = %child.id, error = %e, "Failed to retire check-in codes");
    }

    state.event_bus.publish(
        MinistryEvent::new(
            "checkin.completed",
            actor.church_id,
            check_in_message(Some(&child.name)),
        )
        .for_child(child.id)
        .for_guardian(record.guardian_id),
    );

    audit::record(
        &state.pool,
        AuditEntry {
            church_id: actor.church_id,
            user_id: Some(actor.user_id),
            action: ACTION_CHECK_IN,
            entity_type: "check_in",
            entity_id: Some(record.id.to_string()),
            details: Some(serde_json::json!({
                "childId": child.id,
                "method": args.method.as_str(),
                "sessionId": record.session_id,
            })),
            client,
        },
    )
    .await;

    tracing::info!(
        record_id = %record.id,
        child_id = %child.id,
        method = %args.method,
        "Child checked in"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: CheckInSummary {
                record_id: record.id,
                child_id: child.id,
                child_name: child.name,
                timestamp_in: record.timestamp_in,
                method: args.method.as_str(),
                status: AttendanceState::CheckedIn.as_str(),
                session_id: record.session_id,
                booking_id: record.booking_id,
            },
        }),
    ))
}

fn already_checked_in(child: &Child) -> CoreError {
    CoreError::Conflict(format!("{} is already checked in", child.name))
}

/// Look up a pending check-in code. Expired codes are deleted and reported
/// as 401, as are codes issued for another church.
async fn pending_grant(
    state: &AppState,
    church_id: DbId,
    code: &str,
    label: &str,
) -> AppResult<CheckinGrant> {
    match codes::peek_valid::<CheckinGrant>(
        state.codes.as_ref(),
        CodePurpose::Checkin,
        code,
        Utc::now(),
    )
    .await?
    {
        Redemption::Valid(grant) if grant.church_id == church_id => Ok(grant),
        Redemption::Expired => Err(AppError::unauthorized(format!("{label} expired"))),
        _ => Err(AppError::unauthorized(format!("Invalid or expired {label}"))),
    }
}

pub(crate) async fn ensure_session(state: &AppState, church_id: DbId, session_id: DbId) -> AppResult<()> {
    SessionRepo::find_by_id(&state.pool, church_id, session_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Session", session_id))?;
    Ok(())
}

pub(crate) fn ensure_bookable(booking: &Booking) -> AppResult<()> {
    if BookingStatus::parse(&booking.status)?.can_check_in() {
        Ok(())
    } else {
        Err(AppError::BadRequest(
            "Child already checked in or cancelled".into(),
        ))
    }
}

/// The child's booking for a session: reused when `booked`, re-opened with
/// fresh codes when cancelled, created when absent.
pub(crate) async fn session_booking(
    state: &AppState,
    session_id: DbId,
    child: &Child,
    guardian_id: Option<DbId>,
) -> AppResult<Booking> {
    let guardian_id = guardian_id.or(Some(child.parent_id));
    match BookingRepo::find_by_session_child(&state.pool, session_id, child.id).await? {
        Some(booking) => match BookingStatus::parse(&booking.status)? {
            BookingStatus::Booked => Ok(booking),
            BookingStatus::Cancelled => {
                BookingRepo::rebook_with_fresh_codes(
                    &state.pool,
                    booking.id,
                    guardian_id,
                    booking_codes,
                )
                .await?
                .ok_or_else(|| AppError::Core(CoreError::not_found("Booking", booking.id)))
            }
            _ => Err(AppError::BadRequest(
                "Child already checked in or cancelled".into(),
            )),
        },
        None => {
            let booking = BookingRepo::create_with_fresh_codes(
                &state.pool,
                session_id,
                child.id,
                guardian_id,
                booking_codes,
            )
            .await?;
            tracing::debug!(booking_id = %booking.id, %session_id, "Booking created for manual check-in");
            Ok(booking)
        }
    }
}

/// The caller's guardian id when it may act for `child`: the primary
/// guardian, or a secondary guardian with an unexpired authorization.
async fn authorized_guardian(
    state: &AppState,
    auth: &AuthUser,
    child: &Child,
) -> AppResult<Option<DbId>> {
    let Some(own) = caller_guardian_id(state, auth).await? else {
        return Ok(None);
    };
    if own == child.parent_id
        || GuardianRepo::is_authorized_for_child(&state.pool, child.id, own, Utc::now()).await?
    {
        Ok(Some(own))
    } else {
        Ok(None)
    }
}
