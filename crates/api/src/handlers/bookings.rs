//! Handlers for session bookings (`/sessions/{id}/bookings`,
//! `/sessions/{id}/book`, `/bookings/{id}`, `/children/{id}/bookings`).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rkids_core::checkin::BookingStatus;
use rkids_core::codes::{generate_otp, generate_qr_token, OTP_LEN};
use rkids_core::error::CoreError;
use rkids_core::groups::gender_allowed;
use rkids_core::types::DbId;
use rkids_db::models::booking::{Booking, BookingDetail};
use rkids_db::models::session::Session;
use rkids_db::repositories::BookingRepo;
use serde::{Deserialize, Serialize};

use super::find_accessible_child;
use super::sessions::find_session;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireStaff;
use crate::response::{DataResponse, SuccessResponse};
use crate::state::AppState;

/// Request body for `POST /sessions/{id}/book`. Either `child_ids` or a
/// single `child_id`.
#[derive(Debug, Deserialize)]
pub struct BookSessionRequest {
    #[serde(default, alias = "childIds")]
    pub child_ids: Vec<DbId>,
    #[serde(alias = "childId")]
    pub child_id: Option<DbId>,
    #[serde(alias = "guardianId")]
    pub guardian_id: Option<DbId>,
}

impl BookSessionRequest {
    /// Requested children, deduplicated, in request order.
    fn children(&self) -> Vec<DbId> {
        let mut ids: Vec<DbId> = Vec::new();
        for id in self.child_ids.iter().copied().chain(self.child_id) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

#[derive(Debug, Serialize)]
pub struct BookingOutcome {
    pub bookings: Vec<Booking>,
    pub errors: Option<Vec<String>>,
}

/// GET /api/sessions/{id}/bookings
pub async fn list_session_bookings(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(session_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<BookingDetail>>>> {
    find_session(&state, staff.church_id, session_id).await?;
    let bookings = BookingRepo::list_for_session(&state.pool, staff.church_id, session_id).await?;
    Ok(Json(DataResponse { data: bookings }))
}

/// POST /api/sessions/{id}/book
///
/// Book each requested child with its own QR token and OTP. Failures are
/// collected per child; the request fails only when no child was booked.
pub async fn book_session(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(session_id): Path<DbId>,
    Json(input): Json<BookSessionRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<BookingOutcome>>)> {
    let child_ids = input.children();
    if child_ids.is_empty() {
        return Err(AppError::BadRequest(
            "child_id or child_ids is required".into(),
        ));
    }
    let session = find_session(&state, auth.church_id, session_id).await?;

    let mut bookings = Vec::new();
    let mut errors = Vec::new();
    for child_id in child_ids {
        match book_child(&state, &auth, &session, child_id, input.guardian_id).await {
            Ok(booking) => bookings.push(booking),
            Err(message) => errors.push(message),
        }
    }

    if bookings.is_empty() {
        return Err(AppError::BadRequest(errors.join("; ")));
    }

    tracing::info!(
        %session_id,
        booked = bookings.len(),
        failed = errors.len(),
        "Session booked"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: BookingOutcome {
                bookings,
                errors: (!errors.is_empty()).then_some(errors),
            },
        }),
    ))
}

/// GET /api/bookings/{id}
pub async fn get_booking(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<BookingDetail>>> {
    let booking = find_booking(&state, &auth, id).await?;
    Ok(Json(DataResponse { data: booking }))
}

/// DELETE /api/bookings/{id}
///
/// Cancel a booking. Only bookings not yet checked in can be cancelled.
pub async fn cancel_booking(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<SuccessResponse>>> {
    let booking = find_booking(&state, &auth, id).await?;
    BookingStatus::parse(&booking.status)?.transition(BookingStatus::Cancelled)?;

    BookingRepo::cancel(&state.pool, id)
        .await?
        .ok_or_else(|| CoreError::not_found("Booking", id))?;
    tracing::info!(booking_id = %id, child_id = %booking.child_id, "Booking cancelled");
    Ok(Json(SuccessResponse::ok()))
}

/// GET /api/children/{id}/bookings
pub async fn list_child_bookings(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(child_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<BookingDetail>>>> {
    let child = find_accessible_child(&state, &auth, child_id).await?;
    let bookings = BookingRepo::list_for_child(&state.pool, auth.church_id, child.id).await?;
    Ok(Json(DataResponse { data: bookings }))
}

/// Book one child, returning a message naming the child on failure.
async fn book_child(
    state: &AppState,
    auth: &AuthUser,
    session: &Session,
    child_id: DbId,
    guardian_id: Option<DbId>,
) -> Result<Booking, String> {
    let child = match find_accessible_child(state, auth, child_id).await {
        Ok(child) => child,
        Err(AppError::Core(CoreError::NotFound { .. })) => {
            return Err(format!("Child {child_id} not found"));
        }
        Err(e) => return Err(booking_failure(child_id, e)),
    };
    if !gender_allowed(session.gender_restriction.as_deref(), child.gender.as_deref()) {
        return Err(format!(
            "Child {child_id} does not meet this session's gender restriction"
        ));
    }

    let guardian_id = guardian_id.or(Some(child.parent_id));
    let existing = BookingRepo::find_by_session_child(&state.pool, session.id, child.id)
        .await
        .map_err(|e| booking_failure(child_id, e.into()))?;

    let booked = match existing {
        Some(booking) if booking.status == BookingStatus::Cancelled.as_str() => {
            BookingRepo::rebook_with_fresh_codes(&state.pool, booking.id, guardian_id, booking_codes)
                .await
                .map_err(|e| booking_failure(child_id, e.into()))?
                .ok_or_else(|| format!("Failed to book child {child_id}"))?
        }
        Some(_) => return Err(format!("Child {child_id} already booked for this session")),
        None => BookingRepo::create_with_fresh_codes(
            &state.pool,
            session.id,
            child.id,
            guardian_id,
            booking_codes,
        )
        .await
        .map_err(|e| booking_failure(child_id, e.into()))?,
    };

    Ok(booked)
}

/// A fresh QR token and OTP for a booking.
pub(crate) fn booking_codes() -> (String, String) {
    (generate_qr_token(), generate_otp(OTP_LEN))
}

fn booking_failure(child_id: DbId, error: AppError) -> String {
    tracing::warn!(%child_id, error = %error, "Failed to book child");
    format!("Failed to book child {child_id}")
}

/// Load a booking of the caller's church. Parents only see bookings of
/// their own children.
async fn find_booking(state: &AppState, auth: &AuthUser, id: DbId) -> AppResult<BookingDetail> {
    let booking = BookingRepo::find_detail(&state.pool, auth.church_id, id)
        .await?
        .ok_or_else(|| CoreError::not_found("Booking", id))?;
    if !auth.is_staff() {
        match find_accessible_child(state, auth, booking.child_id).await {
            Ok(_) => {}
            Err(AppError::Core(CoreError::NotFound { .. })) => {
                return Err(CoreError::not_found("Booking", id).into());
            }
            Err(e) => return Err(e),
        }
    }
    Ok(booking)
}
