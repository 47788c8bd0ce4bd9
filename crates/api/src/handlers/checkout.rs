//! Handlers for the `/checkout` resource: pickup codes, guardian
//! verification and release.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use rkids_core::checkin::{start_of_day, AttendanceState};
use rkids_core::codes::{generate_otp, generate_qr_token, OTP_LEN};
use rkids_core::notification::{checkout_message, pickup_ready_message};
use rkids_core::types::{DbId, Timestamp};
use rkids_db::repositories::check_in_repo::CheckInFilter;
use rkids_db::repositories::{BookingRepo, CheckInRepo, GuardianRepo};
use rkids_events::MinistryEvent;
use serde::{Deserialize, Serialize};

use super::{find_child, non_blank};
use crate::audit::{self, AuditEntry, ClientInfo, ACTION_CHECK_OUT};
use crate::codes::{self, CodePurpose, PickupGrant, Redemption};
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireStaff;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct NotifyRequest {
    #[serde(alias = "sessionId")]
    pub session_id: Option<DbId>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPickupRequest {
    #[serde(alias = "pickupCode", alias = "qr_code", alias = "otp_code")]
    pub pickup_code: Option<String>,
    #[serde(alias = "childId")]
    pub child_id: Option<DbId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReleaseRequest {
    #[serde(alias = "guardianId")]
    pub guardian_id: Option<DbId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupCodes {
    pub child_id: DbId,
    pub child_name: String,
    #[serde(rename = "pickupQR")]
    pub pickup_qr: String,
    #[serde(rename = "pickupOTP")]
    pub pickup_otp: String,
    pub expires_at: Timestamp,
    pub session_id: Option<DbId>,
    pub booking_id: Option<DbId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupVerification {
    pub verified: bool,
    pub child_id: DbId,
    pub guardian_id: Option<DbId>,
    pub authorized: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseSummary {
    pub record_id: DbId,
    pub child_id: DbId,
    pub timestamp_out: Option<Timestamp>,
    pub status: &'static str,
    pub session_id: Option<DbId>,
    pub booking_id: Option<DbId>,
}

/// POST /api/checkout/notify/{child_id} (alias `/pickup-code/{child_id}`)
///
/// Issue a pickup QR and OTP bound to the child and their primary
/// guardian, and send both to the guardian.
pub async fn notify_pickup(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(child_id): Path<DbId>,
    input: Option<Json<NotifyRequest>>,
) -> AppResult<Json<DataResponse<PickupCodes>>> {
    let session_id = input.and_then(|Json(body)| body.session_id);

    let filter = CheckInFilter {
        child_id: Some(child_id),
        session_id,
        since: Some(start_of_day(Utc::now())),
        open_only: true,
        ..Default::default()
    };
    let record = CheckInRepo::list(&state.pool, staff.church_id, &filter, false, 1)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound("Child is not checked in".into()))?;
    let child = find_child(&state, staff.church_id, child_id).await?;

    let grant = PickupGrant {
        child_id: child.id,
        guardian_id: Some(child.parent_id),
        church_id: staff.church_id,
    };
    let ttl = state.config.codes.pickup_expiry_mins;
    let (pickup_qr, expires_at) = codes::issue(
        state.codes.as_ref(),
        CodePurpose::Pickup,
        &grant,
        ttl,
        generate_qr_token,
    )
    .await?;
    let (pickup_otp, _) = codes::issue(
        state.codes.as_ref(),
        CodePurpose::Pickup,
        &grant,
        ttl,
        || generate_otp(OTP_LEN),
    )
    .await?;

    state.event_bus.publish(
        MinistryEvent::new(
            "checkout.pickup_ready",
            staff.church_id,
            pickup_ready_message(Some(&child.name), Some(&pickup_qr), Some(&pickup_otp)),
        )
        .for_child(child.id)
        .for_guardian(Some(child.parent_id)),
    );

    tracing::info!(child_id = %child.id, record_id = %record.record_id, "Pickup codes issued");

    Ok(Json(DataResponse {
        data: PickupCodes {
            child_id: child.id,
            child_name: child.name,
            pickup_qr,
            pickup_otp,
            expires_at,
            session_id,
            booking_id: record.booking_id,
        },
    }))
}

/// POST /api/checkout/verify
///
/// Check a pickup code and that its guardian may collect the child. The
/// code stays valid until the child is released.
pub async fn verify_pickup(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Json(input): Json<VerifyPickupRequest>,
) -> AppResult<Json<DataResponse<PickupVerification>>> {
    let code = non_blank(input.pickup_code)
        .ok_or_else(|| AppError::BadRequest("Pickup code (QR or OTP) is required".into()))?;

    let grant = match codes::peek_valid::<PickupGrant>(
        state.codes.as_ref(),
        CodePurpose::Pickup,
        &code,
        Utc::now(),
    )
    .await?
    {
        Redemption::Valid(grant) if grant.church_id == staff.church_id => grant,
        Redemption::Expired => return Err(AppError::unauthorized("Pickup code expired")),
        _ => return Err(AppError::unauthorized("Invalid or expired pickup code")),
    };

    if input.child_id.is_some_and(|id| id != grant.child_id) {
        return Err(AppError::BadRequest("Pickup code does not match child".into()));
    }

    let child = find_child(&state, staff.church_id, grant.child_id).await?;
    let authorized = match grant.guardian_id {
        Some(guardian_id) if guardian_id == child.parent_id => true,
        Some(guardian_id) => {
            GuardianRepo::is_authorized_for_child(&state.pool, child.id, guardian_id, Utc::now())
                .await?
        }
        None => false,
    };
    if !authorized {
        return Err(AppError::forbidden(
            "Guardian is not authorized to pick up this child",
        ));
    }

    Ok(Json(DataResponse {
        data: PickupVerification {
            verified: true,
            child_id: child.id,
            guardian_id: grant.guardian_id,
            authorized,
        },
    }))
}

/// POST /api/checkout/release/{child_id}
///
/// Close today's open check-in record. Outstanding pickup codes for the
/// child are retired.
pub async fn release_child(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    client: ClientInfo,
    Path(child_id): Path<DbId>,
    input: Option<Json<ReleaseRequest>>,
) -> AppResult<Json<DataResponse<ReleaseSummary>>> {
    let guardian_id = input.and_then(|Json(body)| body.guardian_id);
    let child = find_child(&state, staff.church_id, child_id).await?;
    let today = start_of_day(Utc::now());

    let Some(open) = CheckInRepo::find_open_since(&state.pool, staff.church_id, child.id, today).await?
    else {
        let message = match CheckInRepo::latest_since(&state.pool, staff.church_id, child.id, today)
            .await?
        {
            Some(_) => "Child is not currently checked in",
            None => "Child is not checked in",
        };
        return Err(AppError::NotFound(message.into()));
    };

    let record = CheckInRepo::check_out(&state.pool, staff.church_id, open.id, guardian_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Child is not currently checked in".into()))?;

    if let Some(booking_id) = record.booking_id {
        if let Err(e) = BookingRepo::mark_checked_out(&state.pool, booking_id).await {
            tracing::warn!(%booking_id, error = %e, "Failed to mark booking checked out");
        }
    }
    match state
        .codes
        .remove_for_child(CodePurpose::Pickup, child.id)
        .await
    {
        Ok(retired) => tracing::debug!(child_id = %child.id, retired, "Pickup codes retired"),
        Err(e) => tracing::warn!(child_id = %child.id, error = %e, "Failed to retire pickup codes"),
    }

    state.event_bus.publish(
        MinistryEvent::new(
            "checkout.completed",
            staff.church_id,
            checkout_message(Some(&child.name)),
        )
        .for_child(child.id)
        .for_guardian(record.guardian_id.or(Some(child.parent_id))),
    );

    audit::record(
        &state.pool,
        AuditEntry {
            church_id: staff.church_id,
            user_id: Some(staff.user_id),
            action: ACTION_CHECK_OUT,
            entity_type: "check_in",
            entity_id: Some(record.id.to_string()),
            details: Some(serde_json::json!({
                "childId": child.id,
                "guardianId": record.guardian_id,
            })),
            client: &client,
        },
    )
    .await;

    tracing::info!(record_id = %record.id, child_id = %child.id, "Child released");

    Ok(Json(DataResponse {
        data: ReleaseSummary {
            record_id: record.id,
            child_id: child.id,
            timestamp_out: record.timestamp_out,
            status: AttendanceState::CheckedOut.as_str(),
            session_id: record.session_id,
            booking_id: record.booking_id,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pickup_codes_use_upper_case_keys() {
        let codes = PickupCodes {
            child_id: DbId::nil(),
            child_name: "Sam".into(),
            pickup_qr: "qr".into(),
            pickup_otp: "123456".into(),
            expires_at: Utc::now(),
            session_id: None,
            booking_id: None,
        };
        let value = serde_json::to_value(&codes).unwrap();
        assert_eq!(value["pickupQR"], "qr");
        assert_eq!(value["pickupOTP"], "123456");
        assert_eq!(value["childName"], "Sam");
    }

    #[test]
    fn verify_request_accepts_code_aliases() {
        for body in [
            r#"{"pickup_code":"111111"}"#,
            r#"{"pickupCode":"111111"}"#,
            r#"{"otp_code":"111111"}"#,
        ] {
            let req: VerifyPickupRequest = serde_json::from_str(body).unwrap();
            assert_eq!(req.pickup_code.as_deref(), Some("111111"));
        }
    }
}
