//! Check-in record model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use rkids_core::types::{DbId, Timestamp};

/// Raw `check_in_records` row.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRecord {
    pub id: DbId,
    pub church_id: DbId,
    pub child_id: DbId,
    pub guardian_id: Option<DbId>,
    pub teacher_id: Option<DbId>,
    pub method: String,
    pub qr_code: Option<String>,
    pub otp_code: Option<String>,
    pub session_id: Option<DbId>,
    pub booking_id: Option<DbId>,
    pub timestamp_in: Timestamp,
    pub timestamp_out: Option<Timestamp>,
}

/// Check-in record joined with child, group and guardian names.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInDetail {
    pub record_id: DbId,
    pub child_id: DbId,
    pub child_name: String,
    pub registration_id: String,
    pub group_id: Option<DbId>,
    pub group_name: Option<String>,
    pub guardian_id: Option<DbId>,
    pub guardian_name: Option<String>,
    pub parent_code: Option<String>,
    pub teacher_id: Option<DbId>,
    pub method: String,
    pub session_id: Option<DbId>,
    pub booking_id: Option<DbId>,
    pub timestamp_in: Timestamp,
    pub timestamp_out: Option<Timestamp>,
}

/// DTO for inserting a check-in record.
#[derive(Debug, Deserialize)]
pub struct CreateCheckIn {
    pub child_id: DbId,
    pub guardian_id: Option<DbId>,
    pub teacher_id: DbId,
    pub method: String,
    pub qr_code: Option<String>,
    pub otp_code: Option<String>,
    pub session_id: Option<DbId>,
    pub booking_id: Option<DbId>,
}
