//! Session booking model.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;
use rkids_core::types::{DbId, Timestamp};

/// Raw `session_bookings` row.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: DbId,
    pub session_id: DbId,
    pub child_id: DbId,
    pub guardian_id: Option<DbId>,
    pub qr_code: String,
    pub otp_code: String,
    pub status: String,
    pub booked_at: Timestamp,
    pub checked_in_at: Option<Timestamp>,
    pub checked_out_at: Option<Timestamp>,
}

/// Booking joined with child, guardian and session fields.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetail {
    pub id: DbId,
    pub session_id: DbId,
    pub session_title: String,
    pub session_date: NaiveDate,
    pub child_id: DbId,
    pub child_name: String,
    pub registration_id: String,
    pub guardian_id: Option<DbId>,
    pub guardian_name: Option<String>,
    pub qr_code: String,
    pub otp_code: String,
    pub status: String,
    pub booked_at: Timestamp,
    pub checked_in_at: Option<Timestamp>,
    pub checked_out_at: Option<Timestamp>,
}
