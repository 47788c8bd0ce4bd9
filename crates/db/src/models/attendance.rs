//! Attendance summary model and DTOs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use rkids_core::types::{DbId, Timestamp};

/// Summary row joined with the group name.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub id: DbId,
    pub group_id: DbId,
    pub group_name: Option<String>,
    pub date: NaiveDate,
    pub present_count: i32,
    pub absent_count: i32,
    pub male_count: i32,
    pub female_count: i32,
    pub submitted_by: Option<DbId>,
    pub updated_at: Timestamp,
}

/// DTO for submitting (upserting) a day's attendance for a group.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAttendance {
    pub group_id: DbId,
    pub date: NaiveDate,
    pub present_count: i32,
    pub absent_count: i32,
    #[serde(default)]
    pub male_count: i32,
    #[serde(default)]
    pub female_count: i32,
}
