//! Session entity model and DTOs.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use rkids_core::types::{DbId, Timestamp};

/// Default `session_type` for new sessions.
pub const DEFAULT_SESSION_TYPE: &str = "Regular";

/// Session row joined with group and teacher names.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub session_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub group_id: Option<DbId>,
    pub group_name: Option<String>,
    pub teacher_id: Option<DbId>,
    pub teacher_name: Option<String>,
    pub created_by: Option<DbId>,
    pub session_type: String,
    pub location: Option<String>,
    pub is_recurring: bool,
    pub recurrence_pattern: Option<String>,
    pub gender_restriction: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for creating a session.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSession {
    pub title: String,
    pub description: Option<String>,
    pub session_date: NaiveDate,
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

/// DTO for updating a session. All fields are optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSession {
    pub title: Option<String>,
    pub description: Option<String>,
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

impl UpdateSession {
    pub fn has_changes(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.session_date.is_some()
            || self.start_time.is_some()
            || self.end_time.is_some()
            || self.group_id.is_some()
            || self.teacher_id.is_some()
            || self.session_type.is_some()
            || self.location.is_some()
            || self.is_recurring.is_some()
            || self.recurrence_pattern.is_some()
            || self.gender_restriction.is_some()
    }
}

/// Filters for listing sessions.
#[derive(Debug, Default)]
pub struct SessionFilter {
    pub group_id: Option<DbId>,
    pub date: Option<NaiveDate>,
    /// Inclusive lower / exclusive upper bound derived from `year`/`month`.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}
