//! Group entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use rkids_core::types::{DbId, Timestamp};

/// Group row joined with the assigned teacher's name.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: DbId,
    pub name: String,
    pub age_range_min: i32,
    pub age_range_max: i32,
    pub room: Option<String>,
    pub schedule: Option<String>,
    pub teacher_id: Option<DbId>,
    pub teacher_name: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for creating a group.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroup {
    pub name: String,
    pub age_range_min: i32,
    pub age_range_max: i32,
    pub room: Option<String>,
    pub schedule: Option<String>,
    pub teacher_id: Option<DbId>,
}

/// DTO for updating a group. All fields are optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroup {
    pub name: Option<String>,
    pub age_range_min: Option<i32>,
    pub age_range_max: Option<i32>,
    pub room: Option<String>,
    pub schedule: Option<String>,
    pub teacher_id: Option<DbId>,
}

impl UpdateGroup {
    pub fn has_changes(&self) -> bool {
        self.name.is_some()
            || self.age_range_min.is_some()
            || self.age_range_max.is_some()
            || self.room.is_some()
            || self.schedule.is_some()
            || self.teacher_id.is_some()
    }
}
