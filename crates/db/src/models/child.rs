//! Child entity model and DTOs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use rkids_core::types::{DbId, Timestamp};

pub const CHILD_STATUS_PENDING: &str = "pending";
pub const CHILD_STATUS_ACTIVE: &str = "active";
pub const CHILD_STATUS_REJECTED: &str = "rejected";

/// Raw `children` row.
#[derive(Debug, Clone, FromRow)]
pub struct Child {
    pub id: DbId,
    pub church_id: DbId,
    pub parent_id: DbId,
    pub group_id: Option<DbId>,
    pub registration_id: String,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Option<String>,
    pub status: String,
    pub submitted_by: Option<DbId>,
    pub submitted_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Child joined with its group name, as returned by the API.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildDetail {
    pub id: DbId,
    pub registration_id: String,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub group_id: Option<DbId>,
    #[serde(rename = "group")]
    pub group_name: Option<String>,
    pub parent_id: DbId,
    pub status: String,
    pub gender: Option<String>,
    pub submitted_by: Option<DbId>,
    pub submitted_at: Timestamp,
}

/// DTO for inserting a child row.
#[derive(Debug, Deserialize)]
pub struct CreateChild {
    pub parent_id: DbId,
    pub group_id: Option<DbId>,
    pub registration_id: String,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Option<String>,
    pub status: String,
    pub submitted_by: Option<DbId>,
}

/// DTO for updating a child. All fields are optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChild {
    pub name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub group_id: Option<DbId>,
    pub gender: Option<String>,
    pub status: Option<String>,
}

impl UpdateChild {
    pub fn has_changes(&self) -> bool {
        self.name.is_some()
            || self.date_of_birth.is_some()
            || self.group_id.is_some()
            || self.gender.is_some()
            || self.status.is_some()
    }
}
