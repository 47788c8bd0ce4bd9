//! Guardian entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use rkids_core::types::{DbId, Timestamp};

/// Relationship recorded on primary guardians.
pub const RELATIONSHIP_PRIMARY: &str = "Primary";

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Guardian {
    pub id: DbId,
    pub church_id: DbId,
    pub parent_code: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub relationship: String,
    pub is_primary: bool,
    pub photo_url: Option<String>,
    pub active_until: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Guardian {
    /// A guardian is active until `active_until` passes; primaries usually
    /// have no end date.
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        self.active_until.map_or(true, |until| until > now)
    }
}

/// A primary guardian together with how many children they have registered.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentSummary {
    pub id: DbId,
    pub parent_code: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub relationship: String,
    pub photo_url: Option<String>,
    pub active_until: Option<Timestamp>,
    pub children_count: i64,
    pub created_at: Timestamp,
}

/// A guardian as linked to one child through `child_guardians`.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedGuardian {
    pub id: DbId,
    pub parent_code: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub relationship: String,
    pub is_primary: bool,
    pub is_authorized: bool,
    pub expires_at: Option<Timestamp>,
    pub active_until: Option<Timestamp>,
}

/// DTO for inserting a guardian row.
#[derive(Debug, Deserialize)]
pub struct CreateGuardian {
    pub parent_code: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub relationship: String,
    pub is_primary: bool,
    pub photo_url: Option<String>,
    pub active_until: Option<Timestamp>,
}

/// A `child_guardians` link row.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildGuardian {
    pub id: DbId,
    pub child_id: DbId,
    pub guardian_id: DbId,
    pub relationship: String,
    pub is_authorized: bool,
    pub expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
}
