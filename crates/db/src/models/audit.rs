//! Audit log model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use rkids_core::types::{DbId, Timestamp};

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: DbId,
    pub user_id: Option<DbId>,
    pub user_name: Option<String>,
    pub action_performed: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for inserting an audit entry.
#[derive(Debug, Deserialize)]
pub struct CreateAuditLog {
    pub user_id: Option<DbId>,
    pub action_performed: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Filters for listing audit entries.
#[derive(Debug, Default)]
pub struct AuditFilter {
    pub user_id: Option<DbId>,
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
}
