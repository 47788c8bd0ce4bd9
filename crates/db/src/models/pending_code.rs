//! Short-lived code rows (MFA challenges, check-in and pickup codes).

use sqlx::FromRow;
use rkids_core::types::Timestamp;

#[derive(Debug, Clone, FromRow)]
pub struct PendingCodeRow {
    pub code: String,
    pub purpose: String,
    pub payload: serde_json::Value,
    pub expires_at: Timestamp,
}
