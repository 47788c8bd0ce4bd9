//! Notification model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use rkids_core::types::{DbId, Timestamp};

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: DbId,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
    pub content: String,
    pub child_id: Option<DbId>,
    pub guardian_id: Option<DbId>,
    pub user_id: Option<DbId>,
    pub email_sent: bool,
    pub sms_sent: bool,
    pub delivery_status: String,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub sent_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// DTO for inserting a notification in the `pending` state.
#[derive(Debug, Deserialize)]
pub struct CreateNotification {
    pub kind: String,
    pub content: String,
    pub child_id: Option<DbId>,
    pub guardian_id: Option<DbId>,
    pub user_id: Option<DbId>,
}

/// Who a notification listing is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationRecipient {
    Guardian(DbId),
    User(DbId),
}
