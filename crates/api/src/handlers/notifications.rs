//! Handlers for the caller's `/notifications`.
//!
//! Parent accounts read the notifications addressed to their guardian
//! record; every other role reads those addressed to their user id.

use axum::extract::{Path, Query, State};
use axum::Json;
use rkids_core::error::CoreError;
use rkids_core::search::DEFAULT_LIST_LIMIT;
use rkids_core::types::DbId;
use rkids_db::models::notification::{Notification, NotificationRecipient};
use rkids_db::repositories::NotificationRepo;
use serde::{Deserialize, Serialize};

use super::children::caller_guardian_id;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListNotificationsParams {
    #[serde(alias = "childId")]
    pub child_id: Option<DbId>,
    #[serde(default, alias = "unreadOnly")]
    pub unread_only: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkedRead {
    pub updated: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCount {
    pub unread_count: i64,
}

/// GET /api/notifications?child_id=&unread_only=
pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ListNotificationsParams>,
) -> AppResult<Json<DataResponse<Vec<Notification>>>> {
    let Some(recipient) = recipient(&state, &auth).await? else {
        return Ok(Json(DataResponse { data: Vec::new() }));
    };
    let notifications = NotificationRepo::list_for(
        &state.pool,
        auth.church_id,
        recipient,
        params.child_id,
        params.unread_only,
        DEFAULT_LIST_LIMIT,
    )
    .await?;
    Ok(Json(DataResponse {
        data: notifications,
    }))
}

/// GET /api/notifications/{id}
pub async fn get_notification(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Notification>>> {
    let not_found = || CoreError::not_found("Notification", id);
    let recipient = recipient(&state, &auth).await?.ok_or_else(not_found)?;
    let notification = NotificationRepo::find_by_id(&state.pool, auth.church_id, id)
        .await?
        .filter(|n| addressed_to(n, recipient))
        .ok_or_else(not_found)?;
    Ok(Json(DataResponse { data: notification }))
}

/// POST /api/notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Notification>>> {
    let not_found = || CoreError::not_found("Notification", id);
    let recipient = recipient(&state, &auth).await?.ok_or_else(not_found)?;
    let notification = NotificationRepo::mark_read(&state.pool, auth.church_id, recipient, id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(DataResponse { data: notification }))
}

/// POST /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<MarkedRead>>> {
    let updated = match recipient(&state, &auth).await? {
        Some(recipient) => {
            NotificationRepo::mark_all_read(&state.pool, auth.church_id, recipient).await?
        }
        None => 0,
    };
    tracing::debug!(user_id = %auth.user_id, updated, "Notifications marked read");
    Ok(Json(DataResponse {
        data: MarkedRead { updated },
    }))
}

/// GET /api/notifications/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<UnreadCount>>> {
    let unread_count = match recipient(&state, &auth).await? {
        Some(recipient) => {
            NotificationRepo::unread_count(&state.pool, auth.church_id, recipient).await?
        }
        None => 0,
    };
    Ok(Json(DataResponse {
        data: UnreadCount { unread_count },
    }))
}

/// Who the caller reads notifications as. `None` for a parent account with
/// no guardian record.
async fn recipient(state: &AppState, auth: &AuthUser) -> AppResult<Option<NotificationRecipient>> {
    if auth.is_parent() {
        Ok(caller_guardian_id(state, auth)
            .await?
            .map(NotificationRecipient::Guardian))
    } else {
        Ok(Some(NotificationRecipient::User(auth.user_id)))
    }
}

fn addressed_to(notification: &Notification, recipient: NotificationRecipient) -> bool {
    match recipient {
        NotificationRecipient::Guardian(id) => notification.guardian_id == Some(id),
        NotificationRecipient::User(id) => notification.user_id == Some(id),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn notification(guardian_id: Option<DbId>, user_id: Option<DbId>) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            kind: "checkin".into(),
            content: "Checked in".into(),
            child_id: None,
            guardian_id,
            user_id,
            email_sent: false,
            sms_sent: false,
            delivery_status: "pending".into(),
            is_read: false,
            read_at: None,
            sent_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn guardian_recipient_matches_guardian_column() {
        let guardian = Uuid::new_v4();
        let n = notification(Some(guardian), None);
        assert!(addressed_to(&n, NotificationRecipient::Guardian(guardian)));
        assert!(!addressed_to(&n, NotificationRecipient::User(guardian)));
    }

    #[test]
    fn user_recipient_matches_user_column() {
        let user = Uuid::new_v4();
        let n = notification(None, Some(user));
        assert!(addressed_to(&n, NotificationRecipient::User(user)));
        assert!(!addressed_to(&n, NotificationRecipient::Guardian(Uuid::new_v4())));
    }

    #[test]
    fn unread_only_defaults_to_false() {
        let params: ListNotificationsParams = serde_json::from_str("{}").unwrap();
        assert!(!params.unread_only);
    }
}
