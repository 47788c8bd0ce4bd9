//! Repository for the `notifications` table.

use rkids_core::types::DbId;
use sqlx::PgPool;

use crate::models::notification::{CreateNotification, Notification, NotificationRecipient};

const COLUMNS: &str = "id, type, content, child_id, guardian_id, user_id, email_sent, sms_sent, \
                       delivery_status, is_read, read_at, sent_at, created_at";

/// Column and bind value that scope a query to one recipient.
fn recipient_scope(recipient: NotificationRecipient) -> (&'static str, DbId) {
    match recipient {
        NotificationRecipient::Guardian(id) => ("guardian_id", id),
        NotificationRecipient::User(id) => ("user_id", id),
    }
}

pub struct NotificationRepo;

impl NotificationRepo {
    /// Insert a notification in the `pending` delivery state.
    pub async fn create(
        pool: &PgPool,
        church_id: DbId,
        input: &CreateNotification,
    ) -> Result<Notification, sqlx::Error> {
        let query = format!(
            "INSERT INTO notifications (church_id, type, content, child_id, guardian_id, user_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(church_id)
            .bind(&input.kind)
            .bind(&input.content)
            .bind(input.child_id)
            .bind(input.guardian_id)
            .bind(input.user_id)
            .fetch_one(pool)
            .await
    }

    /// Record the outcome of a delivery attempt.
    pub async fn record_delivery(
        pool: &PgPool,
        id: DbId,
        email_sent: bool,
        sms_sent: bool,
        delivery_status: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE notifications SET
                email_sent = $2,
                sms_sent = $3,
                delivery_status = $4,
                sent_at = CASE WHEN $2 OR $3 THEN NOW() ELSE sent_at END
             WHERE id = $1",
        )
        .bind(id)
        .bind(email_sent)
        .bind(sms_sent)
        .bind(delivery_status)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Most recent notifications for a recipient.
    pub async fn list_for(
        pool: &PgPool,
        church_id: DbId,
        recipient: NotificationRecipient,
        child_id: Option<DbId>,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let (column, recipient_id) = recipient_scope(recipient);
        let query = format!(
            "SELECT {COLUMNS} FROM notifications
             WHERE church_id = $1 AND {column} = $2
               AND ($3::uuid IS NULL OR child_id = $3)
               AND (NOT $4 OR is_read = FALSE)
             ORDER BY created_at DESC
             LIMIT $5"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(church_id)
            .bind(recipient_id)
            .bind(child_id)
            .bind(unread_only)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        church_id: DbId,
        id: DbId,
    ) -> Result<Option<Notification>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notifications WHERE id = $1 AND church_id = $2");
        sqlx::query_as::<_, Notification>(&query)
            .bind(id)
            .bind(church_id)
            .fetch_optional(pool)
            .await
    }

    /// Mark one notification read. Returns `None` if it does not belong to
    /// the recipient.
    pub async fn mark_read(
        pool: &PgPool,
        church_id: DbId,
        recipient: NotificationRecipient,
        id: DbId,
    ) -> Result<Option<Notification>, sqlx::Error> {
        let (column, recipient_id) = recipient_scope(recipient);
        let query = format!(
            "UPDATE notifications SET is_read = TRUE, read_at = COALESCE(read_at, NOW())
             WHERE id = $1 AND church_id = $2 AND {column} = $3
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(id)
            .bind(church_id)
            .bind(recipient_id)
            .fetch_optional(pool)
            .await
    }

    /// Mark every unread notification for the recipient read. Returns the
    /// number of rows changed.
    pub async fn mark_all_read(
        pool: &PgPool,
        church_id: DbId,
        recipient: NotificationRecipient,
    ) -> Result<u64, sqlx::Error> {
        let (column, recipient_id) = recipient_scope(recipient);
        let query = format!(
            "UPDATE notifications SET is_read = TRUE, read_at = NOW()
             WHERE church_id = $1 AND {column} = $2 AND is_read = FALSE"
        );
        let result = sqlx::query(&query)
            .bind(church_id)
            .bind(recipient_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn unread_count(
        pool: &PgPool,
        church_id: DbId,
        recipient: NotificationRecipient,
    ) -> Result<i64, sqlx::Error> {
        let (column, recipient_id) = recipient_scope(recipient);
        let query = format!(
            "SELECT COUNT(*) FROM notifications
             WHERE church_id = $1 AND {column} = $2 AND is_read = FALSE"
        );
        sqlx::query_scalar(&query)
            .bind(church_id)
            .bind(recipient_id)
            .fetch_one(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_scope_selects_column() {
        let id = DbId::nil();
        assert_eq!(recipient_scope(NotificationRecipient::Guardian(id)).0, "guardian_id");
        assert_eq!(recipient_scope(NotificationRecipient::User(id)).0, "user_id");
    }
}
