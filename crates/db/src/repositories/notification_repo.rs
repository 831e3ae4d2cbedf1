//! Repository for the `notifications` table.

use sqlx::PgPool;

use docflow_core::types::DbId;

use crate::models::notification::{Notification, NotificationWithEvent};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, event_id, user_id, channel, is_read, read_at, created_at";

/// Provides notification creation and per-user read operations.
pub struct NotificationRepo;

impl NotificationRepo {
    /// Insert a notification row, returning it.
    pub async fn create(
        pool: &PgPool,
        event_id: DbId,
        user_id: DbId,
        channel: &str,
    ) -> Result<Notification, sqlx::Error> {
        let query = format!(
            "INSERT INTO notifications (event_id, user_id, channel)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(event_id)
            .bind(user_id)
            .bind(channel)
            .fetch_one(pool)
            .await
    }

    /// List a user's notifications joined with their events, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
    ) -> Result<Vec<NotificationWithEvent>, sqlx::Error> {
        sqlx::query_as::<_, NotificationWithEvent>(
            "SELECT n.id, n.event_id, n.user_id, n.channel, n.is_read, n.read_at,
                    n.created_at, et.name AS event_type, e.payload
             FROM notifications n
             JOIN events e ON e.id = n.event_id
             JOIN event_types et ON et.id = e.event_type_id
             WHERE n.user_id = $1
             ORDER BY n.created_at DESC, n.id DESC
             LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Mark one of the user's notifications read. Returns `true` if a
    /// row was updated.
    pub async fn mark_read(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = NOW() \
             WHERE id = $1 AND user_id = $2 AND is_read = FALSE",
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
