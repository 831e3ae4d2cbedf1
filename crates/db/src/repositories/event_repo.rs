//! Repository for the `events` and `event_types` tables.

use sqlx::PgPool;

use docflow_core::types::DbId;

use crate::models::event::EventType;

/// Provides event-type lookup and event insertion.
pub struct EventRepo;

impl EventRepo {
    /// Look up an event type by its dot-separated name.
    pub async fn get_event_type_by_name(
        pool: &PgPool,
        name: &str,
    ) -> Result<Option<EventType>, sqlx::Error> {
        sqlx::query_as::<_, EventType>(
            "SELECT id, name, is_critical, created_at FROM event_types WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(pool)
        .await
    }

    /// Insert an event row, returning its ID.
    pub async fn insert(
        pool: &PgPool,
        event_type_id: DbId,
        source_entity_type: Option<&str>,
        source_entity_id: Option<DbId>,
        actor_user_id: Option<DbId>,
        payload: &serde_json::Value,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO events
                (event_type_id, source_entity_type, source_entity_id, actor_user_id, payload)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(event_type_id)
        .bind(source_entity_type)
        .bind(source_entity_id)
        .bind(actor_user_id)
        .bind(payload)
        .fetch_one(pool)
        .await
    }

    /// Most recent persisted event row of the given type.
    pub async fn find_latest_by_type(
        pool: &PgPool,
        event_type_name: &str,
    ) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT id FROM events \
             WHERE event_type_id = (SELECT id FROM event_types WHERE name = $1) \
             ORDER BY id DESC LIMIT 1",
        )
        .bind(event_type_name)
        .fetch_optional(pool)
        .await
    }
}
