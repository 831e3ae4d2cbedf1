//! Notification entity models.

use serde::Serialize;
use sqlx::FromRow;

use docflow_core::types::{DbId, Timestamp};

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub event_id: DbId,
    pub user_id: DbId,
    pub channel: String,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// A notification joined with its event for list responses.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationWithEvent {
    pub id: DbId,
    pub event_id: DbId,
    pub user_id: DbId,
    pub channel: String,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
    /// Dot-separated event name, e.g. `"document.approved"`.
    pub event_type: String,
    pub payload: serde_json::Value,
}
