use std::sync::Arc;

use crate::config::ServerConfig;
use crate::files::FileStore;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: docflow_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Document file storage.
    pub file_store: Arc<FileStore>,
    /// Centralized event bus for publishing platform events.
    pub event_bus: Arc<docflow_events::EventBus>,
}
