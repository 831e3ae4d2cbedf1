//! Route definitions for in-app notifications.
//!
//! ```text
//! GET    /              list_notifications
//! POST   /{id}/read     mark_read
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::notifications;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(notifications::list_notifications))
        .route("/{id}/read", post(notifications::mark_read))
}
