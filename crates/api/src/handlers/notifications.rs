//! Handlers for the `/notifications` resource.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use docflow_core::error::CoreError;
use docflow_core::types::DbId;
use docflow_db::repositories::NotificationRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Default page size for notification listings.
const DEFAULT_LIMIT: i64 = 50;

/// Maximum page size for notification listings.
const MAX_LIMIT: i64 = 200;

/// Query parameters for `GET /notifications`.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

/// GET /api/v1/notifications
///
/// List the requesting user's notifications, newest first.
pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<impl IntoResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let notifications =
        NotificationRepo::list_for_user(&state.pool, auth.user_id, limit).await?;
    Ok(Json(DataResponse { data: notifications }))
}

/// POST /api/v1/notifications/{id}/read
///
/// Mark one of the user's notifications as read.
pub async fn mark_read(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let updated = NotificationRepo::mark_read(&state.pool, id, auth.user_id).await?;
    if !updated {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Notification",
            id,
        }));
    }
    Ok(Json(DataResponse {
        data: serde_json::json!({ "read": true }),
    }))
}
