//! Handlers for workflow transitions on a document: submit, resubmit,
//! approve, request-changes, complete-step, timeline configuration,
//! and finalization.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use docflow_core::types::DbId;
use docflow_core::workflow::StepSpec;
use docflow_db::models::workflow::ConfigureTimeline;

use crate::error::AppResult;
use crate::handlers::documents::{collect_parts, engine};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /documents/{id}/approve`.
#[derive(Debug, Default, Deserialize)]
pub struct ApproveRequest {
    pub comment: Option<String>,
}

/// Request body for `POST /documents/{id}/request-changes`.
#[derive(Debug, Deserialize)]
pub struct RequestChangesRequest {
    pub comment: String,
}

/// POST /api/v1/documents/{id}/submit
///
/// Submit a draft for review, creating its workflow instance.
pub async fn submit(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let detail = engine(&state).submit(id, &auth).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: detail })))
}

/// POST /api/v1/documents/{id}/resubmit
///
/// Return a changes-requested document to review; the current step is
/// revisited.
pub async fn resubmit(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let document = engine(&state).resubmit(id, &auth).await?;
    Ok(Json(DataResponse { data: document }))
}

/// POST /api/v1/documents/{id}/approve
///
/// Approve the current step with an optional comment.
pub async fn approve(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ApproveRequest>,
) -> AppResult<impl IntoResponse> {
    let detail = engine(&state).approve(id, &auth, input.comment).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// POST /api/v1/documents/{id}/request-changes
///
/// Reject the current step back to the author with a required comment.
pub async fn request_changes(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<RequestChangesRequest>,
) -> AppResult<impl IntoResponse> {
    let detail = engine(&state)
        .request_changes(id, &auth, input.comment)
        .await?;
    Ok(Json(DataResponse { data: detail }))
}

/// POST /api/v1/documents/{id}/complete-step
///
/// Complete the current step, optionally attaching a new file version.
/// Multipart body: optional `comment` text part, optional `file` part;
/// the step role's policy decides which are required.
pub async fn complete_step(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let parts = collect_parts(multipart).await?;
    let detail = engine(&state)
        .complete_step(id, &auth, parts.comment, parts.file)
        .await?;
    Ok(Json(DataResponse { data: detail }))
}

/// PUT /api/v1/documents/{id}/timeline
///
/// Configure the ordered approval steps of a draft document.
pub async fn configure_timeline(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ConfigureTimeline>,
) -> AppResult<impl IntoResponse> {
    let specs: Vec<StepSpec> = input
        .steps
        .into_iter()
        .map(|s| StepSpec {
            role: s.role,
            department_id: s.department_id,
            assigned_to: s.assigned_to,
        })
        .collect();

    engine(&state).configure_timeline(id, &auth, specs).await?;

    Ok(Json(DataResponse {
        data: serde_json::json!({ "configured": true }),
    }))
}

/// POST /api/v1/documents/{id}/finalize
///
/// Admin-only terminal lock on an approved document.
pub async fn finalize(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let document = engine(&state).finalize(id, &admin).await?;
    Ok(Json(DataResponse { data: document }))
}
