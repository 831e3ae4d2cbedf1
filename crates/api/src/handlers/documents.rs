//! Handlers for the `/documents` resource: creation with an initial
//! file version, visibility-filtered listing, detail with workflow
//! state, version listing/upload, download, and guarded deletion.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use docflow_core::error::CoreError;
use docflow_core::roles::ROLE_ADMIN;
use docflow_core::status::{DocumentStatus, StepStatus};
use docflow_core::types::DbId;
use docflow_core::workflow::{
    self, StepSnapshot, WorkflowProgress, WorkflowSnapshot,
};
use docflow_core::visibility::document_visible;
use docflow_db::models::document::{CreateDocument, Document, DocumentDetail};
use docflow_db::models::document_version::CreateDocumentVersion;
use docflow_db::models::workflow::WorkflowDetail;
use docflow_db::repositories::{
    DocumentRepo, DocumentVersionRepo, WorkflowRepo,
};

use crate::engine::{FileUpload, WorkflowEngine};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Maximum accepted upload size (32 MiB).
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Build the per-request workflow engine from shared state.
pub fn engine(state: &AppState) -> WorkflowEngine {
    WorkflowEngine::new(
        state.pool.clone(),
        state.file_store.clone(),
        state.event_bus.clone(),
    )
}

/// Verify that a document exists, returning the full row.
pub async fn ensure_document_exists(
    pool: &sqlx::PgPool,
    id: DbId,
) -> AppResult<Document> {
    DocumentRepo::find_by_id(pool, id).await?.ok_or_else(|| {
        AppError::Core(CoreError::NotFound {
            entity: "Document",
            id,
        })
    })
}

/// Reject access to documents outside the user's departments.
async fn ensure_visible(
    state: &AppState,
    auth: &AuthUser,
    document: &Document,
) -> AppResult<Vec<DbId>> {
    let doc_departments = DocumentRepo::department_ids(&state.pool, document.id).await?;
    let engine = engine(state);
    let actor = engine.actor_context(auth).await?;
    if !document_visible(&actor.role, &actor.department_ids, &doc_departments) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Document is scoped to departments you do not belong to".into(),
        )));
    }
    Ok(doc_departments)
}

// ---------------------------------------------------------------------------
// Multipart parsing
// ---------------------------------------------------------------------------

/// Parsed parts of a document-scoped multipart body.
#[derive(Default)]
pub struct DocumentParts {
    pub metadata: Option<String>,
    pub comment: Option<String>,
    pub file: Option<FileUpload>,
}

/// Collect the known parts (`metadata`, `comment`, `file`) of a
/// multipart request body. Unknown parts are ignored.
pub async fn collect_parts(mut multipart: Multipart) -> AppResult<DocumentParts> {
    let mut parts = DocumentParts::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("metadata") => {
                parts.metadata = Some(field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Unreadable metadata part: {e}"))
                })?);
            }
            Some("comment") => {
                parts.comment = Some(field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Unreadable comment part: {e}"))
                })?);
            }
            Some("file") => {
                let file_name = field
                    .file_name()
                    .map(|s| s.to_string())
                    .ok_or_else(|| AppError::BadRequest("File part missing a filename".into()))?;
                let mime_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Unreadable file part: {e}")))?;
                if data.len() > MAX_UPLOAD_BYTES {
                    return Err(AppError::BadRequest(format!(
                        "Uploaded file exceeds the {MAX_UPLOAD_BYTES} byte limit"
                    )));
                }
                parts.file = Some(FileUpload {
                    file_name,
                    mime_type,
                    data: data.to_vec(),
                });
            }
            _ => {}
        }
    }

    Ok(parts)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/documents
///
/// Create a draft document from a multipart body: a `metadata` JSON
/// part and a `file` part for version 1.
pub async fn create_document(
    auth: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let parts = collect_parts(multipart).await?;

    let metadata = parts
        .metadata
        .ok_or_else(|| AppError::BadRequest("Missing metadata part".into()))?;
    let input: CreateDocument = serde_json::from_str(&metadata)
        .map_err(|e| AppError::BadRequest(format!("Invalid metadata JSON: {e}")))?;
    let upload = parts
        .file
        .ok_or_else(|| AppError::BadRequest("Missing file part".into()))?;

    if input.title.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Document title must not be empty".into(),
        )));
    }

    let mut tx = state.pool.begin().await?;
    let document = DocumentRepo::create(&mut tx, &input, auth.user_id).await?;
    DocumentRepo::set_departments(&mut tx, document.id, &input.department_ids).await?;

    // Version 1: persist the file first so a failed write aborts the
    // whole creation.
    let stored = state
        .file_store
        .save(document.id, &upload.file_name, &upload.data)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to store uploaded file: {e}")))?;
    let version = DocumentVersionRepo::create(
        &mut tx,
        &CreateDocumentVersion {
            document_id: document.id,
            file_name: stored.file_name.clone(),
            file_size_bytes: stored.file_size_bytes,
            mime_type: upload.mime_type.clone(),
            file_path: stored.file_path.clone(),
            created_by: auth.user_id,
        },
    )
    .await?;
    DocumentRepo::set_current_version(&mut tx, document.id, version.id).await?;

    if let Err(e) = tx.commit().await {
        state.file_store.remove(&stored.file_path).await;
        return Err(e.into());
    }

    tracing::info!(
        document_id = document.id,
        user_id = auth.user_id,
        "Document created"
    );

    let document = ensure_document_exists(&state.pool, document.id).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: document })))
}

/// GET /api/v1/documents
///
/// List documents visible to the requesting user, newest first.
pub async fn list_documents(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let documents = if auth.role == ROLE_ADMIN {
        DocumentRepo::list_all(&state.pool).await?
    } else {
        DocumentRepo::list_visible_to(&state.pool, auth.user_id).await?
    };
    Ok(Json(DataResponse { data: documents }))
}

/// GET /api/v1/documents/{id}
///
/// Document detail: row, departments, versions, workflow state, and
/// whether the requesting user may act on the current step.
pub async fn get_document(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let document = ensure_document_exists(&state.pool, id).await?;
    let department_ids = ensure_visible(&state, &auth, &document).await?;

    let versions = DocumentVersionRepo::list_for_document(&state.pool, id).await?;

    let engine = engine(&state);
    let actor = engine.actor_context(&auth).await?;

    let (workflow_detail, can_interact) =
        match WorkflowRepo::find_latest_instance(&state.pool, id).await? {
            Some(instance) => {
                let steps = WorkflowRepo::list_steps(&state.pool, instance.id).await?;

                let snapshot = WorkflowSnapshot {
                    instance_id: instance.id,
                    progress: WorkflowProgress::from_column(instance.current_step),
                    steps: steps
                        .iter()
                        .map(|s| {
                            Ok(StepSnapshot {
                                id: s.id,
                                step_order: s.step_order,
                                role: s.role.clone(),
                                department_id: s.department_id,
                                status: StepStatus::parse(&s.status).map_err(AppError::Core)?,
                                assigned_to: s.assigned_to,
                            })
                        })
                        .collect::<AppResult<Vec<_>>>()?,
                };
                let status = DocumentStatus::parse(&document.status).map_err(AppError::Core)?;
                let can_interact = instance.completed_at.is_none()
                    && workflow::can_interact(status, &snapshot, &actor);

                (Some(WorkflowDetail { instance, steps }), can_interact)
            }
            None => (None, false),
        };

    Ok(Json(DataResponse {
        data: DocumentDetail {
            document,
            department_ids,
            versions,
            workflow: workflow_detail,
            can_interact,
        },
    }))
}

/// DELETE /api/v1/documents/{id}
///
/// Delete a document. Authors may delete their own drafts; admins may
/// delete anything. Stored files are removed best-effort after the
/// database delete commits.
pub async fn delete_document(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let document = ensure_document_exists(&state.pool, id).await?;

    if auth.role != ROLE_ADMIN {
        if document.created_by != auth.user_id {
            return Err(AppError::Core(CoreError::Forbidden(
                "Only the document's author may delete it".into(),
            )));
        }
        if document.status != DocumentStatus::Draft.as_str() {
            return Err(AppError::Core(CoreError::InvalidState(format!(
                "Only draft documents can be deleted (current status: {})",
                document.status
            ))));
        }
    }

    let file_paths = DocumentVersionRepo::file_paths_for_document(&state.pool, id).await?;
    DocumentRepo::delete(&state.pool, id).await?;

    for path in &file_paths {
        state.file_store.remove(path).await;
    }

    tracing::info!(document_id = id, user_id = auth.user_id, "Document deleted");

    Ok(Json(DataResponse {
        data: serde_json::json!({ "deleted": true }),
    }))
}

/// GET /api/v1/documents/{id}/versions
///
/// List a document's versions, newest first.
pub async fn list_versions(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let document = ensure_document_exists(&state.pool, id).await?;
    ensure_visible(&state, &auth, &document).await?;

    let versions = DocumentVersionRepo::list_for_document(&state.pool, id).await?;
    Ok(Json(DataResponse { data: versions }))
}

/// POST /api/v1/documents/{id}/versions
///
/// Author re-upload while the document is editable; multipart with a
/// `file` part.
pub async fn upload_version(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let parts = collect_parts(multipart).await?;
    let upload = parts
        .file
        .ok_or_else(|| AppError::BadRequest("Missing file part".into()))?;

    let version = engine(&state).add_version(id, &auth, upload).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: version })))
}

/// Query parameters for downloads.
#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    /// Specific version number; defaults to the current version.
    pub version: Option<i32>,
}

/// GET /api/v1/documents/{id}/download
///
/// Stream the current (or a specific) version's file.
pub async fn download_version(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(query): Query<DownloadQuery>,
) -> AppResult<impl IntoResponse> {
    let document = ensure_document_exists(&state.pool, id).await?;
    ensure_visible(&state, &auth, &document).await?;

    let version = match query.version {
        Some(number) => DocumentVersionRepo::find_by_number(&state.pool, id, number).await?,
        None => match document.current_version_id {
            Some(version_id) => DocumentVersionRepo::find_by_id(&state.pool, version_id).await?,
            None => None,
        },
    }
    .ok_or_else(|| {
        AppError::Core(CoreError::NotFound {
            entity: "DocumentVersion",
            id,
        })
    })?;

    let bytes = state
        .file_store
        .read(&version.file_path)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to read stored file: {e}")))?;

    let headers = [
        (header::CONTENT_TYPE, version.mime_type.clone()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", version.file_name),
        ),
    ];

    Ok((headers, bytes))
}
