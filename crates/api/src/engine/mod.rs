//! Workflow engine: drives document approval transitions.
//!
//! Each public method is one request-scoped transition: load the
//! document and its workflow state fresh, let `docflow_core::workflow`
//! validate and resolve the transition, apply every resulting write in
//! a single transaction (with optimistic `row_version` guards), and
//! publish platform events only after the commit. Notification fan-out
//! happens downstream on the event bus and can never fail a transition.

use std::sync::Arc;

use docflow_core::error::CoreError;
use docflow_core::roles::step_policy;
use docflow_core::status::{DocumentStatus, StepStatus};
use docflow_core::types::DbId;
use docflow_core::workflow::{
    self, ActorContext, StepResolution, StepSnapshot, StepSpec, WorkflowProgress, WorkflowSnapshot,
};
use docflow_db::models::document::Document;
use docflow_db::models::workflow::{WorkflowDetail, WorkflowInstance};
use docflow_db::repositories::{
    DepartmentRepo, DocumentRepo, DocumentVersionRepo, WorkflowRepo,
};
use docflow_db::DbPool;
use docflow_events::{types as events, EventBus, PlatformEvent};

use docflow_db::models::document_version::{CreateDocumentVersion, DocumentVersion};

use crate::error::{AppError, AppResult};
use crate::files::FileStore;
use crate::middleware::auth::AuthUser;

/// An uploaded file carried into a transition, already read out of the
/// multipart body.
#[derive(Debug)]
pub struct FileUpload {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// The workflow state loaded for one transition.
struct LoadedWorkflow {
    instance: WorkflowInstance,
    snapshot: WorkflowSnapshot,
}

/// Drives all workflow transitions for documents.
///
/// Cheap to construct per request from [`AppState`](crate::state::AppState)
/// members.
pub struct WorkflowEngine {
    pool: DbPool,
    file_store: Arc<FileStore>,
    event_bus: Arc<EventBus>,
}

impl WorkflowEngine {
    pub fn new(pool: DbPool, file_store: Arc<FileStore>, event_bus: Arc<EventBus>) -> Self {
        Self {
            pool,
            file_store,
            event_bus,
        }
    }

    /* ----------------------------------------------------------------
    Loading helpers
    ---------------------------------------------------------------- */

    /// Resolve the acting user's department memberships.
    pub async fn actor_context(&self, auth: &AuthUser) -> AppResult<ActorContext> {
        let department_ids =
            DepartmentRepo::department_ids_for_user(&self.pool, auth.user_id).await?;
        Ok(ActorContext {
            user_id: auth.user_id,
            role: auth.role.clone(),
            department_ids,
        })
    }

    async fn load_document(&self, document_id: DbId) -> AppResult<Document> {
        DocumentRepo::find_by_id(&self.pool, document_id)
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::NotFound {
                    entity: "Document",
                    id: document_id,
                })
            })
    }

    /// Load the active instance and its steps as a core snapshot.
    async fn load_active_workflow(&self, document_id: DbId) -> AppResult<Option<LoadedWorkflow>> {
        let Some(instance) = WorkflowRepo::find_active_instance(&self.pool, document_id).await?
        else {
            return Ok(None);
        };

        let steps = WorkflowRepo::list_steps(&self.pool, instance.id).await?;
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

        Ok(Some(LoadedWorkflow { instance, snapshot }))
    }

    /// The active workflow, or `InvalidState` when there is none.
    async fn require_active_workflow(&self, document_id: DbId) -> AppResult<LoadedWorkflow> {
        self.load_active_workflow(document_id).await?.ok_or_else(|| {
            AppError::Core(CoreError::InvalidState(
                "Document has no active workflow".into(),
            ))
        })
    }

    /// Instance plus steps in API response shape.
    async fn workflow_detail(&self, instance_id: DbId, document_id: DbId) -> AppResult<WorkflowDetail> {
        let instance = WorkflowRepo::find_latest_instance(&self.pool, document_id)
            .await?
            .filter(|i| i.id == instance_id)
            .ok_or_else(|| {
                AppError::Core(CoreError::NotFound {
                    entity: "WorkflowInstance",
                    id: instance_id,
                })
            })?;
        let steps = WorkflowRepo::list_steps(&self.pool, instance.id).await?;
        Ok(WorkflowDetail { instance, steps })
    }

    /// Only the document's author (or an admin) may drive its drafting
    /// lifecycle: submit, resubmit, timeline, version uploads.
    fn ensure_author_or_admin(document: &Document, actor: &ActorContext) -> AppResult<()> {
        if actor.is_admin() || document.created_by == actor.user_id {
            Ok(())
        } else {
            Err(AppError::Core(CoreError::Forbidden(
                "Only the document's author may do this".into(),
            )))
        }
    }

    fn stale_write() -> AppError {
        AppError::Core(CoreError::Conflict(
            "Document was modified concurrently; reload and retry".into(),
        ))
    }

    /* ----------------------------------------------------------------
    Transitions
    ---------------------------------------------------------------- */

    /// Submit a draft document for review.
    ///
    /// Creates the workflow instance at step 1 from the pre-configured
    /// timeline (or a single default approver step) and moves the
    /// document to `for_review`.
    pub async fn submit(&self, document_id: DbId, auth: &AuthUser) -> AppResult<WorkflowDetail> {
        let actor = self.actor_context(auth).await?;
        let document = self.load_document(document_id).await?;
        Self::ensure_author_or_admin(&document, &actor)?;

        let status = DocumentStatus::parse(&document.status).map_err(AppError::Core)?;
        let has_instance = WorkflowRepo::find_latest_instance(&self.pool, document_id)
            .await?
            .is_some();
        workflow::validate_submit(status, has_instance).map_err(AppError::Core)?;

        let mut specs = WorkflowRepo::get_timeline(&self.pool, document_id).await?;
        if specs.is_empty() {
            specs = workflow::default_timeline(&actor);
        }
        workflow::validate_timeline(&specs).map_err(AppError::Core)?;

        let mut tx = self.pool.begin().await?;
        let instance =
            WorkflowRepo::create_instance_with_steps(&mut tx, document_id, &specs).await?;
        let updated = DocumentRepo::update_status(
            &mut tx,
            document.id,
            document.row_version,
            DocumentStatus::ForReview.as_str(),
        )
        .await?;
        if !updated {
            return Err(Self::stale_write());
        }
        tx.commit().await?;

        tracing::info!(
            document_id,
            instance_id = instance.id,
            user_id = auth.user_id,
            steps = specs.len(),
            "Document submitted for review"
        );

        self.event_bus.publish(
            PlatformEvent::new(events::DOCUMENT_SUBMITTED)
                .with_source("document", document_id)
                .with_actor(auth.user_id)
                .with_payload(serde_json::json!({
                    "document_id": document_id,
                    "title": document.title,
                })),
        );

        self.workflow_detail(instance.id, document_id).await
    }

    /// Return a `changes_requested` document to review.
    ///
    /// The instance is untouched: the same step is revisited.
    pub async fn resubmit(&self, document_id: DbId, auth: &AuthUser) -> AppResult<Document> {
        let actor = self.actor_context(auth).await?;
        let document = self.load_document(document_id).await?;
        Self::ensure_author_or_admin(&document, &actor)?;

        let status = DocumentStatus::parse(&document.status).map_err(AppError::Core)?;
        workflow::validate_resubmit(status).map_err(AppError::Core)?;
        self.require_active_workflow(document_id).await?;

        let mut tx = self.pool.begin().await?;
        let updated = DocumentRepo::update_status(
            &mut tx,
            document.id,
            document.row_version,
            DocumentStatus::ForReview.as_str(),
        )
        .await?;
        if !updated {
            return Err(Self::stale_write());
        }
        tx.commit().await?;

        tracing::info!(document_id, user_id = auth.user_id, "Document resubmitted");

        self.event_bus.publish(
            PlatformEvent::new(events::DOCUMENT_SUBMITTED)
                .with_source("document", document_id)
                .with_actor(auth.user_id)
                .with_payload(serde_json::json!({
                    "document_id": document_id,
                    "title": document.title,
                    "resubmitted": true,
                })),
        );

        self.load_document(document_id).await
    }

    /// Approve the current step.
    pub async fn approve(
        &self,
        document_id: DbId,
        auth: &AuthUser,
        comment: Option<String>,
    ) -> AppResult<WorkflowDetail> {
        self.complete_current_step(document_id, auth, comment, None, false)
            .await
    }

    /// Complete the current step, optionally attaching a new file
    /// version, enforcing the per-role file/comment policy.
    pub async fn complete_step(
        &self,
        document_id: DbId,
        auth: &AuthUser,
        comment: Option<String>,
        file: Option<FileUpload>,
    ) -> AppResult<WorkflowDetail> {
        self.complete_current_step(document_id, auth, comment, file, true)
            .await
    }

    /// Shared implementation of approve / complete-step.
    ///
    /// `enforce_policy` is set for `complete_step`, whose per-role
    /// requirements go beyond plain approval.
    async fn complete_current_step(
        &self,
        document_id: DbId,
        auth: &AuthUser,
        comment: Option<String>,
        file: Option<FileUpload>,
        enforce_policy: bool,
    ) -> AppResult<WorkflowDetail> {
        let actor = self.actor_context(auth).await?;
        let document = self.load_document(document_id).await?;
        let status = DocumentStatus::parse(&document.status).map_err(AppError::Core)?;
        let loaded = self.require_active_workflow(document_id).await?;

        let resolution = workflow::resolve_approval(status, &loaded.snapshot, &actor)
            .map_err(AppError::Core)?;

        if enforce_policy {
            // Policy is keyed by the step's required role, not the
            // actor's (an admin completing an editor step still owes
            // the file).
            let step = loaded.snapshot.current_step().map_err(AppError::Core)?;
            let policy = step_policy(&step.role);
            if policy.file_required && file.is_none() {
                return Err(AppError::Core(CoreError::Validation(format!(
                    "Completing a '{}' step requires a file upload",
                    step.role
                ))));
            }
            let has_comment = comment
                .as_deref()
                .is_some_and(|c| !c.trim().is_empty());
            if policy.comment_required && !has_comment {
                return Err(AppError::Core(CoreError::Validation(format!(
                    "Completing a '{}' step requires a comment",
                    step.role
                ))));
            }
        }

        // Persist the file before touching workflow state: if the
        // write fails the step must not complete.
        let stored = match &file {
            Some(upload) => Some(
                self.file_store
                    .save(document_id, &upload.file_name, &upload.data)
                    .await
                    .map_err(|e| {
                        AppError::InternalError(format!("Failed to store uploaded file: {e}"))
                    })?,
            ),
            None => None,
        };

        let result = self
            .apply_step_completion(
                &document,
                &loaded,
                &resolution,
                &actor,
                comment.as_deref(),
                stored.as_ref().zip(file.as_ref()),
            )
            .await;

        let version = match result {
            Ok(version) => version,
            Err(e) => {
                // The transition rolled back; do not leak the file.
                if let Some(s) = &stored {
                    self.file_store.remove(&s.file_path).await;
                }
                return Err(e);
            }
        };

        let (completed_step_id, workflow_done) = match resolution {
            StepResolution::Advanced {
                completed_step_id, ..
            } => (completed_step_id, false),
            StepResolution::WorkflowCompleted { completed_step_id } => (completed_step_id, true),
        };

        tracing::info!(
            document_id,
            instance_id = loaded.instance.id,
            step_id = completed_step_id,
            user_id = auth.user_id,
            workflow_done,
            "Workflow step completed"
        );

        if let Some(v) = &version {
            self.event_bus.publish(
                PlatformEvent::new(events::DOCUMENT_VERSION_ADDED)
                    .with_source("document", document_id)
                    .with_actor(auth.user_id)
                    .with_payload(serde_json::json!({
                        "document_id": document_id,
                        "version_number": v.version_number,
                    })),
            );
        }

        let event_type = if workflow_done {
            events::DOCUMENT_APPROVED
        } else {
            events::DOCUMENT_STEP_APPROVED
        };
        self.event_bus.publish(
            PlatformEvent::new(event_type)
                .with_source("document", document_id)
                .with_actor(auth.user_id)
                .with_payload(serde_json::json!({
                    "document_id": document_id,
                    "title": document.title,
                })),
        );

        self.workflow_detail(loaded.instance.id, document_id).await
    }

    /// The transactional tail of a step completion.
    async fn apply_step_completion(
        &self,
        document: &Document,
        loaded: &LoadedWorkflow,
        resolution: &StepResolution,
        actor: &ActorContext,
        comment: Option<&str>,
        stored_file: Option<(&crate::files::StoredFile, &FileUpload)>,
    ) -> AppResult<Option<DocumentVersion>> {
        let mut tx = self.pool.begin().await?;

        let version = match stored_file {
            Some((stored, upload)) => {
                let version = DocumentVersionRepo::create(
                    &mut tx,
                    &CreateDocumentVersion {
                        document_id: document.id,
                        file_name: stored.file_name.clone(),
                        file_size_bytes: stored.file_size_bytes,
                        mime_type: upload.mime_type.clone(),
                        file_path: stored.file_path.clone(),
                        created_by: actor.user_id,
                    },
                )
                .await?;
                DocumentRepo::set_current_version(&mut tx, document.id, version.id).await?;
                Some(version)
            }
            None => None,
        };

        match resolution {
            StepResolution::Advanced {
                completed_step_id,
                next_step_order,
            } => {
                WorkflowRepo::mark_step_completed(&mut tx, *completed_step_id, actor.user_id, comment)
                    .await?;
                let moved = WorkflowRepo::advance_pointer(
                    &mut tx,
                    loaded.instance.id,
                    loaded.instance.row_version,
                    *next_step_order,
                )
                .await?;
                if !moved {
                    return Err(Self::stale_write());
                }
                // A mid-review approval of a changes_requested document
                // returns it to review.
                if document.status != DocumentStatus::ForReview.as_str() {
                    let updated = DocumentRepo::update_status(
                        &mut tx,
                        document.id,
                        document.row_version,
                        DocumentStatus::ForReview.as_str(),
                    )
                    .await?;
                    if !updated {
                        return Err(Self::stale_write());
                    }
                }
            }
            StepResolution::WorkflowCompleted { completed_step_id } => {
                WorkflowRepo::mark_step_completed(&mut tx, *completed_step_id, actor.user_id, comment)
                    .await?;
                let done = WorkflowRepo::complete_instance(
                    &mut tx,
                    loaded.instance.id,
                    loaded.instance.row_version,
                )
                .await?;
                if !done {
                    return Err(Self::stale_write());
                }
                let updated = DocumentRepo::update_status(
                    &mut tx,
                    document.id,
                    document.row_version,
                    DocumentStatus::Approved.as_str(),
                )
                .await?;
                if !updated {
                    return Err(Self::stale_write());
                }
            }
        }

        tx.commit().await?;
        Ok(version)
    }

    /// Send the document back to its author for changes.
    ///
    /// Resets the current step to `pending` with the rejection comment;
    /// the pointer does not move.
    pub async fn request_changes(
        &self,
        document_id: DbId,
        auth: &AuthUser,
        comment: String,
    ) -> AppResult<WorkflowDetail> {
        let actor = self.actor_context(auth).await?;
        let document = self.load_document(document_id).await?;
        let status = DocumentStatus::parse(&document.status).map_err(AppError::Core)?;
        let loaded = self.require_active_workflow(document_id).await?;

        let step_id = workflow::resolve_change_request(status, &loaded.snapshot, &actor, &comment)
            .map_err(AppError::Core)?;

        let mut tx = self.pool.begin().await?;
        WorkflowRepo::reset_step(&mut tx, step_id, &comment).await?;
        let updated = DocumentRepo::update_status(
            &mut tx,
            document.id,
            document.row_version,
            DocumentStatus::ChangesRequested.as_str(),
        )
        .await?;
        if !updated {
            return Err(Self::stale_write());
        }
        tx.commit().await?;

        tracing::info!(
            document_id,
            step_id,
            user_id = auth.user_id,
            "Changes requested"
        );

        self.event_bus.publish(
            PlatformEvent::new(events::DOCUMENT_CHANGES_REQUESTED)
                .with_source("document", document_id)
                .with_actor(auth.user_id)
                .with_payload(serde_json::json!({
                    "document_id": document_id,
                    "title": document.title,
                    "comment": comment,
                })),
        );

        self.workflow_detail(loaded.instance.id, document_id).await
    }

    /// Configure (or replace) the approval timeline of a draft document.
    pub async fn configure_timeline(
        &self,
        document_id: DbId,
        auth: &AuthUser,
        specs: Vec<StepSpec>,
    ) -> AppResult<()> {
        let actor = self.actor_context(auth).await?;
        let document = self.load_document(document_id).await?;
        Self::ensure_author_or_admin(&document, &actor)?;

        let status = DocumentStatus::parse(&document.status).map_err(AppError::Core)?;
        if status != DocumentStatus::Draft {
            return Err(AppError::Core(CoreError::InvalidState(format!(
                "Timelines can only be configured on draft documents (current status: {})",
                status.as_str()
            ))));
        }
        if WorkflowRepo::find_latest_instance(&self.pool, document_id)
            .await?
            .is_some()
        {
            return Err(AppError::Core(CoreError::InvalidState(
                "Document already has a workflow instance; its timeline is fixed".into(),
            )));
        }

        workflow::validate_timeline(&specs).map_err(AppError::Core)?;

        let mut tx = self.pool.begin().await?;
        WorkflowRepo::replace_timeline(&mut tx, document_id, &specs).await?;
        tx.commit().await?;

        tracing::info!(document_id, steps = specs.len(), "Timeline configured");
        Ok(())
    }

    /// Append a new file version outside of step completion.
    ///
    /// Allowed for the author (or admin) while the document is editable
    /// (`draft` or `changes_requested`).
    pub async fn add_version(
        &self,
        document_id: DbId,
        auth: &AuthUser,
        upload: FileUpload,
    ) -> AppResult<DocumentVersion> {
        let actor = self.actor_context(auth).await?;
        let document = self.load_document(document_id).await?;
        Self::ensure_author_or_admin(&document, &actor)?;

        let status = DocumentStatus::parse(&document.status).map_err(AppError::Core)?;
        if !matches!(
            status,
            DocumentStatus::Draft | DocumentStatus::ChangesRequested
        ) {
            return Err(AppError::Core(CoreError::InvalidState(format!(
                "New versions can only be uploaded while the document is editable (current status: {})",
                status.as_str()
            ))));
        }

        let stored = self
            .file_store
            .save(document_id, &upload.file_name, &upload.data)
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to store uploaded file: {e}")))?;

        let mut tx = self.pool.begin().await?;
        let version = DocumentVersionRepo::create(
            &mut tx,
            &CreateDocumentVersion {
                document_id,
                file_name: stored.file_name.clone(),
                file_size_bytes: stored.file_size_bytes,
                mime_type: upload.mime_type.clone(),
                file_path: stored.file_path.clone(),
                created_by: auth.user_id,
            },
        )
        .await?;
        DocumentRepo::set_current_version(&mut tx, document_id, version.id).await?;
        tx.commit().await?;

        tracing::info!(
            document_id,
            version_number = version.version_number,
            user_id = auth.user_id,
            "Document version added"
        );

        self.event_bus.publish(
            PlatformEvent::new(events::DOCUMENT_VERSION_ADDED)
                .with_source("document", document_id)
                .with_actor(auth.user_id)
                .with_payload(serde_json::json!({
                    "document_id": document_id,
                    "version_number": version.version_number,
                })),
        );

        Ok(version)
    }

    /// Admin-only terminal lock on an approved document.
    pub async fn finalize(&self, document_id: DbId, auth: &AuthUser) -> AppResult<Document> {
        let document = self.load_document(document_id).await?;
        let status = DocumentStatus::parse(&document.status).map_err(AppError::Core)?;
        if status != DocumentStatus::Approved {
            return Err(AppError::Core(CoreError::InvalidState(format!(
                "Only approved documents can be finalized (current status: {})",
                status.as_str()
            ))));
        }

        let mut tx = self.pool.begin().await?;
        let updated = DocumentRepo::update_status(
            &mut tx,
            document.id,
            document.row_version,
            DocumentStatus::Final.as_str(),
        )
        .await?;
        if !updated {
            return Err(Self::stale_write());
        }
        tx.commit().await?;

        tracing::info!(document_id, user_id = auth.user_id, "Document finalized");

        self.event_bus.publish(
            PlatformEvent::new(events::DOCUMENT_FINALIZED)
                .with_source("document", document_id)
                .with_actor(auth.user_id)
                .with_payload(serde_json::json!({
                    "document_id": document_id,
                    "title": document.title,
                })),
        );

        self.load_document(document_id).await
    }
}
