//! Event-to-notification routing engine.
//!
//! [`NotificationRouter`] subscribes to the platform event bus and
//! fans each event out to the affected users as in-app notification
//! rows. Delivery is strictly best-effort: every failure is logged and
//! swallowed, and can never affect the workflow transition that
//! published the event.

use tokio::sync::broadcast;

use docflow_core::channels::CHANNEL_IN_APP;
use docflow_core::types::DbId;
use docflow_db::repositories::{
    DepartmentRepo, DocumentRepo, EventRepo, NotificationRepo, WorkflowRepo,
};
use docflow_db::DbPool;
use docflow_events::{types as events, PlatformEvent};

/// Routes platform events to user notifications.
///
/// Consumes events from the broadcast channel and, for each event,
/// determines the target users and inserts `notifications` rows.
pub struct NotificationRouter {
    pool: DbPool,
}

impl NotificationRouter {
    /// Create a new router with the given database pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Run the main routing loop.
    ///
    /// Subscribes to the event bus via `receiver` and processes each
    /// event. The loop exits when the channel is closed (i.e. the
    /// [`EventBus`](docflow_events::EventBus) is dropped).
    pub async fn run(self, mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = self.route_event(&event).await {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            "Failed to route event"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification router shutting down");
                    break;
                }
            }
        }
    }

    /// Route a single event to all affected users.
    async fn route_event(&self, event: &PlatformEvent) -> Result<(), sqlx::Error> {
        let mut targets = self.determine_targets(event).await?;
        targets.sort_unstable();
        targets.dedup();
        // The actor already knows what they did.
        if let Some(actor) = event.actor_user_id {
            targets.retain(|&id| id != actor);
        }

        if targets.is_empty() {
            return Ok(());
        }

        // The persistence service writes events asynchronously, so
        // there is a small window where the row may not exist yet. In
        // that case the notification is skipped.
        let Some(event_id) = EventRepo::find_latest_by_type(&self.pool, &event.event_type).await?
        else {
            tracing::debug!(
                event_type = %event.event_type,
                "No persisted event row yet, skipping notifications"
            );
            return Ok(());
        };

        for user_id in targets {
            if let Err(e) =
                NotificationRepo::create(&self.pool, event_id, user_id, CHANNEL_IN_APP).await
            {
                tracing::warn!(user_id, error = %e, "Failed to create notification");
            }
        }

        Ok(())
    }

    /// Determine which users should be notified for an event.
    async fn determine_targets(&self, event: &PlatformEvent) -> Result<Vec<DbId>, sqlx::Error> {
        let Some(document_id) = event.source_entity_id else {
            return Ok(vec![]);
        };

        match event.event_type.as_str() {
            // A step needs action: notify whoever can act on the
            // now-current step.
            events::DOCUMENT_SUBMITTED | events::DOCUMENT_STEP_APPROVED => {
                let mut targets = self.current_step_actors(document_id).await?;
                // Mid-review progress also interests the author.
                if event.event_type == events::DOCUMENT_STEP_APPROVED {
                    targets.extend(self.document_owner(document_id).await?);
                }
                Ok(targets)
            }

            // Terminal / author-facing outcomes: notify the owner.
            events::DOCUMENT_CHANGES_REQUESTED
            | events::DOCUMENT_APPROVED
            | events::DOCUMENT_FINALIZED
            | events::DOCUMENT_VERSION_ADDED => self.document_owner(document_id).await,

            _ => Ok(vec![]),
        }
    }

    /// The document's author, if the document still exists.
    async fn document_owner(&self, document_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        Ok(DocumentRepo::find_by_id(&self.pool, document_id)
            .await?
            .map(|d| d.created_by)
            .into_iter()
            .collect())
    }

    /// Users eligible to act on the document's current step: the
    /// explicit assignee when set, otherwise every active user holding
    /// the step's role (within the step's department, when scoped).
    async fn current_step_actors(&self, document_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        let Some(instance) = WorkflowRepo::find_active_instance(&self.pool, document_id).await?
        else {
            return Ok(vec![]);
        };
        let Some(current) = instance.current_step else {
            return Ok(vec![]);
        };

        let steps = WorkflowRepo::list_steps(&self.pool, instance.id).await?;
        let Some(step) = steps.iter().find(|s| s.step_order == current) else {
            return Ok(vec![]);
        };

        if let Some(assignee) = step.assigned_to {
            return Ok(vec![assignee]);
        }

        match step.department_id {
            Some(department_id) => {
                DepartmentRepo::user_ids_with_role(&self.pool, department_id, &step.role).await
            }
            None => DepartmentRepo::user_ids_with_role_anywhere(&self.pool, &step.role).await,
        }
    }
}
