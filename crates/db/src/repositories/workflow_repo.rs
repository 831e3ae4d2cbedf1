//! Repository for the `workflow_instances` and `workflow_steps` tables.
//!
//! Mutations that form a workflow transition accept `&mut PgConnection`
//! so the engine can apply a whole transition (step completion, pointer
//! movement, document status) in one transaction. Pointer updates carry
//! the instance's optimistic `row_version` guard.

use sqlx::{PgConnection, PgPool};

use docflow_core::types::DbId;
use docflow_core::workflow::StepSpec;

use crate::models::workflow::{WorkflowInstance, WorkflowStep};

/// Column list for workflow_instances queries.
const INSTANCE_COLUMNS: &str =
    "id, document_id, current_step, row_version, started_at, completed_at";

/// Column list for workflow_steps queries.
const STEP_COLUMNS: &str = "id, instance_id, step_order, role, department_id, \
    status, assigned_to, comment, completed_at, created_at";

/// Provides instance/step loading and transactional transition writes.
pub struct WorkflowRepo;

impl WorkflowRepo {
    /// The document's active (non-completed) workflow instance, if any.
    pub async fn find_active_instance(
        pool: &PgPool,
        document_id: DbId,
    ) -> Result<Option<WorkflowInstance>, sqlx::Error> {
        let query = format!(
            "SELECT {INSTANCE_COLUMNS} FROM workflow_instances
             WHERE document_id = $1 AND completed_at IS NULL"
        );
        sqlx::query_as::<_, WorkflowInstance>(&query)
            .bind(document_id)
            .fetch_optional(pool)
            .await
    }

    /// The document's most recent instance regardless of completion.
    pub async fn find_latest_instance(
        pool: &PgPool,
        document_id: DbId,
    ) -> Result<Option<WorkflowInstance>, sqlx::Error> {
        let query = format!(
            "SELECT {INSTANCE_COLUMNS} FROM workflow_instances
             WHERE document_id = $1
             ORDER BY started_at DESC, id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, WorkflowInstance>(&query)
            .bind(document_id)
            .fetch_optional(pool)
            .await
    }

    /// All steps of an instance, ordered by `step_order` ascending.
    pub async fn list_steps(
        pool: &PgPool,
        instance_id: DbId,
    ) -> Result<Vec<WorkflowStep>, sqlx::Error> {
        let query = format!(
            "SELECT {STEP_COLUMNS} FROM workflow_steps
             WHERE instance_id = $1
             ORDER BY step_order ASC"
        );
        sqlx::query_as::<_, WorkflowStep>(&query)
            .bind(instance_id)
            .fetch_all(pool)
            .await
    }

    /// Create an instance at step 1 with the given timeline.
    ///
    /// Step orders are assigned from list position (1-based).
    pub async fn create_instance_with_steps(
        conn: &mut PgConnection,
        document_id: DbId,
        specs: &[StepSpec],
    ) -> Result<WorkflowInstance, sqlx::Error> {
        let query = format!(
            "INSERT INTO workflow_instances (document_id, current_step)
             VALUES ($1, 1)
             RETURNING {INSTANCE_COLUMNS}"
        );
        let instance = sqlx::query_as::<_, WorkflowInstance>(&query)
            .bind(document_id)
            .fetch_one(&mut *conn)
            .await?;

        for (index, spec) in specs.iter().enumerate() {
            sqlx::query(
                "INSERT INTO workflow_steps
                    (instance_id, step_order, role, department_id, assigned_to)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(instance.id)
            .bind(index as i32 + 1)
            .bind(&spec.role)
            .bind(spec.department_id)
            .bind(spec.assigned_to)
            .execute(&mut *conn)
            .await?;
        }

        Ok(instance)
    }

    /// Mark a step completed with an optional comment.
    pub async fn mark_step_completed(
        conn: &mut PgConnection,
        step_id: DbId,
        actor_id: DbId,
        comment: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE workflow_steps SET status = 'completed', assigned_to = $2, \
             comment = COALESCE($3, comment), completed_at = NOW() \
             WHERE id = $1",
        )
        .bind(step_id)
        .bind(actor_id)
        .bind(comment)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Reset a step to pending with the rejection comment attached.
    pub async fn reset_step(
        conn: &mut PgConnection,
        step_id: DbId,
        comment: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE workflow_steps SET status = 'pending', comment = $2, completed_at = NULL \
             WHERE id = $1",
        )
        .bind(step_id)
        .bind(comment)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Guarded pointer move to the given step order. Returns `false`
    /// when the expected `row_version` is stale.
    pub async fn advance_pointer(
        conn: &mut PgConnection,
        instance_id: DbId,
        expected_row_version: i32,
        next_step_order: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE workflow_instances SET current_step = $3, row_version = row_version + 1 \
             WHERE id = $1 AND row_version = $2",
        )
        .bind(instance_id)
        .bind(expected_row_version)
        .bind(next_step_order)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace a document's pre-configured timeline.
    ///
    /// Step orders are assigned from list position (1-based).
    pub async fn replace_timeline(
        conn: &mut PgConnection,
        document_id: DbId,
        specs: &[StepSpec],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM document_timelines WHERE document_id = $1")
            .bind(document_id)
            .execute(&mut *conn)
            .await?;
        for (index, spec) in specs.iter().enumerate() {
            sqlx::query(
                "INSERT INTO document_timelines
                    (document_id, step_order, role, department_id, assigned_to)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(document_id)
            .bind(index as i32 + 1)
            .bind(&spec.role)
            .bind(spec.department_id)
            .bind(spec.assigned_to)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    /// The document's pre-configured timeline, ordered by step order.
    /// Empty when none was configured.
    pub async fn get_timeline(
        pool: &PgPool,
        document_id: DbId,
    ) -> Result<Vec<StepSpec>, sqlx::Error> {
        let rows: Vec<(String, Option<DbId>, Option<DbId>)> = sqlx::query_as(
            "SELECT role, department_id, assigned_to FROM document_timelines
             WHERE document_id = $1
             ORDER BY step_order ASC",
        )
        .bind(document_id)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(role, department_id, assigned_to)| StepSpec {
                role,
                department_id,
                assigned_to,
            })
            .collect())
    }

    /// Guarded instance completion: clears the pointer and stamps
    /// `completed_at`. Returns `false` when the expected `row_version`
    /// is stale.
    pub async fn complete_instance(
        conn: &mut PgConnection,
        instance_id: DbId,
        expected_row_version: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE workflow_instances SET current_step = NULL, completed_at = NOW(), \
             row_version = row_version + 1 \
             WHERE id = $1 AND row_version = $2",
        )
        .bind(instance_id)
        .bind(expected_row_version)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
