//! Workflow instance and step entity models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use docflow_core::types::{DbId, Timestamp};

/// A row from the `workflow_instances` table.
///
/// `current_step` is the 1-based `step_order` of the current step, or
/// `NULL` once the instance has completed (decoded into
/// `docflow_core::workflow::WorkflowProgress` by the engine).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkflowInstance {
    pub id: DbId,
    pub document_id: DbId,
    pub current_step: Option<i32>,
    pub row_version: i32,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

/// A row from the `workflow_steps` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkflowStep {
    pub id: DbId,
    pub instance_id: DbId,
    pub step_order: i32,
    pub role: String,
    pub department_id: Option<DbId>,
    pub status: String,
    pub assigned_to: Option<DbId>,
    pub comment: Option<String>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// An instance together with its ordered steps, for API responses.
#[derive(Debug, Serialize)]
pub struct WorkflowDetail {
    #[serde(flatten)]
    pub instance: WorkflowInstance,
    pub steps: Vec<WorkflowStep>,
}

/// One step of a timeline configuration request.
#[derive(Debug, Deserialize)]
pub struct TimelineStepInput {
    pub role: String,
    #[serde(default)]
    pub department_id: Option<DbId>,
    #[serde(default)]
    pub assigned_to: Option<DbId>,
}

/// Request body for `PUT /documents/{id}/timeline`.
#[derive(Debug, Deserialize)]
pub struct ConfigureTimeline {
    pub steps: Vec<TimelineStepInput>,
}
