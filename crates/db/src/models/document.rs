//! Document entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use docflow_core::types::{DbId, Timestamp};

use crate::models::document_version::DocumentVersion;
use crate::models::workflow::WorkflowDetail;

/// A row from the `documents` table.
///
/// `status` holds a `docflow_core::status::DocumentStatus` string;
/// `row_version` is the optimistic concurrency token checked by every
/// workflow transition.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Document {
    pub id: DbId,
    pub title: String,
    pub doc_type: String,
    pub status: String,
    pub current_version_id: Option<DbId>,
    pub priority: String,
    pub deadline: Option<Timestamp>,
    pub created_by: DbId,
    pub row_version: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Document detail response: the row plus its workflow, versions, and
/// whether the requesting user may act on the current step.
#[derive(Debug, Serialize)]
pub struct DocumentDetail {
    #[serde(flatten)]
    pub document: Document,
    pub department_ids: Vec<DbId>,
    pub versions: Vec<DocumentVersion>,
    pub workflow: Option<WorkflowDetail>,
    pub can_interact: bool,
}

/// Metadata fields for creating a document (the file arrives as a
/// separate multipart part).
#[derive(Debug, Deserialize)]
pub struct CreateDocument {
    pub title: String,
    pub doc_type: String,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub deadline: Option<Timestamp>,
    /// Departments scoping the document's visibility; empty = visible
    /// to everyone.
    #[serde(default)]
    pub department_ids: Vec<DbId>,
}
