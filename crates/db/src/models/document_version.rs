//! Document version entity model and DTOs.

use serde::Serialize;
use sqlx::FromRow;

use docflow_core::types::{DbId, Timestamp};

/// A row from the `document_versions` table. Immutable once written.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DocumentVersion {
    pub id: DbId,
    pub document_id: DbId,
    /// 1-based, strictly increasing per document with no gaps.
    pub version_number: i32,
    pub file_name: String,
    pub file_size_bytes: i64,
    pub mime_type: String,
    pub file_path: String,
    pub created_by: DbId,
    pub created_at: Timestamp,
}

/// Input for appending a version (file already persisted to disk).
#[derive(Debug, Clone)]
pub struct CreateDocumentVersion {
    pub document_id: DbId,
    pub file_name: String,
    pub file_size_bytes: i64,
    pub mime_type: String,
    pub file_path: String,
    pub created_by: DbId,
}
