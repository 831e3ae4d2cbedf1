//! Repository for the `document_versions` table.

use sqlx::{PgConnection, PgPool};

use docflow_core::types::DbId;

use crate::models::document_version::{CreateDocumentVersion, DocumentVersion};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, document_id, version_number, file_name, file_size_bytes, \
    mime_type, file_path, created_by, created_at";

/// Provides append-and-read operations for immutable document versions.
pub struct DocumentVersionRepo;

impl DocumentVersionRepo {
    /// Insert a new version, auto-assigning the next version number.
    ///
    /// The `MAX + 1` subquery runs inside the caller's transaction, so
    /// version numbers stay strictly increasing with no gaps even when
    /// appends race (the unique constraint backs this up).
    pub async fn create(
        conn: &mut PgConnection,
        input: &CreateDocumentVersion,
    ) -> Result<DocumentVersion, sqlx::Error> {
        let query = format!(
            "INSERT INTO document_versions
                (document_id, version_number, file_name, file_size_bytes, mime_type, file_path, created_by)
             VALUES (
                $1,
                (SELECT COALESCE(MAX(version_number), 0) + 1 FROM document_versions WHERE document_id = $1),
                $2, $3, $4, $5, $6
             )
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DocumentVersion>(&query)
            .bind(input.document_id)
            .bind(&input.file_name)
            .bind(input.file_size_bytes)
            .bind(&input.mime_type)
            .bind(&input.file_path)
            .bind(input.created_by)
            .fetch_one(conn)
            .await
    }

    /// Find a version by its internal ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<DocumentVersion>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM document_versions WHERE id = $1");
        sqlx::query_as::<_, DocumentVersion>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a specific version of a document by version number.
    pub async fn find_by_number(
        pool: &PgPool,
        document_id: DbId,
        version_number: i32,
    ) -> Result<Option<DocumentVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM document_versions \
             WHERE document_id = $1 AND version_number = $2"
        );
        sqlx::query_as::<_, DocumentVersion>(&query)
            .bind(document_id)
            .bind(version_number)
            .fetch_optional(pool)
            .await
    }

    /// List all versions for a document, newest first.
    pub async fn list_for_document(
        pool: &PgPool,
        document_id: DbId,
    ) -> Result<Vec<DocumentVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM document_versions
             WHERE document_id = $1
             ORDER BY version_number DESC"
        );
        sqlx::query_as::<_, DocumentVersion>(&query)
            .bind(document_id)
            .fetch_all(pool)
            .await
    }

    /// All stored file paths for a document (for cleanup after delete).
    pub async fn file_paths_for_document(
        pool: &PgPool,
        document_id: DbId,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT file_path FROM document_versions WHERE document_id = $1",
        )
        .bind(document_id)
        .fetch_all(pool)
        .await
    }
}
