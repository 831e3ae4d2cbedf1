//! Repository for the `documents` and `document_departments` tables.
//!
//! Status mutations carry the optimistic `row_version` guard: the
//! UPDATE matches only when the caller's expected version is current,
//! and increments it. Zero rows affected means a stale write.

use sqlx::{PgConnection, PgPool};

use docflow_core::types::DbId;

use crate::models::document::{CreateDocument, Document};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, title, doc_type, status, current_version_id, priority, \
    deadline, created_by, row_version, created_at, updated_at";

/// Provides CRUD, visibility-filtered listing, and guarded status
/// mutations for documents.
pub struct DocumentRepo;

impl DocumentRepo {
    /// Insert a new draft document (no version yet), returning the row.
    pub async fn create(
        conn: &mut PgConnection,
        input: &CreateDocument,
        created_by: DbId,
    ) -> Result<Document, sqlx::Error> {
        let query = format!(
            "INSERT INTO documents (title, doc_type, priority, deadline, created_by)
             VALUES ($1, $2, COALESCE($3, 'normal'), $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Document>(&query)
            .bind(&input.title)
            .bind(&input.doc_type)
            .bind(&input.priority)
            .bind(input.deadline)
            .bind(created_by)
            .fetch_one(conn)
            .await
    }

    /// Find a document by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Document>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM documents WHERE id = $1");
        sqlx::query_as::<_, Document>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all documents, newest first. Admin-only path.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Document>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM documents ORDER BY created_at DESC");
        sqlx::query_as::<_, Document>(&query).fetch_all(pool).await
    }

    /// List documents visible to a user: documents with no department
    /// associations, or sharing at least one department with the user.
    pub async fn list_visible_to(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<Document>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM documents d
             WHERE NOT EXISTS (
                 SELECT 1 FROM document_departments dd WHERE dd.document_id = d.id
             )
             OR EXISTS (
                 SELECT 1 FROM document_departments dd
                 JOIN user_departments ud ON ud.department_id = dd.department_id
                 WHERE dd.document_id = d.id AND ud.user_id = $1
             )
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Document>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Department IDs associated with a document.
    pub async fn department_ids(pool: &PgPool, document_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT department_id FROM document_departments \
             WHERE document_id = $1 ORDER BY department_id",
        )
        .bind(document_id)
        .fetch_all(pool)
        .await
    }

    /// Replace a document's department associations.
    pub async fn set_departments(
        conn: &mut PgConnection,
        document_id: DbId,
        department_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM document_departments WHERE document_id = $1")
            .bind(document_id)
            .execute(&mut *conn)
            .await?;
        for &department_id in department_ids {
            sqlx::query(
                "INSERT INTO document_departments (document_id, department_id)
                 VALUES ($1, $2)
                 ON CONFLICT (document_id, department_id) DO NOTHING",
            )
            .bind(document_id)
            .bind(department_id)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    /// Guarded status update. Returns `false` when the expected
    /// `row_version` is stale (no row matched).
    pub async fn update_status(
        conn: &mut PgConnection,
        id: DbId,
        expected_row_version: i32,
        status: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE documents SET status = $3, row_version = row_version + 1, updated_at = NOW() \
             WHERE id = $1 AND row_version = $2",
        )
        .bind(id)
        .bind(expected_row_version)
        .bind(status)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Point `current_version_id` at a new version. Unguarded: version
    /// appends are monotonic and always apply on top of the row as-is.
    pub async fn set_current_version(
        conn: &mut PgConnection,
        id: DbId,
        version_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE documents SET current_version_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(version_id)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Delete a document by ID (versions and workflow rows cascade).
    /// Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        // The self-referencing current_version_id FK must be cleared
        // before the version rows can cascade away.
        let mut tx = pool.begin().await?;
        sqlx::query("UPDATE documents SET current_version_id = NULL WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}
