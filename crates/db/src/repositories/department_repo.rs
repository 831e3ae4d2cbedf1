//! Repository for the `departments` and `user_departments` tables.

use sqlx::PgPool;

use docflow_core::types::DbId;

use crate::models::department::{CreateDepartment, Department, UpdateDepartment};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, description, created_at, updated_at";

/// Provides CRUD operations for departments and membership management.
pub struct DepartmentRepo;

impl DepartmentRepo {
    /// Insert a new department, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateDepartment,
    ) -> Result<Department, sqlx::Error> {
        let query = format!(
            "INSERT INTO departments (name, description)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Department>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    /// Find a department by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Department>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM departments WHERE id = $1");
        sqlx::query_as::<_, Department>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all departments ordered by name.
    pub async fn list(pool: &PgPool) -> Result<Vec<Department>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM departments ORDER BY name ASC");
        sqlx::query_as::<_, Department>(&query)
            .fetch_all(pool)
            .await
    }

    /// Update a department. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateDepartment,
    ) -> Result<Option<Department>, sqlx::Error> {
        let query = format!(
            "UPDATE departments SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Department>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_optional(pool)
            .await
    }

    /// Delete a department by ID. Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM departments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Add a user to a department (idempotent).
    pub async fn add_member(
        pool: &PgPool,
        department_id: DbId,
        user_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO user_departments (user_id, department_id)
             VALUES ($1, $2)
             ON CONFLICT (user_id, department_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(department_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Remove a user from a department. Returns `true` if a row was deleted.
    pub async fn remove_member(
        pool: &PgPool,
        department_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM user_departments WHERE user_id = $1 AND department_id = $2",
        )
        .bind(user_id)
        .bind(department_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All department IDs a user belongs to.
    pub async fn department_ids_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT department_id FROM user_departments WHERE user_id = $1 ORDER BY department_id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Active users holding `role` within a department. Used by the
    /// notification router to resolve step-eligible users.
    pub async fn user_ids_with_role(
        pool: &PgPool,
        department_id: DbId,
        role: &str,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT u.id FROM users u
             JOIN roles r ON u.role_id = r.id
             JOIN user_departments ud ON ud.user_id = u.id
             WHERE ud.department_id = $1 AND r.name = $2 AND u.is_active = TRUE",
        )
        .bind(department_id)
        .bind(role)
        .fetch_all(pool)
        .await
    }

    /// Active users holding `role` across all departments. Used for
    /// steps without a department scope.
    pub async fn user_ids_with_role_anywhere(
        pool: &PgPool,
        role: &str,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT u.id FROM users u
             JOIN roles r ON u.role_id = r.id
             WHERE r.name = $1 AND u.is_active = TRUE",
        )
        .bind(role)
        .fetch_all(pool)
        .await
    }
}
