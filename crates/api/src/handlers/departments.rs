//! Handlers for the `/departments` resource and membership management.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use docflow_core::error::CoreError;
use docflow_core::types::DbId;
use docflow_db::models::department::{CreateDepartment, Department, UpdateDepartment};
use docflow_db::repositories::{DepartmentRepo, UserRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Verify that a department exists, returning the full row.
async fn ensure_department_exists(
    pool: &sqlx::PgPool,
    id: DbId,
) -> AppResult<Department> {
    DepartmentRepo::find_by_id(pool, id).await?.ok_or_else(|| {
        AppError::Core(CoreError::NotFound {
            entity: "Department",
            id,
        })
    })
}

/// GET /api/v1/departments
///
/// List all departments. Any authenticated user.
pub async fn list_departments(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let departments = DepartmentRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: departments }))
}

/// POST /api/v1/departments
///
/// Create a department. Admin only.
pub async fn create_department(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateDepartment>,
) -> AppResult<impl IntoResponse> {
    if input.name.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Department name must not be empty".into(),
        )));
    }

    let department = DepartmentRepo::create(&state.pool, &input).await?;

    tracing::info!(
        department_id = department.id,
        created_by = admin.user_id,
        "Department created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: department })))
}

/// PUT /api/v1/departments/{id}
pub async fn update_department(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateDepartment>,
) -> AppResult<impl IntoResponse> {
    let department = DepartmentRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Department",
                id,
            })
        })?;
    Ok(Json(DataResponse { data: department }))
}

/// DELETE /api/v1/departments/{id}
pub async fn delete_department(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    ensure_department_exists(&state.pool, id).await?;
    DepartmentRepo::delete(&state.pool, id).await?;

    tracing::info!(department_id = id, deleted_by = admin.user_id, "Department deleted");

    Ok(Json(DataResponse {
        data: serde_json::json!({ "deleted": true }),
    }))
}

/// POST /api/v1/departments/{id}/members/{user_id}
///
/// Add a user to a department. Admin only.
pub async fn add_member(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    ensure_department_exists(&state.pool, id).await?;
    UserRepo::find_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "User",
                id: user_id,
            })
        })?;

    DepartmentRepo::add_member(&state.pool, id, user_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: serde_json::json!({ "added": true }),
        }),
    ))
}

/// DELETE /api/v1/departments/{id}/members/{user_id}
pub async fn remove_member(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    ensure_department_exists(&state.pool, id).await?;
    let removed = DepartmentRepo::remove_member(&state.pool, id, user_id).await?;

    Ok(Json(DataResponse {
        data: serde_json::json!({ "removed": removed }),
    }))
}
