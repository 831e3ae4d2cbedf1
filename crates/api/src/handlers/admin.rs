//! Handlers for user administration under `/admin/users`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use docflow_core::error::CoreError;
use docflow_core::types::DbId;
use docflow_db::models::user::{CreateUser, UpdateUser, User, UserResponse};
use docflow_db::repositories::{DepartmentRepo, RoleRepo, SessionRepo, UserRepo};

use crate::auth::password::{hash_password, validate_password_strength};
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Minimum password length for newly created accounts.
const MIN_PASSWORD_LENGTH: usize = 12;

/// Request body for `POST /admin/users`.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub password: String,
    pub role_id: DbId,
    #[serde(default)]
    pub department_ids: Vec<DbId>,
}

/// Build the safe API projection of a user row.
async fn to_response(state: &AppState, user: User) -> AppResult<UserResponse> {
    let role = RoleRepo::resolve_name(&state.pool, user.role_id).await?;
    let department_ids = DepartmentRepo::department_ids_for_user(&state.pool, user.id).await?;
    Ok(UserResponse {
        id: user.id,
        username: user.username,
        display_name: user.display_name,
        email: user.email,
        role,
        role_id: user.role_id,
        is_active: user.is_active,
        department_ids,
        last_login_at: user.last_login_at,
        created_at: user.created_at,
    })
}

/// Verify that a user exists, returning the full row.
async fn ensure_user_exists(state: &AppState, id: DbId) -> AppResult<User> {
    UserRepo::find_by_id(&state.pool, id).await?.ok_or_else(|| {
        AppError::Core(CoreError::NotFound {
            entity: "User",
            id,
        })
    })
}

/// GET /api/v1/admin/users
///
/// List all users. Admin only.
pub async fn list_users(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let users = UserRepo::list(&state.pool).await?;
    let mut responses = Vec::with_capacity(users.len());
    for user in users {
        responses.push(to_response(&state, user).await?);
    }
    Ok(Json(DataResponse { data: responses }))
}

/// POST /api/v1/admin/users
///
/// Create a user with an initial password and optional department
/// memberships. Admin only.
pub async fn create_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateUserRequest>,
) -> AppResult<impl IntoResponse> {
    validate_password_strength(&input.password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    RoleRepo::find_by_id(&state.pool, input.role_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Role",
                id: input.role_id,
            })
        })?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            username: input.username,
            display_name: input.display_name,
            email: input.email,
            password_hash,
            role_id: input.role_id,
        },
    )
    .await?;

    for department_id in &input.department_ids {
        DepartmentRepo::add_member(&state.pool, *department_id, user.id).await?;
    }

    tracing::info!(
        user_id = user.id,
        created_by = admin.user_id,
        "User created"
    );

    let response = to_response(&state, user).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: response })))
}

/// GET /api/v1/admin/users/{id}
pub async fn get_user(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let user = ensure_user_exists(&state, id).await?;
    let response = to_response(&state, user).await?;
    Ok(Json(DataResponse { data: response }))
}

/// PUT /api/v1/admin/users/{id}
pub async fn update_user(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateUser>,
) -> AppResult<impl IntoResponse> {
    if let Some(role_id) = input.role_id {
        RoleRepo::find_by_id(&state.pool, role_id)
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::NotFound {
                    entity: "Role",
                    id: role_id,
                })
            })?;
    }

    let user = UserRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "User",
                id,
            })
        })?;

    let response = to_response(&state, user).await?;
    Ok(Json(DataResponse { data: response }))
}

/// DELETE /api/v1/admin/users/{id}
///
/// Deactivate a user (accounts are never hard-deleted) and revoke
/// their sessions.
pub async fn deactivate_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    ensure_user_exists(&state, id).await?;

    UserRepo::deactivate(&state.pool, id).await?;
    SessionRepo::revoke_all_for_user(&state.pool, id).await?;

    tracing::info!(user_id = id, deactivated_by = admin.user_id, "User deactivated");

    Ok(Json(DataResponse {
        data: serde_json::json!({ "deactivated": true }),
    }))
}
