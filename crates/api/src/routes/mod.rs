pub mod admin;
pub mod auth;
pub mod departments;
pub mod documents;
pub mod health;
pub mod notifications;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                                      login (public)
/// /auth/refresh                                    refresh (public)
/// /auth/logout                                     logout (requires auth)
///
/// /admin/users                                     list, create (admin only)
/// /admin/users/{id}                                get, update, deactivate
///
/// /departments                                     list, create
/// /departments/{id}                                update, delete
/// /departments/{id}/members/{user_id}              add, remove
///
/// /documents                                       list, create
/// /documents/{id}                                  detail, delete
/// /documents/{id}/versions                         list, upload
/// /documents/{id}/download                         download file
/// /documents/{id}/timeline                         configure steps
/// /documents/{id}/submit|resubmit                  drafting transitions
/// /documents/{id}/approve|request-changes          review transitions
/// /documents/{id}/complete-step                    review transition + file
/// /documents/{id}/finalize                         admin lock
///
/// /notifications                                   list own
/// /notifications/{id}/read                         mark read
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/admin", admin::router())
        .nest("/departments", departments::router())
        .nest("/documents", documents::router())
        .nest("/notifications", notifications::router())
}
