//! Route definitions for departments and membership.
//!
//! ```text
//! GET    /                          list_departments
//! POST   /                          create_department (admin)
//! PUT    /{id}                      update_department (admin)
//! DELETE /{id}                      delete_department (admin)
//! POST   /{id}/members/{user_id}    add_member (admin)
//! DELETE /{id}/members/{user_id}    remove_member (admin)
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::departments;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(departments::list_departments).post(departments::create_department),
        )
        .route(
            "/{id}",
            axum::routing::put(departments::update_department)
                .delete(departments::delete_department),
        )
        .route(
            "/{id}/members/{user_id}",
            post(departments::add_member).delete(departments::remove_member),
        )
}
