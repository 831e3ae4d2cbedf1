//! Route definitions for documents and their workflow transitions.
//!
//! ```text
//! GET    /                       list_documents
//! POST   /                       create_document (multipart)
//! GET    /{id}                   get_document
//! DELETE /{id}                   delete_document
//! GET    /{id}/versions          list_versions
//! POST   /{id}/versions          upload_version (multipart)
//! GET    /{id}/download          download_version
//! PUT    /{id}/timeline          configure_timeline
//! POST   /{id}/submit            submit
//! POST   /{id}/resubmit          resubmit
//! POST   /{id}/approve           approve
//! POST   /{id}/request-changes   request_changes
//! POST   /{id}/complete-step     complete_step (multipart)
//! POST   /{id}/finalize          finalize (admin)
//! ```

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{documents, workflow};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(documents::list_documents).post(documents::create_document),
        )
        .route(
            "/{id}",
            get(documents::get_document).delete(documents::delete_document),
        )
        .route(
            "/{id}/versions",
            get(documents::list_versions).post(documents::upload_version),
        )
        .route("/{id}/download", get(documents::download_version))
        .route("/{id}/timeline", put(workflow::configure_timeline))
        .route("/{id}/submit", post(workflow::submit))
        .route("/{id}/resubmit", post(workflow::resubmit))
        .route("/{id}/approve", post(workflow::approve))
        .route("/{id}/request-changes", post(workflow::request_changes))
        .route("/{id}/complete-step", post(workflow::complete_step))
        .route("/{id}/finalize", post(workflow::finalize))
}
