//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument. Methods participating
//! in a workflow transition instead accept `&mut PgConnection` so the
//! engine can run them inside one transaction.

pub mod department_repo;
pub mod document_repo;
pub mod document_version_repo;
pub mod event_repo;
pub mod notification_repo;
pub mod role_repo;
pub mod session_repo;
pub mod user_repo;
pub mod workflow_repo;

pub use department_repo::DepartmentRepo;
pub use document_repo::DocumentRepo;
pub use document_version_repo::DocumentVersionRepo;
pub use event_repo::EventRepo;
pub use notification_repo::NotificationRepo;
pub use role_repo::RoleRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
pub use workflow_repo::WorkflowRepo;
