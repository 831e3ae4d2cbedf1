//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) for patches

pub mod department;
pub mod document;
pub mod document_version;
pub mod event;
pub mod notification;
pub mod role;
pub mod session;
pub mod user;
pub mod workflow;
