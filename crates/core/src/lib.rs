//! Docflow domain core.
//!
//! Pure domain logic for the document-approval platform: the workflow
//! state machine, role/step policy tables, department-scoped visibility
//! rules, and the shared error taxonomy. This crate performs no I/O;
//! persistence and transport live in `docflow-db` and `docflow-api`.

pub mod channels;
pub mod error;
pub mod roles;
pub mod status;
pub mod types;
pub mod visibility;
pub mod workflow;
