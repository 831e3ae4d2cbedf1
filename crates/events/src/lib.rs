//! Docflow event bus and persistence infrastructure.
//!
//! Building blocks for the platform-wide event system:
//!
//! - [`EventBus`] — in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`] — the canonical domain event envelope.
//! - [`EventPersistence`] — background service that durably writes
//!   every event to the `events` table.
//!
//! Workflow transitions publish events only after their transaction
//! commits; consumers can therefore never observe an event for state
//! that was rolled back.

pub mod bus;
pub mod persistence;

pub use bus::{EventBus, PlatformEvent};
pub use persistence::EventPersistence;

/// Event type names. Must match the seed data in
/// `20260301000005_create_events_and_notifications.sql`.
pub mod types {
    /// A draft document entered review.
    pub const DOCUMENT_SUBMITTED: &str = "document.submitted";
    /// A workflow step was completed and the pointer advanced.
    pub const DOCUMENT_STEP_APPROVED: &str = "document.step_approved";
    /// The current step's actor sent the document back for changes.
    pub const DOCUMENT_CHANGES_REQUESTED: &str = "document.changes_requested";
    /// The final step completed; the document is approved.
    pub const DOCUMENT_APPROVED: &str = "document.approved";
    /// A new file version was attached to a document.
    pub const DOCUMENT_VERSION_ADDED: &str = "document.version_added";
    /// An admin locked an approved document as final.
    pub const DOCUMENT_FINALIZED: &str = "document.finalized";
}
