//! Document and workflow-step status enums.
//!
//! Statuses are stored as lowercase strings in the database; the enums
//! here give the rest of the workspace a typed vocabulary with
//! `as_str`/`parse` round-tripping.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Lifecycle status of a document.
///
/// `Draft → ForReview → {Approved | ChangesRequested}`, with
/// `ChangesRequested` cycling back through resubmission. `Final` is a
/// manually-set terminal lock outside the automatic machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    ForReview,
    ChangesRequested,
    Approved,
    Final,
}

impl DocumentStatus {
    /// The database string for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::ForReview => "for_review",
            DocumentStatus::ChangesRequested => "changes_requested",
            DocumentStatus::Approved => "approved",
            DocumentStatus::Final => "final",
        }
    }

    /// Parse a database string into a status.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "draft" => Ok(DocumentStatus::Draft),
            "for_review" => Ok(DocumentStatus::ForReview),
            "changes_requested" => Ok(DocumentStatus::ChangesRequested),
            "approved" => Ok(DocumentStatus::Approved),
            "final" => Ok(DocumentStatus::Final),
            other => Err(CoreError::Internal(format!(
                "Unknown document status '{other}' in database"
            ))),
        }
    }

    /// Terminal statuses accept no further workflow transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, DocumentStatus::Approved | DocumentStatus::Final)
    }
}

/// Status of a single workflow step.
///
/// Completion is terminal: a completed step is never re-opened.
/// Request-changes resets the *current* step to `Pending`, it does not
/// roll back completed ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Skipped,
}

impl StepStatus {
    /// The database string for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::InProgress => "in_progress",
            StepStatus::Completed => "completed",
            StepStatus::Skipped => "skipped",
        }
    }

    /// Parse a database string into a step status.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "pending" => Ok(StepStatus::Pending),
            "in_progress" => Ok(StepStatus::InProgress),
            "completed" => Ok(StepStatus::Completed),
            "skipped" => Ok(StepStatus::Skipped),
            other => Err(CoreError::Internal(format!(
                "Unknown step status '{other}' in database"
            ))),
        }
    }

    /// A step is actionable while pending or in progress.
    pub fn is_actionable(self) -> bool {
        matches!(self, StepStatus::Pending | StepStatus::InProgress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_status_round_trip() {
        for status in [
            DocumentStatus::Draft,
            DocumentStatus::ForReview,
            DocumentStatus::ChangesRequested,
            DocumentStatus::Approved,
            DocumentStatus::Final,
        ] {
            assert_eq!(DocumentStatus::parse(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn test_unknown_document_status_rejected() {
        assert!(DocumentStatus::parse("archived").is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(DocumentStatus::Approved.is_terminal());
        assert!(DocumentStatus::Final.is_terminal());
        assert!(!DocumentStatus::Draft.is_terminal());
        assert!(!DocumentStatus::ForReview.is_terminal());
        assert!(!DocumentStatus::ChangesRequested.is_terminal());
    }

    #[test]
    fn test_step_status_round_trip() {
        for status in [
            StepStatus::Pending,
            StepStatus::InProgress,
            StepStatus::Completed,
            StepStatus::Skipped,
        ] {
            assert_eq!(StepStatus::parse(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn test_actionable_steps() {
        assert!(StepStatus::Pending.is_actionable());
        assert!(StepStatus::InProgress.is_actionable());
        assert!(!StepStatus::Completed.is_actionable());
        assert!(!StepStatus::Skipped.is_actionable());
    }
}
