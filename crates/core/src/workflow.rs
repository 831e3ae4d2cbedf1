//! Document approval workflow state machine.
//!
//! Pure transition logic over in-memory snapshots. The api crate's
//! engine loads a document's workflow instance and steps, calls into
//! this module to validate and resolve a transition, and then applies
//! the returned effects inside a single database transaction. Nothing
//! here touches I/O, which keeps every rule unit-testable.
//!
//! The machine: `Draft → ForReview → {Approved | ChangesRequested}`,
//! with `ChangesRequested` returning to `ForReview` on resubmission.
//! Steps complete strictly in `step_order`; a completed step is never
//! re-opened.

use crate::error::CoreError;
use crate::roles::{ROLE_ADMIN, ROLE_APPROVER};
use crate::status::{DocumentStatus, StepStatus};
use crate::types::DbId;

/* --------------------------------------------------------------------------
Snapshots
-------------------------------------------------------------------------- */

/// The acting user as seen by the state machine: identity, role name,
/// and resolved department memberships.
#[derive(Debug, Clone)]
pub struct ActorContext {
    pub user_id: DbId,
    pub role: String,
    pub department_ids: Vec<DbId>,
}

impl ActorContext {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    pub fn in_department(&self, department_id: DbId) -> bool {
        self.department_ids.contains(&department_id)
    }
}

/// One workflow step as loaded from storage.
#[derive(Debug, Clone)]
pub struct StepSnapshot {
    pub id: DbId,
    /// 1-based position within the instance; unique and contiguous.
    pub step_order: i32,
    /// Role required to act on this step.
    pub role: String,
    /// Optional department scope; `None` means any department.
    pub department_id: Option<DbId>,
    pub status: StepStatus,
    pub assigned_to: Option<DbId>,
}

/// Position of the instance pointer.
///
/// Completion is an explicit variant rather than a reserved step
/// number, so it can never collide with a real `step_order`. Persisted
/// as a nullable `current_step` column: `NULL` means completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowProgress {
    /// The pointer rests on the step with this `step_order`.
    Active(i32),
    /// Every step is resolved; the instance is done.
    Completed,
}

impl WorkflowProgress {
    /// Decode the nullable `current_step` column.
    pub fn from_column(current_step: Option<i32>) -> Self {
        match current_step {
            Some(order) => WorkflowProgress::Active(order),
            None => WorkflowProgress::Completed,
        }
    }

    /// Encode back into the nullable `current_step` column.
    pub fn to_column(self) -> Option<i32> {
        match self {
            WorkflowProgress::Active(order) => Some(order),
            WorkflowProgress::Completed => None,
        }
    }
}

/// A workflow instance together with its ordered steps.
#[derive(Debug, Clone)]
pub struct WorkflowSnapshot {
    pub instance_id: DbId,
    pub progress: WorkflowProgress,
    /// All steps of the instance, ordered by `step_order` ascending.
    pub steps: Vec<StepSnapshot>,
}

impl WorkflowSnapshot {
    /// Resolve the step the pointer currently rests on.
    ///
    /// Matching is by exact `step_order` equality. A pointer that
    /// matches no step signals corrupted data, not user error, and is
    /// reported as `InvalidState`.
    pub fn current_step(&self) -> Result<&StepSnapshot, CoreError> {
        let order = match self.progress {
            WorkflowProgress::Active(order) => order,
            WorkflowProgress::Completed => {
                return Err(CoreError::InvalidState(
                    "Workflow is already completed; no step accepts actions".into(),
                ))
            }
        };

        self.steps
            .iter()
            .find(|s| s.step_order == order)
            .ok_or_else(|| {
                CoreError::InvalidState(format!(
                    "Workflow instance {} points at step order {order} but no such step exists",
                    self.instance_id
                ))
            })
    }

    /// The step immediately after the given order, if any.
    pub fn step_after(&self, order: i32) -> Option<&StepSnapshot> {
        self.steps.iter().find(|s| s.step_order == order + 1)
    }
}

/* --------------------------------------------------------------------------
Timeline specification
-------------------------------------------------------------------------- */

/// One step of a timeline being configured for a document.
///
/// `step_order` is assigned from the position in the submitted list
/// (1-based) when the timeline is persisted.
#[derive(Debug, Clone)]
pub struct StepSpec {
    pub role: String,
    pub department_id: Option<DbId>,
    pub assigned_to: Option<DbId>,
}

/// The timeline used when a document is submitted without one
/// configured: a single approver step assigned to the submitter.
pub fn default_timeline(actor: &ActorContext) -> Vec<StepSpec> {
    vec![StepSpec {
        role: ROLE_APPROVER.to_string(),
        department_id: None,
        assigned_to: Some(actor.user_id),
    }]
}

/// Validate a timeline configuration: non-empty, every role valid.
pub fn validate_timeline(steps: &[StepSpec]) -> Result<(), CoreError> {
    if steps.is_empty() {
        return Err(CoreError::Validation(
            "A workflow timeline must contain at least one step".into(),
        ));
    }
    for spec in steps {
        crate::roles::validate_step_role(&spec.role)?;
    }
    Ok(())
}

/* --------------------------------------------------------------------------
Transition validation
-------------------------------------------------------------------------- */

/// Validate that a document can be submitted for review.
///
/// Submission requires a `draft` document with no workflow instance.
pub fn validate_submit(status: DocumentStatus, has_instance: bool) -> Result<(), CoreError> {
    if has_instance {
        return Err(CoreError::InvalidState(
            "Document already has a workflow instance; it cannot be submitted again".into(),
        ));
    }
    if status != DocumentStatus::Draft {
        return Err(CoreError::InvalidState(format!(
            "Only draft documents can be submitted (current status: {})",
            status.as_str()
        )));
    }
    Ok(())
}

/// Validate that a document can be returned to review after changes.
pub fn validate_resubmit(status: DocumentStatus) -> Result<(), CoreError> {
    if status != DocumentStatus::ChangesRequested {
        return Err(CoreError::InvalidState(format!(
            "Only documents with requested changes can be resubmitted (current status: {})",
            status.as_str()
        )));
    }
    Ok(())
}

/// Check the actor against a step's role and department gate.
///
/// Admins bypass both checks. Everyone else must hold the step's role
/// and, when the step is department-scoped, belong to that department.
pub fn authorize_step(actor: &ActorContext, step: &StepSnapshot) -> Result<(), CoreError> {
    if actor.is_admin() {
        return Ok(());
    }

    if actor.role != step.role {
        return Err(CoreError::Forbidden(format!(
            "Step {} requires the '{}' role",
            step.step_order, step.role
        )));
    }

    if let Some(department_id) = step.department_id {
        if !actor.in_department(department_id) {
            return Err(CoreError::Forbidden(format!(
                "Step {} is scoped to a department you do not belong to",
                step.step_order
            )));
        }
    }

    Ok(())
}

/// Locate, gate, and authorize the current step for an action.
///
/// Shared precondition of approve / request-changes / complete-step:
/// the document must not be terminally locked, the pointer must resolve
/// to an actionable step, and the actor must pass the step's gate.
fn actionable_step<'a>(
    doc_status: DocumentStatus,
    workflow: &'a WorkflowSnapshot,
    actor: &ActorContext,
) -> Result<&'a StepSnapshot, CoreError> {
    if doc_status.is_terminal() {
        return Err(CoreError::InvalidState(format!(
            "Document is {} and accepts no further workflow actions",
            doc_status.as_str()
        )));
    }

    let step = workflow.current_step()?;

    if !step.status.is_actionable() {
        return Err(CoreError::InvalidState(format!(
            "Step {} is {} and cannot be acted on",
            step.step_order,
            step.status.as_str()
        )));
    }

    authorize_step(actor, step)?;
    Ok(step)
}

/* --------------------------------------------------------------------------
Transition resolution
-------------------------------------------------------------------------- */

/// Outcome of completing the current step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResolution {
    /// The pointer advances to the next step; the document stays in
    /// review.
    Advanced {
        completed_step_id: DbId,
        next_step_order: i32,
    },
    /// The completed step was the last one: the instance finishes and
    /// the document becomes approved.
    WorkflowCompleted { completed_step_id: DbId },
}

/// Resolve an approval (or generic step completion) of the current step.
///
/// On success the current step is to be marked completed; the returned
/// resolution says whether the pointer advances or the instance ends.
/// The next step becomes current purely by pointer movement; its own
/// status is untouched.
pub fn resolve_approval(
    doc_status: DocumentStatus,
    workflow: &WorkflowSnapshot,
    actor: &ActorContext,
) -> Result<StepResolution, CoreError> {
    let step = actionable_step(doc_status, workflow, actor)?;

    match workflow.step_after(step.step_order) {
        Some(next) => Ok(StepResolution::Advanced {
            completed_step_id: step.id,
            next_step_order: next.step_order,
        }),
        None => Ok(StepResolution::WorkflowCompleted {
            completed_step_id: step.id,
        }),
    }
}

/// Resolve a request for changes against the current step.
///
/// Returns the id of the step to reset to `pending`. The pointer does
/// not move: the same step is revisited after resubmission.
pub fn resolve_change_request(
    doc_status: DocumentStatus,
    workflow: &WorkflowSnapshot,
    actor: &ActorContext,
    comment: &str,
) -> Result<DbId, CoreError> {
    if comment.trim().is_empty() {
        return Err(CoreError::Validation(
            "Requesting changes requires a comment describing them".into(),
        ));
    }

    let step = actionable_step(doc_status, workflow, actor)?;
    Ok(step.id)
}

/// Whether the actor may act on the document's current step.
///
/// Mirrors the gate used by the transitions, but as a boolean for
/// read-side responses (clients use it to render action controls).
pub fn can_interact(
    doc_status: DocumentStatus,
    workflow: &WorkflowSnapshot,
    actor: &ActorContext,
) -> bool {
    actionable_step(doc_status, workflow, actor).is_ok()
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::{ROLE_EDITOR, ROLE_REVIEWER};
    use assert_matches::assert_matches;

    const DEPT_X: DbId = 10;
    const DEPT_Y: DbId = 20;
    const DEPT_Z: DbId = 30;

    fn actor(user_id: DbId, role: &str, departments: &[DbId]) -> ActorContext {
        ActorContext {
            user_id,
            role: role.to_string(),
            department_ids: departments.to_vec(),
        }
    }

    fn step(id: DbId, order: i32, role: &str, department_id: Option<DbId>) -> StepSnapshot {
        StepSnapshot {
            id,
            step_order: order,
            role: role.to_string(),
            department_id,
            status: StepStatus::Pending,
            assigned_to: None,
        }
    }

    /// Two-step review timeline: [reviewer/deptX, approver/deptY].
    fn two_step_workflow(current: i32) -> WorkflowSnapshot {
        WorkflowSnapshot {
            instance_id: 1,
            progress: WorkflowProgress::Active(current),
            steps: vec![
                step(101, 1, ROLE_REVIEWER, Some(DEPT_X)),
                step(102, 2, ROLE_APPROVER, Some(DEPT_Y)),
            ],
        }
    }

    #[test]
    fn test_progress_column_round_trip() {
        assert_eq!(
            WorkflowProgress::from_column(Some(3)),
            WorkflowProgress::Active(3)
        );
        assert_eq!(
            WorkflowProgress::from_column(None),
            WorkflowProgress::Completed
        );
        assert_eq!(WorkflowProgress::Active(3).to_column(), Some(3));
        assert_eq!(WorkflowProgress::Completed.to_column(), None);
    }

    #[test]
    fn test_submit_requires_draft_without_instance() {
        assert!(validate_submit(DocumentStatus::Draft, false).is_ok());

        // Scenario D: second submit fails because an instance exists.
        let result = validate_submit(DocumentStatus::ForReview, true);
        assert_matches!(result, Err(CoreError::InvalidState(_)));

        // A non-draft document cannot be submitted even without an instance.
        let result = validate_submit(DocumentStatus::Approved, false);
        assert_matches!(result, Err(CoreError::InvalidState(_)));
    }

    #[test]
    fn test_default_timeline_is_single_approver_step() {
        let author = actor(7, ROLE_EDITOR, &[]);
        let timeline = default_timeline(&author);
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline[0].role, ROLE_APPROVER);
        assert_eq!(timeline[0].assigned_to, Some(7));
        assert!(timeline[0].department_id.is_none());
        assert!(validate_timeline(&timeline).is_ok());
    }

    #[test]
    fn test_empty_timeline_rejected() {
        assert_matches!(validate_timeline(&[]), Err(CoreError::Validation(_)));
    }

    #[test]
    fn test_timeline_with_unknown_role_rejected() {
        let specs = vec![StepSpec {
            role: "auditor".into(),
            department_id: None,
            assigned_to: None,
        }];
        assert_matches!(validate_timeline(&specs), Err(CoreError::Validation(_)));
    }

    // Scenario A: both steps approved in order, instance completes.
    #[test]
    fn test_two_step_approval_to_completion() {
        let wf = two_step_workflow(1);
        let reviewer = actor(2, ROLE_REVIEWER, &[DEPT_X]);

        let first = resolve_approval(DocumentStatus::ForReview, &wf, &reviewer).unwrap();
        assert_eq!(
            first,
            StepResolution::Advanced {
                completed_step_id: 101,
                next_step_order: 2,
            }
        );

        // Pointer advanced by exactly one; document still in review.
        let mut wf = wf;
        wf.progress = WorkflowProgress::Active(2);
        wf.steps[0].status = StepStatus::Completed;

        let approver = actor(3, ROLE_APPROVER, &[DEPT_Y]);
        let second = resolve_approval(DocumentStatus::ForReview, &wf, &approver).unwrap();
        assert_eq!(
            second,
            StepResolution::WorkflowCompleted {
                completed_step_id: 102,
            }
        );
    }

    // Scenario B: request-changes resets the current step, pointer stays.
    #[test]
    fn test_request_changes_keeps_pointer() {
        let wf = two_step_workflow(1);
        let reviewer = actor(2, ROLE_REVIEWER, &[DEPT_X]);

        let step_id =
            resolve_change_request(DocumentStatus::ForReview, &wf, &reviewer, "fix X").unwrap();
        assert_eq!(step_id, 101, "the current step is the one reset");
        // The snapshot is untouched by resolution; the engine resets the
        // returned step and leaves `progress` alone.
        assert_eq!(wf.progress, WorkflowProgress::Active(1));
    }

    #[test]
    fn test_request_changes_requires_comment() {
        let wf = two_step_workflow(1);
        let reviewer = actor(2, ROLE_REVIEWER, &[DEPT_X]);

        let result = resolve_change_request(DocumentStatus::ForReview, &wf, &reviewer, "   ");
        assert_matches!(result, Err(CoreError::Validation(_)));
    }

    // Scenario C: right role, wrong department.
    #[test]
    fn test_wrong_department_is_forbidden() {
        let wf = two_step_workflow(1);
        let outsider = actor(4, ROLE_REVIEWER, &[DEPT_Z]);

        let result = resolve_approval(DocumentStatus::ForReview, &wf, &outsider);
        assert_matches!(result, Err(CoreError::Forbidden(_)));
    }

    #[test]
    fn test_wrong_role_is_forbidden() {
        let wf = two_step_workflow(1);
        let editor = actor(4, ROLE_EDITOR, &[DEPT_X]);

        let result = resolve_approval(DocumentStatus::ForReview, &wf, &editor);
        assert_matches!(result, Err(CoreError::Forbidden(_)));
    }

    #[test]
    fn test_admin_bypasses_role_and_department() {
        let wf = two_step_workflow(1);
        let admin = actor(1, ROLE_ADMIN, &[]);

        let result = resolve_approval(DocumentStatus::ForReview, &wf, &admin);
        assert_matches!(result, Ok(StepResolution::Advanced { .. }));
    }

    #[test]
    fn test_unscoped_step_accepts_role_from_any_department() {
        let wf = WorkflowSnapshot {
            instance_id: 1,
            progress: WorkflowProgress::Active(1),
            steps: vec![step(201, 1, ROLE_APPROVER, None)],
        };
        let approver = actor(5, ROLE_APPROVER, &[DEPT_Z]);

        let result = resolve_approval(DocumentStatus::ForReview, &wf, &approver);
        assert_matches!(
            result,
            Ok(StepResolution::WorkflowCompleted {
                completed_step_id: 201
            })
        );
    }

    #[test]
    fn test_completed_workflow_rejects_actions() {
        let mut wf = two_step_workflow(1);
        wf.progress = WorkflowProgress::Completed;
        let admin = actor(1, ROLE_ADMIN, &[]);

        let result = resolve_approval(DocumentStatus::ForReview, &wf, &admin);
        assert_matches!(result, Err(CoreError::InvalidState(_)));
    }

    #[test]
    fn test_terminal_document_rejects_actions() {
        let wf = two_step_workflow(1);
        let admin = actor(1, ROLE_ADMIN, &[]);

        for status in [DocumentStatus::Approved, DocumentStatus::Final] {
            let result = resolve_approval(status, &wf, &admin);
            assert_matches!(result, Err(CoreError::InvalidState(_)));
        }
    }

    #[test]
    fn test_pointer_at_missing_step_is_corruption() {
        // Pointer at order 3 but only steps 1 and 2 exist.
        let wf = two_step_workflow(3);
        let admin = actor(1, ROLE_ADMIN, &[]);

        let result = resolve_approval(DocumentStatus::ForReview, &wf, &admin);
        let err = result.unwrap_err();
        assert_matches!(err, CoreError::InvalidState(_));
        assert!(err.to_string().contains("no such step exists"));
    }

    #[test]
    fn test_non_actionable_current_step_rejected() {
        let mut wf = two_step_workflow(1);
        wf.steps[0].status = StepStatus::Completed;
        let reviewer = actor(2, ROLE_REVIEWER, &[DEPT_X]);

        let result = resolve_approval(DocumentStatus::ForReview, &wf, &reviewer);
        assert_matches!(result, Err(CoreError::InvalidState(_)));
    }

    #[test]
    fn test_rejected_action_does_not_mutate_snapshot() {
        let wf = two_step_workflow(1);
        let before = format!("{wf:?}");
        let outsider = actor(4, ROLE_REVIEWER, &[DEPT_Z]);

        let _ = resolve_approval(DocumentStatus::ForReview, &wf, &outsider);
        let _ = resolve_change_request(DocumentStatus::ForReview, &wf, &outsider, "no");

        assert_eq!(format!("{wf:?}"), before);
    }

    #[test]
    fn test_resubmit_only_from_changes_requested() {
        assert!(validate_resubmit(DocumentStatus::ChangesRequested).is_ok());
        for status in [
            DocumentStatus::Draft,
            DocumentStatus::ForReview,
            DocumentStatus::Approved,
            DocumentStatus::Final,
        ] {
            assert_matches!(validate_resubmit(status), Err(CoreError::InvalidState(_)));
        }
    }

    #[test]
    fn test_can_interact_mirrors_the_gate() {
        let wf = two_step_workflow(1);

        let reviewer = actor(2, ROLE_REVIEWER, &[DEPT_X]);
        assert!(can_interact(DocumentStatus::ForReview, &wf, &reviewer));

        let outsider = actor(4, ROLE_REVIEWER, &[DEPT_Z]);
        assert!(!can_interact(DocumentStatus::ForReview, &wf, &outsider));

        let admin = actor(1, ROLE_ADMIN, &[]);
        assert!(can_interact(DocumentStatus::ForReview, &wf, &admin));

        let mut done = two_step_workflow(1);
        done.progress = WorkflowProgress::Completed;
        assert!(!can_interact(DocumentStatus::ForReview, &done, &admin));
    }
}
