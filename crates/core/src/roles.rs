//! Well-known role name constants and the per-role step policy table.
//!
//! Role names must match the seed data in
//! `20260301000001_create_users_and_roles.sql`.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_EDITOR: &str = "editor";
pub const ROLE_REVIEWER: &str = "reviewer";
pub const ROLE_APPROVER: &str = "approver";

/// All roles that may be assigned to a workflow step.
pub const VALID_STEP_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_EDITOR, ROLE_REVIEWER, ROLE_APPROVER];

/// What a role must supply when completing its workflow step.
///
/// Canonical policy for the whole platform: handlers and the engine
/// consult this table instead of matching on role names inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPolicy {
    /// The step cannot complete without a new file version attached.
    pub file_required: bool,
    /// The step cannot complete without a non-empty comment.
    pub comment_required: bool,
}

/// Look up the step-completion policy for a role.
///
/// Editors produce content, so their step completion must carry the
/// revised file and an explanation. Approvers sign off with a comment.
/// Reviewers and admins may complete a step bare.
pub fn step_policy(role: &str) -> StepPolicy {
    match role {
        ROLE_EDITOR => StepPolicy {
            file_required: true,
            comment_required: true,
        },
        ROLE_APPROVER => StepPolicy {
            file_required: false,
            comment_required: true,
        },
        _ => StepPolicy {
            file_required: false,
            comment_required: false,
        },
    }
}

/// Validate that a role name is one of the accepted step roles.
pub fn validate_step_role(role: &str) -> Result<(), crate::error::CoreError> {
    if VALID_STEP_ROLES.contains(&role) {
        Ok(())
    } else {
        Err(crate::error::CoreError::Validation(format!(
            "Invalid step role '{role}'. Must be one of: {}",
            VALID_STEP_ROLES.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editor_requires_file_and_comment() {
        let policy = step_policy(ROLE_EDITOR);
        assert!(policy.file_required);
        assert!(policy.comment_required);
    }

    #[test]
    fn test_approver_requires_comment_only() {
        let policy = step_policy(ROLE_APPROVER);
        assert!(!policy.file_required);
        assert!(policy.comment_required);
    }

    #[test]
    fn test_reviewer_and_admin_require_nothing() {
        for role in [ROLE_REVIEWER, ROLE_ADMIN] {
            let policy = step_policy(role);
            assert!(!policy.file_required, "{role} should not require a file");
            assert!(
                !policy.comment_required,
                "{role} should not require a comment"
            );
        }
    }

    #[test]
    fn test_unknown_role_gets_permissive_policy() {
        let policy = step_policy("contractor");
        assert_eq!(
            policy,
            StepPolicy {
                file_required: false,
                comment_required: false
            }
        );
    }

    #[test]
    fn test_valid_step_roles_accepted() {
        for role in VALID_STEP_ROLES {
            assert!(validate_step_role(role).is_ok());
        }
    }

    #[test]
    fn test_invalid_step_role_rejected() {
        let result = validate_step_role("superuser");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid step role"));
    }
}
