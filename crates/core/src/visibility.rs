//! Department-scoped document visibility rules.
//!
//! A document with no department associations is visible to everyone.
//! A department-scoped document is visible only to users sharing at
//! least one of its departments. Admins see everything.

use crate::roles::ROLE_ADMIN;
use crate::types::DbId;

/// Whether a user may see a document.
pub fn document_visible(role: &str, user_departments: &[DbId], doc_departments: &[DbId]) -> bool {
    if role == ROLE_ADMIN {
        return true;
    }
    if doc_departments.is_empty() {
        return true;
    }
    doc_departments
        .iter()
        .any(|dept| user_departments.contains(dept))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::{ROLE_EDITOR, ROLE_REVIEWER};

    #[test]
    fn test_unscoped_document_visible_to_all() {
        assert!(document_visible(ROLE_REVIEWER, &[], &[]));
        assert!(document_visible(ROLE_EDITOR, &[1, 2], &[]));
    }

    #[test]
    fn test_scoped_document_requires_shared_department() {
        assert!(document_visible(ROLE_REVIEWER, &[1, 3], &[3, 4]));
        assert!(!document_visible(ROLE_REVIEWER, &[1, 2], &[3, 4]));
        assert!(!document_visible(ROLE_REVIEWER, &[], &[3]));
    }

    #[test]
    fn test_admin_sees_everything() {
        assert!(document_visible(ROLE_ADMIN, &[], &[3, 4]));
    }
}
