//! Comment thread rules: content validation, reply-parent checks,
//! visibility filters, and moderation rights.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::roles::is_admin_equivalent;
use crate::types::DbId;

/* --------------------------------------------------------------------------
Constants
-------------------------------------------------------------------------- */

/// Maximum length for a comment's content.
pub const MAX_COMMENT_LENGTH: usize = 10_000;

/// Maximum reply nesting depth. Top-level comments have depth 0.
pub const MAX_COMMENT_DEPTH: usize = 32;

/// Content stored in place of a soft-deleted comment.
pub const DELETED_PLACEHOLDER: &str = "[This comment has been deleted]";

/* --------------------------------------------------------------------------
Visibility
-------------------------------------------------------------------------- */

/// Listing filter for comment visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityFilter {
    #[default]
    All,
    /// Comments flagged public (visible to the marketplace).
    Public,
    /// Comments flagged visible to the customer.
    Customer,
}

/* --------------------------------------------------------------------------
Validation
-------------------------------------------------------------------------- */

/// Validate comment content: non-blank and within the length limit.
pub fn validate_comment_content(content: &str) -> Result<(), CoreError> {
    if content.trim().is_empty() {
        return Err(CoreError::Validation(
            "Comment content must not be empty".to_string(),
        ));
    }
    if content.chars().count() > MAX_COMMENT_LENGTH {
        return Err(CoreError::Validation(format!(
            "Comment exceeds maximum length of {MAX_COMMENT_LENGTH} characters"
        )));
    }
    Ok(())
}

/// What the thread manager knows about a prospective reply parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentInfo {
    pub id: DbId,
    pub feedback_id: DbId,
    pub is_deleted: bool,
    /// Number of ancestors above the parent.
    pub depth: usize,
}

/// Validate that a reply may be attached to `parent` on `feedback_id`.
pub fn validate_reply_parent(parent: &ParentInfo, feedback_id: DbId) -> Result<(), CoreError> {
    if parent.is_deleted {
        return Err(CoreError::Validation(format!(
            "Cannot reply to deleted comment {}",
            parent.id
        )));
    }
    if parent.feedback_id != feedback_id {
        return Err(CoreError::Validation(format!(
            "Parent comment {} belongs to a different feedback record",
            parent.id
        )));
    }
    if parent.depth + 1 > MAX_COMMENT_DEPTH {
        return Err(CoreError::Validation(format!(
            "Reply nesting exceeds maximum depth of {MAX_COMMENT_DEPTH}"
        )));
    }
    Ok(())
}

/// Only the author or an admin-equivalent role may edit or delete a comment.
pub fn ensure_can_modify(author_id: DbId, user_id: DbId, role: &str) -> Result<(), CoreError> {
    if author_id == user_id || is_admin_equivalent(role) {
        Ok(())
    } else {
        Err(CoreError::Forbidden(
            "Only the author or an administrator may modify this comment".to_string(),
        ))
    }
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
