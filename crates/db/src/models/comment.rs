//! Feedback comment models and DTOs.

use millwright_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `production_feedback_comments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Comment {
    pub id: DbId,
    pub feedback_id: DbId,
    pub parent_comment_id: Option<DbId>,
    pub author_id: DbId,
    pub author_name: Option<String>,
    pub content: String,
    pub is_important: bool,
    pub is_public: bool,
    pub visible_to_customer: bool,
    pub is_edited: bool,
    pub is_deleted: bool,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for posting a comment or a reply.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateComment {
    pub content: String,
    #[serde(default)]
    pub is_important: bool,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub visible_to_customer: bool,
    pub parent_comment_id: Option<DbId>,
    pub author_name: Option<String>,
}

/// DTO for editing a comment. Only non-`None` fields are applied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateComment {
    pub content: Option<String>,
    pub is_important: Option<bool>,
    pub is_public: Option<bool>,
    pub visible_to_customer: Option<bool>,
}
