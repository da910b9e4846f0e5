//! Repository for the `production_feedback_comments` table.

use millwright_core::comments::{VisibilityFilter, DELETED_PLACEHOLDER, MAX_COMMENT_DEPTH};
use millwright_core::types::DbId;
use sqlx::PgPool;

use crate::models::comment::{Comment, CreateComment, UpdateComment};

/// Column list for `production_feedback_comments` queries.
const COLUMNS: &str = "id, feedback_id, parent_comment_id, author_id, author_name, content, \
    is_important, is_public, visible_to_customer, is_edited, is_deleted, deleted_at, \
    created_at, updated_at";

/// Provides data access for feedback comments.
pub struct CommentRepo;

impl CommentRepo {
    /// Insert a comment or reply.
    pub async fn create(
        pool: &PgPool,
        feedback_id: DbId,
        author_id: DbId,
        input: &CreateComment,
    ) -> Result<Comment, sqlx::Error> {
        let query = format!(
            "INSERT INTO production_feedback_comments \
                (feedback_id, parent_comment_id, author_id, author_name, content, \
                 is_important, is_public, visible_to_customer) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(feedback_id)
            .bind(input.parent_comment_id)
            .bind(author_id)
            .bind(&input.author_name)
            .bind(&input.content)
            .bind(input.is_important)
            .bind(input.is_public)
            .bind(input.visible_to_customer)
            .fetch_one(pool)
            .await
    }

    /// Find a comment by ID, including soft-deleted ones.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Comment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM production_feedback_comments WHERE id = $1");
        sqlx::query_as::<_, Comment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Number of ancestors above a comment. A top-level comment has depth 0.
    ///
    /// The walk stops one level past the maximum depth, so a corrupted
    /// parent chain cannot loop forever.
    pub async fn depth(pool: &PgPool, id: DbId) -> Result<i64, sqlx::Error> {
        let depth: Option<i64> = sqlx::query_scalar(
            "WITH RECURSIVE ancestors(id, parent_comment_id, depth) AS ( \
                SELECT id, parent_comment_id, 0::bigint \
                FROM production_feedback_comments WHERE id = $1 \
                UNION ALL \
                SELECT c.id, c.parent_comment_id, a.depth + 1 \
                FROM production_feedback_comments c \
                JOIN ancestors a ON c.id = a.parent_comment_id \
                WHERE a.depth <= $2 \
             ) \
             SELECT MAX(depth) FROM ancestors",
        )
        .bind(id)
        .bind(MAX_COMMENT_DEPTH as i64)
        .fetch_one(pool)
        .await?;
        Ok(depth.unwrap_or(0))
    }

    /// List a feedback record's comments in posting order.
    ///
    /// Soft-deleted comments are included so threads stay navigable; their
    /// content is the deletion placeholder.
    pub async fn list_for_feedback(
        pool: &PgPool,
        feedback_id: DbId,
        visibility: VisibilityFilter,
    ) -> Result<Vec<Comment>, sqlx::Error> {
        let filter = match visibility {
            VisibilityFilter::All => "",
            VisibilityFilter::Public => "AND is_public = true",
            VisibilityFilter::Customer => "AND visible_to_customer = true",
        };
        let query = format!(
            "SELECT {COLUMNS} FROM production_feedback_comments \
             WHERE feedback_id = $1 {filter} \
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(feedback_id)
            .fetch_all(pool)
            .await
    }

    /// List direct replies of a comment in posting order.
    pub async fn list_replies(pool: &PgPool, parent_id: DbId) -> Result<Vec<Comment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM production_feedback_comments \
             WHERE parent_comment_id = $1 \
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(parent_id)
            .fetch_all(pool)
            .await
    }

    /// Edit a live comment. A content change marks the comment as edited.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateComment,
    ) -> Result<Option<Comment>, sqlx::Error> {
        let query = format!(
            "UPDATE production_feedback_comments SET \
                content = COALESCE($2, content), \
                is_edited = is_edited OR $2 IS NOT NULL, \
                is_important = COALESCE($3, is_important), \
                is_public = COALESCE($4, is_public), \
                visible_to_customer = COALESCE($5, visible_to_customer) \
             WHERE id = $1 AND is_deleted = false \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(id)
            .bind(&input.content)
            .bind(input.is_important)
            .bind(input.is_public)
            .bind(input.visible_to_customer)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a comment, replacing its content with the placeholder.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<Option<Comment>, sqlx::Error> {
        let query = format!(
            "UPDATE production_feedback_comments SET \
                content = $2, is_deleted = true, deleted_at = NOW() \
             WHERE id = $1 AND is_deleted = false \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(id)
            .bind(DELETED_PLACEHOLDER)
            .fetch_optional(pool)
            .await
    }
}
