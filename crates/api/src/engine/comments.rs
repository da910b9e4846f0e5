//! Comment thread manager.
//!
//! Authorization for edits and deletes is enforced here, not by the routes:
//! only the author or an admin-equivalent role may modify a comment.

use millwright_core::comments::{
    ensure_can_modify, validate_comment_content, validate_reply_parent, ParentInfo,
};
use millwright_core::error::CoreError;
use millwright_core::notifications::{route_comment, CommentEvent};
use millwright_core::types::DbId;
use millwright_db::models::comment::{Comment, CreateComment, UpdateComment};
use millwright_db::models::notification::Notification;
use millwright_db::repositories::{CommentRepo, FeedbackRepo};

use crate::engine::dispatcher;
use crate::error::AppResult;
use crate::state::AppState;

/// Who is acting on a comment.
#[derive(Debug, Clone, Copy)]
pub struct Actor<'a> {
    pub user_id: DbId,
    pub role: &'a str,
}

async fn find_comment(state: &AppState, id: DbId) -> AppResult<Comment> {
    CommentRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| {
            CoreError::NotFound {
                entity: "Comment",
                id,
            }
            .into()
        })
}

/// Post a comment or reply, then notify per the routing rules.
///
/// Top-level comments notify the production manager role; replies notify the
/// parent's author.
pub async fn create_comment(
    state: &AppState,
    feedback_id: DbId,
    author_id: DbId,
    input: &CreateComment,
) -> AppResult<(Comment, Vec<Notification>)> {
    validate_comment_content(&input.content)?;

    let feedback = FeedbackRepo::find_by_id(&state.pool, feedback_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Feedback",
            id: feedback_id,
        })?;

    let parent_author_id = match input.parent_comment_id {
        Some(parent_id) => {
            let parent = CommentRepo::find_by_id(&state.pool, parent_id)
                .await?
                .ok_or_else(|| {
                    CoreError::Validation(format!("Parent comment {parent_id} does not exist"))
                })?;
            let depth = CommentRepo::depth(&state.pool, parent_id).await?;
            validate_reply_parent(
                &ParentInfo {
                    id: parent.id,
                    feedback_id: parent.feedback_id,
                    is_deleted: parent.is_deleted,
                    depth: usize::try_from(depth).unwrap_or(usize::MAX),
                },
                feedback_id,
            )?;
            Some(parent.author_id)
        }
        None => None,
    };

    let comment = CommentRepo::create(&state.pool, feedback_id, author_id, input).await?;

    tracing::info!(
        feedback_id,
        comment_id = comment.id,
        parent_comment_id = ?comment.parent_comment_id,
        author_id,
        "Comment created",
    );

    let draft = route_comment(
        feedback.feedback_ref(),
        CommentEvent {
            comment_id: comment.id,
            author_id,
            content: &comment.content,
            is_important: comment.is_important,
            parent_author_id,
        },
    );
    let notifications = dispatcher::dispatch_all(state, std::slice::from_ref(&draft)).await;

    Ok((comment, notifications))
}

/// Edit content and flags of a live comment.
pub async fn update_comment(
    state: &AppState,
    comment_id: DbId,
    actor: Actor<'_>,
    input: &UpdateComment,
) -> AppResult<Comment> {
    let existing = find_comment(state, comment_id).await?;
    ensure_can_modify(existing.author_id, actor.user_id, actor.role)?;

    if existing.is_deleted {
        return Err(CoreError::Validation(format!(
            "Comment {comment_id} has been deleted and cannot be edited"
        ))
        .into());
    }
    if let Some(content) = &input.content {
        validate_comment_content(content)?;
    }

    let updated = CommentRepo::update(&state.pool, comment_id, input)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Comment",
            id: comment_id,
        })?;

    tracing::info!(comment_id, user_id = actor.user_id, "Comment edited");
    Ok(updated)
}

/// Soft-delete a comment: content becomes a placeholder, replies stay.
///
/// Deleting an already-deleted comment returns it unchanged.
pub async fn delete_comment(
    state: &AppState,
    comment_id: DbId,
    actor: Actor<'_>,
) -> AppResult<Comment> {
    let existing = find_comment(state, comment_id).await?;
    ensure_can_modify(existing.author_id, actor.user_id, actor.role)?;

    match CommentRepo::soft_delete(&state.pool, comment_id).await? {
        Some(deleted) => {
            tracing::info!(comment_id, user_id = actor.user_id, "Comment deleted");
            Ok(deleted)
        }
        None => Ok(existing),
    }
}
