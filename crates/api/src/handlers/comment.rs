//! Handlers for feedback comments.
//!
//! Thread rules and authorization live in [`crate::engine::comments`].

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use millwright_core::error::CoreError;
use millwright_core::types::DbId;
use millwright_db::models::comment::{Comment, CreateComment, UpdateComment};
use millwright_db::models::notification::Notification;
use millwright_db::repositories::CommentRepo;

use crate::engine::comments::{self, Actor};
use crate::error::{AppError, AppResult};
use crate::handlers::feedback::ensure_feedback_exists;
use crate::middleware::auth::AuthUser;
use crate::query::VisibilityParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// `{ "data": comment, "notifications": [...] }` for a newly posted comment.
#[derive(Debug, Serialize)]
pub struct CommentCreatedResponse {
    pub data: Comment,
    pub notifications: Vec<Notification>,
}

fn actor(auth: &AuthUser) -> Actor<'_> {
    Actor {
        user_id: auth.user_id,
        role: &auth.role,
    }
}

/// GET /api/v1/feedback/{id}/comments?visibility=all|public|customer
pub async fn list_comments(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(feedback_id): Path<DbId>,
    Query(params): Query<VisibilityParams>,
) -> AppResult<Json<DataResponse<Vec<Comment>>>> {
    ensure_feedback_exists(&state, feedback_id).await?;
    let comments =
        CommentRepo::list_for_feedback(&state.pool, feedback_id, params.visibility).await?;
    Ok(Json(DataResponse { data: comments }))
}

/// POST /api/v1/feedback/{id}/comments
///
/// Post a top-level comment, or a reply when `parent_comment_id` is set.
pub async fn create_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(feedback_id): Path<DbId>,
    Json(input): Json<CreateComment>,
) -> AppResult<(StatusCode, Json<CommentCreatedResponse>)> {
    let (comment, notifications) =
        comments::create_comment(&state, feedback_id, auth.user_id, &input).await?;

    Ok((
        StatusCode::CREATED,
        Json(CommentCreatedResponse {
            data: comment,
            notifications,
        }),
    ))
}

/// PUT /api/v1/comments/{id}
pub async fn update_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateComment>,
) -> AppResult<Json<DataResponse<Comment>>> {
    let comment = comments::update_comment(&state, id, actor(&auth), &input).await?;
    Ok(Json(DataResponse { data: comment }))
}

/// DELETE /api/v1/comments/{id}
///
/// Soft-delete; returns the placeholder row so clients can redraw the thread.
pub async fn delete_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Comment>>> {
    let comment = comments::delete_comment(&state, id, actor(&auth)).await?;
    Ok(Json(DataResponse { data: comment }))
}

/// GET /api/v1/comments/{id}/replies
///
/// Direct replies of a comment. Works for soft-deleted parents.
pub async fn list_replies(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Comment>>>> {
    if CommentRepo::find_by_id(&state.pool, id).await?.is_none() {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Comment",
            id,
        }));
    }
    let replies = CommentRepo::list_replies(&state.pool, id).await?;
    Ok(Json(DataResponse { data: replies }))
}
