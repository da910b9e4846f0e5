//! Route definitions for feedback comments.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::comment;
use crate::state::AppState;

/// Comment routes nested under `/feedback`.
///
/// ```text
/// GET    /{id}/comments    -> list_comments (?visibility=all|public|customer)
/// POST   /{id}/comments    -> create_comment
/// ```
pub fn feedback_router() -> Router<AppState> {
    Router::new().route(
        "/{id}/comments",
        get(comment::list_comments).post(comment::create_comment),
    )
}

/// Routes mounted at `/comments`.
///
/// ```text
/// PUT    /{id}            -> update_comment
/// DELETE /{id}            -> delete_comment
/// GET    /{id}/replies    -> list_replies
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}",
            put(comment::update_comment).delete(comment::delete_comment),
        )
        .route("/{id}/replies", get(comment::list_replies))
}
