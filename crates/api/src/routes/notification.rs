//! Route definitions for notifications.
//!
//! All endpoints require authentication.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::notification;
use crate::state::AppState;

/// Notification routes nested under `/feedback`.
pub fn feedback_router() -> Router<AppState> {
    Router::new().route(
        "/{id}/notifications",
        get(notification::list_feedback_notifications),
    )
}

/// Routes mounted at `/notifications`.
///
/// ```text
/// GET    /                 -> list_notifications
/// POST   /                 -> create_notification (manager/admin)
/// GET    /unread-count     -> unread_count
/// POST   /read             -> mark_many_read
/// POST   /read-all         -> mark_all_read
/// DELETE /{id}             -> delete_notification
/// POST   /{id}/read        -> mark_read
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(notification::list_notifications).post(notification::create_notification),
        )
        .route("/unread-count", get(notification::unread_count))
        .route("/read", post(notification::mark_many_read))
        .route("/read-all", post(notification::mark_all_read))
        .route("/{id}", delete(notification::delete_notification))
        .route("/{id}/read", post(notification::mark_read))
}
