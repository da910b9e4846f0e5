//! Route definitions for production steps.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::step;
use crate::state::AppState;

/// Step routes nested under `/feedback`.
///
/// ```text
/// GET    /{id}/steps          -> list_steps
/// POST   /{id}/steps          -> create_step
/// POST   /{id}/steps/batch    -> create_steps_batch
/// ```
pub fn feedback_router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}/steps",
            get(step::list_steps).post(step::create_step),
        )
        .route("/{id}/steps/batch", post(step::create_steps_batch))
}

/// Routes mounted at `/steps`.
///
/// ```text
/// GET    /{id}    -> get_step
/// PUT    /{id}    -> update_step
/// DELETE /{id}    -> delete_step
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{id}",
        get(step::get_step)
            .put(step::update_step)
            .delete(step::delete_step),
    )
}
