//! Route definitions for the `/feedback` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::feedback;
use crate::state::AppState;

/// Routes mounted at `/feedback`.
///
/// ```text
/// GET    /                                -> list_feedback
/// POST   /                                -> create_feedback
/// GET    /by-uid/{uid}                    -> get_feedback_by_uid
/// GET    /by-production/{production_id}   -> get_feedback_by_production
/// GET    /by-batch/{batch_id}             -> list_feedback_by_batch
/// GET    /{id}                            -> get_feedback
/// PUT    /{id}                            -> update_feedback
/// DELETE /{id}                            -> cancel_feedback
/// GET    /{id}/marketplace-sync           -> get_marketplace_sync
/// POST   /{id}/marketplace-sync           -> resend_marketplace_sync
/// POST   /{id}/recompute                  -> recompute_feedback
/// POST   /{id}/issues                     -> report_issue
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(feedback::list_feedback).post(feedback::create_feedback),
        )
        .route("/by-uid/{uid}", get(feedback::get_feedback_by_uid))
        .route(
            "/by-production/{production_id}",
            get(feedback::get_feedback_by_production),
        )
        .route("/by-batch/{batch_id}", get(feedback::list_feedback_by_batch))
        .route(
            "/{id}",
            get(feedback::get_feedback)
                .put(feedback::update_feedback)
                .delete(feedback::cancel_feedback),
        )
        .route(
            "/{id}/marketplace-sync",
            get(feedback::get_marketplace_sync).post(feedback::resend_marketplace_sync),
        )
        .route("/{id}/recompute", post(feedback::recompute_feedback))
        .route("/{id}/issues", post(feedback::report_issue))
}
