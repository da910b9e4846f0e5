//! Route definitions for quality checks.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::quality_check;
use crate::state::AppState;

/// Quality routes nested under `/feedback`.
///
/// ```text
/// GET    /{id}/quality-checks          -> list_quality_checks
/// POST   /{id}/quality-checks          -> create_quality_check
/// POST   /{id}/quality-checks/batch    -> create_quality_checks_batch
/// GET    /{id}/quality-summary         -> quality_summary
/// ```
pub fn feedback_router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}/quality-checks",
            get(quality_check::list_quality_checks).post(quality_check::create_quality_check),
        )
        .route(
            "/{id}/quality-checks/batch",
            post(quality_check::create_quality_checks_batch),
        )
        .route("/{id}/quality-summary", get(quality_check::quality_summary))
}

/// Routes mounted at `/quality-checks`.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{id}",
        get(quality_check::get_quality_check)
            .put(quality_check::update_quality_check)
            .delete(quality_check::delete_quality_check),
    )
}
