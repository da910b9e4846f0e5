//! Shared response envelope types for API handlers.
//!
//! All API responses use a `{ "data": ... }` envelope. Mutations that
//! propagate into the parent feedback record use [`MutationResponse`], which
//! adds the refreshed feedback and the outcome of any side effect attempted.

use millwright_core::marketplace::SyncOutcome;
use millwright_db::models::feedback::Feedback;
use serde::Serialize;

use crate::engine::Propagation;

/// Standard `{ "data": T }` response envelope.
///
/// Wraps any serializable payload in the project's standard response format.
///
/// # Example
///
/// ```ignore
/// Ok(Json(DataResponse { data: items }))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// `{ "data": T, "feedback": ..., "marketplace_update": ..., "recompute_error": ... }`.
///
/// The extra keys are omitted when nothing was recomputed or attempted.
#[derive(Debug, Serialize)]
pub struct MutationResponse<T: Serialize> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marketplace_update: Option<SyncOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recompute_error: Option<String>,
}

impl<T: Serialize> MutationResponse<T> {
    pub fn new(data: T, propagation: Propagation) -> Self {
        Self {
            data,
            feedback: propagation.feedback,
            marketplace_update: propagation.marketplace_update,
            recompute_error: propagation.recompute_error,
        }
    }
}

/// Body returned by delete endpoints that keep the row (soft delete).
#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub id: millwright_core::types::DbId,
    pub deleted: bool,
}
