//! Propagation engine.
//!
//! Primary writes (steps, quality checks, comments) commit first. The engine
//! then recomputes the parent feedback's derived fields under a row lock and
//! returns the side effects it decided on as [`effects::PostCommit`] intents,
//! which are executed after the recompute transaction has committed:
//!
//! - [`aggregator`] -- step-driven status, completion and quantities.
//! - [`quality`] -- quality score from the feedback's checks.
//! - [`dispatcher`] -- persists notifications and attempts email delivery.
//! - [`synchronizer`] -- pushes feedback summaries to the marketplace.
//! - [`comments`] -- comment thread rules plus reply/comment notifications.

pub mod aggregator;
pub mod comments;
pub mod dispatcher;
pub mod effects;
pub mod quality;
pub mod synchronizer;

use millwright_core::marketplace::SyncOutcome;
use millwright_core::types::DbId;
use millwright_db::models::feedback::Feedback;

use crate::state::AppState;

/// What a primary write propagated into its parent feedback.
///
/// Rendered next to the primary entity by
/// [`MutationResponse`](crate::response::MutationResponse).
#[derive(Debug, Default)]
pub struct Propagation {
    /// The refreshed feedback record, when the recompute succeeded.
    pub feedback: Option<Feedback>,
    /// Outcome of a marketplace push, when one was attempted.
    pub marketplace_update: Option<SyncOutcome>,
    /// Set when the recompute failed. The primary write is kept.
    pub recompute_error: Option<String>,
}

impl Propagation {
    fn failed(feedback_id: DbId, stage: &'static str, err: impl std::fmt::Display) -> Self {
        tracing::error!(feedback_id, stage, error = %err, "Feedback recompute failed");
        Self {
            recompute_error: Some(format!("{stage} recompute failed: {err}")),
            ..Self::default()
        }
    }
}

/// Re-run the status aggregator after a step mutation and execute its effects.
pub async fn propagate_steps(state: &AppState, feedback_id: DbId) -> Propagation {
    match aggregator::recompute_status(&state.pool, feedback_id).await {
        Ok(recomputed) => {
            let outcome = effects::run(state, recomputed.feedback, recomputed.effects).await;
            Propagation {
                feedback: Some(outcome.feedback),
                marketplace_update: outcome.marketplace_update,
                recompute_error: None,
            }
        }
        Err(e) => Propagation::failed(feedback_id, "status", e),
    }
}

/// Re-run the quality score calculator after a quality check mutation.
pub async fn propagate_quality(state: &AppState, feedback_id: DbId) -> Propagation {
    match quality::recompute_quality(&state.pool, feedback_id).await {
        Ok(feedback) => Propagation {
            feedback: Some(feedback),
            ..Propagation::default()
        },
        Err(e) => Propagation::failed(feedback_id, "quality", e),
    }
}

/// Run both recomputations, as the operator recompute endpoint does.
pub async fn propagate_all(state: &AppState, feedback_id: DbId) -> Propagation {
    let status = propagate_steps(state, feedback_id).await;
    let quality = propagate_quality(state, feedback_id).await;

    let recompute_error = match (status.recompute_error, quality.recompute_error) {
        (Some(a), Some(b)) => Some(format!("{a}; {b}")),
        (a, b) => a.or(b),
    };

    Propagation {
        feedback: quality.feedback.or(status.feedback),
        marketplace_update: status.marketplace_update,
        recompute_error,
    }
}
