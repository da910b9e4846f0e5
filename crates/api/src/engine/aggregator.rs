//! Status aggregator.
//!
//! Recomputes a feedback record's status, completion percentage, and
//! quantities from its live steps. The read-recompute-write runs in one
//! transaction holding `FOR UPDATE` on the feedback row, so concurrent step
//! writes on the same feedback are applied one after the other.

use millwright_core::error::CoreError;
use millwright_core::feedback::{apply_aggregate, FeedbackStatus};
use millwright_core::marketplace::is_auto_sync_status;
use millwright_core::notifications::{route_status_change, FeedbackRef};
use millwright_core::steps::aggregate_steps;
use millwright_core::types::DbId;
use millwright_db::models::feedback::Feedback;
use millwright_db::repositories::{FeedbackRepo, StepRepo};
use sqlx::PgPool;

use crate::engine::effects::PostCommit;
use crate::error::AppResult;

/// A committed recompute plus the side effects it calls for.
#[derive(Debug)]
pub struct Recomputed {
    pub feedback: Feedback,
    pub effects: PostCommit,
}

impl Recomputed {
    fn unchanged(feedback: Feedback) -> Self {
        Self {
            feedback,
            effects: PostCommit::default(),
        }
    }
}

fn not_found(id: DbId) -> CoreError {
    CoreError::NotFound {
        entity: "Feedback",
        id,
    }
}

/// Recompute derived fields from the feedback's non-deleted steps.
///
/// With no steps, or when nothing changes, the record is returned as-is and
/// no effects are produced.
pub async fn recompute_status(pool: &PgPool, feedback_id: DbId) -> AppResult<Recomputed> {
    let mut tx = pool.begin().await?;

    let current = FeedbackRepo::lock(&mut tx, feedback_id)
        .await?
        .ok_or_else(|| not_found(feedback_id))?;

    let steps = StepRepo::snapshots(&mut tx, feedback_id).await?;
    let Some(aggregate) = aggregate_steps(&steps) else {
        tx.commit().await?;
        return Ok(Recomputed::unchanged(current));
    };

    let before = current.derived_state();
    let after = apply_aggregate(&before, &aggregate, chrono::Utc::now());
    if after == before {
        tx.commit().await?;
        return Ok(Recomputed::unchanged(current));
    }

    let updated = FeedbackRepo::update_derived(&mut tx, feedback_id, &after).await?;
    tx.commit().await?;

    tracing::info!(
        feedback_id,
        from = before.status.as_str(),
        to = after.status.as_str(),
        completion = after.completion_percentage,
        total_steps = aggregate.total_steps,
        completed_steps = aggregate.completed_steps,
        "Feedback status recomputed",
    );

    let effects = status_effects(updated.feedback_ref(), before.status, after.status);
    Ok(Recomputed {
        feedback: updated,
        effects,
    })
}

/// Soft-terminate a feedback record by moving it to `cancelled`.
///
/// Cancelling an already-cancelled record is a no-op.
pub async fn cancel(pool: &PgPool, feedback_id: DbId) -> AppResult<Recomputed> {
    let mut tx = pool.begin().await?;

    let current = FeedbackRepo::lock(&mut tx, feedback_id)
        .await?
        .ok_or_else(|| not_found(feedback_id))?;

    let from = current.status();
    if from == FeedbackStatus::Cancelled {
        tx.commit().await?;
        return Ok(Recomputed::unchanged(current));
    }

    let updated = FeedbackRepo::set_status(&mut tx, feedback_id, FeedbackStatus::Cancelled).await?;
    tx.commit().await?;

    tracing::info!(feedback_id, from = from.as_str(), "Feedback cancelled");

    let effects = status_effects(updated.feedback_ref(), from, FeedbackStatus::Cancelled);
    Ok(Recomputed {
        feedback: updated,
        effects,
    })
}

/// Side effects of a committed derived-field change.
///
/// A status transition notifies the production manager role. Landing in a
/// terminal status pushes to the marketplace.
pub fn status_effects(
    feedback: FeedbackRef<'_>,
    from: FeedbackStatus,
    to: FeedbackStatus,
) -> PostCommit {
    let notifications = if from != to {
        vec![route_status_change(feedback, from, to)]
    } else {
        Vec::new()
    };

    PostCommit {
        notifications,
        sync: is_auto_sync_status(to),
    }
}
