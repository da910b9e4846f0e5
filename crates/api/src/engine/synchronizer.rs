//! Marketplace synchronizer.
//!
//! Pushes a summary of a feedback record to the marketplace. Every send,
//! automatic or manual, passes the readiness guard first. A send that was
//! attempted records `sent` or `failed` plus a timestamp on the feedback; a
//! send that was skipped leaves the bookkeeping untouched. Failures are
//! returned to the caller and are not retried.

use millwright_core::error::CoreError;
use millwright_core::marketplace::{check_ready, MarketplacePayload, NotReady, SyncOutcome};
use millwright_core::types::DbId;
use millwright_db::models::feedback::Feedback;
use millwright_db::repositories::FeedbackRepo;

use crate::error::AppResult;
use crate::state::AppState;

/// Build the outbound payload, or explain why the record is not ready.
pub fn build_payload(feedback: &Feedback) -> Result<MarketplacePayload, NotReady> {
    let status = feedback.status();
    check_ready(feedback.batch_id.as_deref(), status)?;
    let Some(batch_id) = feedback.batch_id.clone() else {
        return Err(NotReady::MissingBatchId);
    };

    Ok(MarketplacePayload {
        production_id: feedback.production_id.clone(),
        batch_id,
        product_id: feedback.product_id.clone(),
        status,
        completion_percentage: feedback.completion_percentage,
        quantity_produced: feedback.quantity_produced,
        quantity_rejected: feedback.quantity_rejected,
        estimated_completion_date: feedback.estimated_completion_date,
        notes: feedback.customer_notes.clone(),
    })
}

/// Push `feedback` and record the outcome.
///
/// Returns the outcome and, when bookkeeping was written, the refreshed row.
pub async fn sync_feedback(
    state: &AppState,
    feedback: &Feedback,
) -> (SyncOutcome, Option<Feedback>) {
    let payload = match build_payload(feedback) {
        Ok(payload) => payload,
        Err(reason) => {
            tracing::info!(feedback_id = feedback.id, reason = %reason, "Marketplace sync skipped");
            return (SyncOutcome::skipped(reason.to_string()), None);
        }
    };

    if !state.marketplace.is_configured() {
        tracing::warn!(
            feedback_id = feedback.id,
            "Marketplace sync skipped: integration is not configured",
        );
        return (
            SyncOutcome::skipped("Marketplace integration is not configured"),
            None,
        );
    }

    let outcome = match state.marketplace.push_update(&payload).await {
        Ok(()) => {
            tracing::info!(
                feedback_id = feedback.id,
                status = payload.status.as_str(),
                "Marketplace updated",
            );
            SyncOutcome::sent()
        }
        Err(e) => {
            tracing::warn!(feedback_id = feedback.id, error = %e, "Marketplace update failed");
            SyncOutcome::failed(format!("Marketplace update failed: {e}"))
        }
    };

    let Some(update_status) = outcome.update_status else {
        return (outcome, None);
    };

    match FeedbackRepo::record_marketplace_sync(&state.pool, feedback.id, update_status).await {
        Ok(refreshed) => (outcome, refreshed),
        Err(e) => {
            tracing::error!(
                feedback_id = feedback.id,
                error = %e,
                "Failed to record marketplace sync status",
            );
            (outcome, None)
        }
    }
}

/// Operator-initiated re-send, regardless of the previous sync status.
pub async fn resend(state: &AppState, feedback_id: DbId) -> AppResult<(SyncOutcome, Feedback)> {
    let feedback = FeedbackRepo::find_by_id(&state.pool, feedback_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Feedback",
            id: feedback_id,
        })?;

    let (outcome, refreshed) = sync_feedback(state, &feedback).await;
    Ok((outcome, refreshed.unwrap_or(feedback)))
}
