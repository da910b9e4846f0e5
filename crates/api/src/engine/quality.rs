//! Quality score calculator.

use millwright_core::error::CoreError;
use millwright_core::quality::compute_quality_score;
use millwright_core::types::DbId;
use millwright_db::models::feedback::Feedback;
use millwright_db::repositories::{FeedbackRepo, QualityCheckRepo};
use sqlx::PgPool;

use crate::error::AppResult;

/// Recompute `quality_score` from every check on the feedback.
///
/// With no checks the score is cleared. Runs under the same feedback row
/// lock as the status aggregator and has no further side effects.
pub async fn recompute_quality(pool: &PgPool, feedback_id: DbId) -> AppResult<Feedback> {
    let mut tx = pool.begin().await?;

    let current = FeedbackRepo::lock(&mut tx, feedback_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Feedback",
            id: feedback_id,
        })?;

    let results = QualityCheckRepo::results(&mut tx, feedback_id).await?;
    let score = compute_quality_score(&results);

    let feedback = if score == current.quality_score {
        current
    } else {
        let updated = FeedbackRepo::set_quality_score(&mut tx, feedback_id, score).await?;
        tracing::info!(
            feedback_id,
            checks = results.len(),
            score = ?score,
            "Quality score recomputed",
        );
        updated
    };

    tx.commit().await?;
    Ok(feedback)
}
