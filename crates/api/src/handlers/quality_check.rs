//! Handlers for quality checks.
//!
//! Every mutation commits first and then re-runs the quality score
//! calculator for the parent feedback.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use millwright_core::error::CoreError;
use millwright_core::quality::{
    resolve_result, summarize, validate_check, QualityResult, QualitySummary,
};
use millwright_core::types::DbId;
use millwright_db::models::quality_check::{
    CreateQualityCheck, QualityCheck, UpdateQualityCheck,
};
use millwright_db::repositories::quality_check_repo::NewQualityCheck;
use millwright_db::repositories::{FeedbackRepo, QualityCheckRepo, StepRepo};
use sqlx::{Postgres, Transaction};

use crate::engine;
use crate::error::{AppError, AppResult};
use crate::handlers::feedback::ensure_feedback_exists;
use crate::middleware::auth::AuthUser;
use crate::response::{DataResponse, DeletedResponse, MutationResponse};
use crate::state::AppState;

/// Maximum checks accepted by one batch request.
const MAX_BATCH_CHECKS: usize = 200;

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

fn parse_result(value: Option<&str>) -> Result<Option<QualityResult>, CoreError> {
    value.map(QualityResult::parse).transpose()
}

/// Turn a create request into the values to store, deriving the result from
/// the measurement when none was given.
pub fn resolve_create(input: &CreateQualityCheck) -> Result<NewQualityCheck, CoreError> {
    if input.check_type.trim().is_empty() {
        return Err(CoreError::Validation("check_type must not be empty".into()));
    }
    validate_check(
        input.min_tolerance,
        input.max_tolerance,
        [
            input.quantity_checked,
            input.quantity_passed,
            input.quantity_rejected,
        ],
    )?;

    let result = resolve_result(
        parse_result(input.result.as_deref())?,
        input.measurement,
        input.min_tolerance,
        input.max_tolerance,
    );

    Ok(NewQualityCheck {
        step_id: input.step_id,
        check_type: input.check_type.trim().to_string(),
        result,
        measurement: input.measurement,
        min_tolerance: input.min_tolerance,
        max_tolerance: input.max_tolerance,
        unit: input.unit.clone(),
        quantity_checked: input.quantity_checked.unwrap_or(0),
        quantity_passed: input.quantity_passed.unwrap_or(0),
        quantity_rejected: input.quantity_rejected.unwrap_or(0),
        inspector_id: input.inspector_id,
        notes: input.notes.clone(),
        checked_at: input.checked_at,
    })
}

/// Result to store after an update.
///
/// An explicit result wins. Touching the measurement or either bound
/// re-derives it from the merged values. Otherwise the stored result stays.
pub fn resolve_update(
    current: &QualityCheck,
    input: &UpdateQualityCheck,
) -> Result<QualityResult, CoreError> {
    if let Some(check_type) = &input.check_type {
        if check_type.trim().is_empty() {
            return Err(CoreError::Validation("check_type must not be empty".into()));
        }
    }

    let measurement = input.measurement.or(current.measurement);
    let min_tolerance = input.min_tolerance.or(current.min_tolerance);
    let max_tolerance = input.max_tolerance.or(current.max_tolerance);
    validate_check(
        min_tolerance,
        max_tolerance,
        [
            input.quantity_checked,
            input.quantity_passed,
            input.quantity_rejected,
        ],
    )?;

    if let Some(explicit) = parse_result(input.result.as_deref())? {
        return Ok(explicit);
    }
    let touched = input.measurement.is_some()
        || input.min_tolerance.is_some()
        || input.max_tolerance.is_some();
    if touched {
        Ok(resolve_result(None, measurement, min_tolerance, max_tolerance))
    } else {
        Ok(current.result())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn lock_feedback(tx: &mut Transaction<'_, Postgres>, feedback_id: DbId) -> AppResult<()> {
    FeedbackRepo::lock(tx, feedback_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Feedback",
            id: feedback_id,
        })?;
    Ok(())
}

async fn ensure_step_belongs(
    state: &AppState,
    step_id: Option<DbId>,
    feedback_id: DbId,
) -> AppResult<()> {
    let Some(step_id) = step_id else {
        return Ok(());
    };
    let step = StepRepo::find_by_id(&state.pool, step_id).await?;
    if step.map_or(true, |s| s.feedback_id != feedback_id) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Step {step_id} does not belong to feedback {feedback_id}"
        ))));
    }
    Ok(())
}

async fn find_check(state: &AppState, id: DbId) -> AppResult<QualityCheck> {
    QualityCheckRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "QualityCheck",
            id,
        }))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/feedback/{id}/quality-checks
pub async fn list_quality_checks(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(feedback_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<QualityCheck>>>> {
    ensure_feedback_exists(&state, feedback_id).await?;
    let checks = QualityCheckRepo::list_for_feedback(&state.pool, feedback_id).await?;
    Ok(Json(DataResponse { data: checks }))
}

/// POST /api/v1/feedback/{id}/quality-checks
pub async fn create_quality_check(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(feedback_id): Path<DbId>,
    Json(mut input): Json<CreateQualityCheck>,
) -> AppResult<(StatusCode, Json<MutationResponse<QualityCheck>>)> {
    input.inspector_id = input.inspector_id.or(Some(auth.user_id));
    let new_check = resolve_create(&input)?;
    ensure_step_belongs(&state, new_check.step_id, feedback_id).await?;

    let mut tx = state.pool.begin().await?;
    lock_feedback(&mut tx, feedback_id).await?;
    let check = QualityCheckRepo::create(&mut tx, feedback_id, &new_check).await?;
    tx.commit().await?;

    tracing::info!(
        feedback_id,
        check_id = check.id,
        result = %check.result,
        user_id = auth.user_id,
        "Quality check recorded",
    );

    let propagation = engine::propagate_quality(&state, feedback_id).await;
    Ok((
        StatusCode::CREATED,
        Json(MutationResponse::new(check, propagation)),
    ))
}

/// POST /api/v1/feedback/{id}/quality-checks/batch
///
/// All-or-nothing; the calculator runs once after the batch commits.
pub async fn create_quality_checks_batch(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(feedback_id): Path<DbId>,
    Json(inputs): Json<Vec<CreateQualityCheck>>,
) -> AppResult<(StatusCode, Json<MutationResponse<Vec<QualityCheck>>>)> {
    if inputs.is_empty() {
        return Err(AppError::BadRequest(
            "Batch must contain at least one quality check".into(),
        ));
    }
    if inputs.len() > MAX_BATCH_CHECKS {
        return Err(AppError::BadRequest(format!(
            "Batch exceeds maximum of {MAX_BATCH_CHECKS} quality checks"
        )));
    }

    let mut new_checks = Vec::with_capacity(inputs.len());
    for mut input in inputs {
        input.inspector_id = input.inspector_id.or(Some(auth.user_id));
        let new_check = resolve_create(&input)?;
        ensure_step_belongs(&state, new_check.step_id, feedback_id).await?;
        new_checks.push(new_check);
    }

    let mut tx = state.pool.begin().await?;
    lock_feedback(&mut tx, feedback_id).await?;
    let mut checks = Vec::with_capacity(new_checks.len());
    for new_check in &new_checks {
        checks.push(QualityCheckRepo::create(&mut tx, feedback_id, new_check).await?);
    }
    tx.commit().await?;

    tracing::info!(
        feedback_id,
        count = checks.len(),
        user_id = auth.user_id,
        "Quality checks recorded in batch",
    );

    let propagation = engine::propagate_quality(&state, feedback_id).await;
    Ok((
        StatusCode::CREATED,
        Json(MutationResponse::new(checks, propagation)),
    ))
}

/// GET /api/v1/feedback/{id}/quality-summary
///
/// Counts by result and by check type, quantity totals, and the score.
pub async fn quality_summary(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(feedback_id): Path<DbId>,
) -> AppResult<Json<DataResponse<QualitySummary>>> {
    ensure_feedback_exists(&state, feedback_id).await?;
    let checks = QualityCheckRepo::list_for_feedback(&state.pool, feedback_id).await?;
    let snapshots: Vec<_> = checks.iter().map(QualityCheck::snapshot).collect();
    Ok(Json(DataResponse {
        data: summarize(&snapshots),
    }))
}

/// GET /api/v1/quality-checks/{id}
pub async fn get_quality_check(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<QualityCheck>>> {
    let check = find_check(&state, id).await?;
    Ok(Json(DataResponse { data: check }))
}

/// PUT /api/v1/quality-checks/{id}
pub async fn update_quality_check(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateQualityCheck>,
) -> AppResult<Json<MutationResponse<QualityCheck>>> {
    let feedback_id = find_check(&state, id).await?.feedback_id;

    let mut tx = state.pool.begin().await?;
    lock_feedback(&mut tx, feedback_id).await?;
    let current = QualityCheckRepo::find_locked(&mut tx, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "QualityCheck",
            id,
        })?;
    let result = resolve_update(&current, &input)?;
    let check = QualityCheckRepo::update(&mut tx, id, &input, result).await?;
    tx.commit().await?;

    tracing::info!(
        feedback_id,
        check_id = id,
        from = %current.result,
        to = %check.result,
        user_id = auth.user_id,
        "Quality check updated",
    );

    let propagation = engine::propagate_quality(&state, feedback_id).await;
    Ok(Json(MutationResponse::new(check, propagation)))
}

/// DELETE /api/v1/quality-checks/{id}
pub async fn delete_quality_check(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<MutationResponse<DeletedResponse>>> {
    let feedback_id = find_check(&state, id).await?.feedback_id;

    let mut tx = state.pool.begin().await?;
    lock_feedback(&mut tx, feedback_id).await?;
    let deleted = QualityCheckRepo::delete(&mut tx, id).await?;
    tx.commit().await?;

    if !deleted {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "QualityCheck",
            id,
        }));
    }

    tracing::info!(feedback_id, check_id = id, user_id = auth.user_id, "Quality check deleted");

    let propagation = engine::propagate_quality(&state, feedback_id).await;
    Ok(Json(MutationResponse::new(
        DeletedResponse { id, deleted },
        propagation,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;

    fn create(result: Option<&str>, measurement: Option<f64>) -> CreateQualityCheck {
        CreateQualityCheck {
            step_id: None,
            check_type: "dimension".into(),
            result: result.map(str::to_string),
            measurement,
            min_tolerance: Some(9.5),
            max_tolerance: Some(10.5),
            unit: Some("mm".into()),
            quantity_checked: Some(20),
            quantity_passed: None,
            quantity_rejected: None,
            inspector_id: None,
            notes: None,
            checked_at: None,
        }
    }

    fn stored(result: QualityResult, measurement: Option<f64>) -> QualityCheck {
        let now = Utc::now();
        QualityCheck {
            id: 1,
            feedback_id: 1,
            step_id: None,
            check_type: "dimension".into(),
            result: result.as_str().into(),
            measurement,
            min_tolerance: Some(9.5),
            max_tolerance: Some(10.5),
            unit: Some("mm".into()),
            quantity_checked: 20,
            quantity_passed: 0,
            quantity_rejected: 0,
            inspector_id: None,
            notes: None,
            checked_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn create_derives_result_from_measurement() {
        let check = resolve_create(&create(None, Some(10.1))).unwrap();
        assert_eq!(check.result, QualityResult::Passed);
        assert_eq!(check.quantity_checked, 20);
        assert_eq!(check.quantity_passed, 0);

        let check = resolve_create(&create(None, Some(12.0))).unwrap();
        assert_eq!(check.result, QualityResult::Failed);
    }

    #[test]
    fn create_keeps_explicit_result() {
        let check = resolve_create(&create(Some("waived"), Some(12.0))).unwrap();
        assert_eq!(check.result, QualityResult::Waived);
    }

    #[test]
    fn create_rejects_unknown_result() {
        assert_matches!(
            resolve_create(&create(Some("maybe"), None)),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn new_measurement_rederives_result() {
        let current = stored(QualityResult::Passed, Some(10.0));
        let input = UpdateQualityCheck {
            measurement: Some(11.0),
            ..UpdateQualityCheck::default()
        };
        assert_eq!(resolve_update(&current, &input).unwrap(), QualityResult::Failed);
    }

    #[test]
    fn unrelated_update_keeps_result() {
        let current = stored(QualityResult::Waived, Some(11.0));
        let input = UpdateQualityCheck {
            notes: Some("customer accepted".into()),
            ..UpdateQualityCheck::default()
        };
        assert_eq!(resolve_update(&current, &input).unwrap(), QualityResult::Waived);
    }

    #[test]
    fn inverted_bounds_after_merge_rejected() {
        let current = stored(QualityResult::Pending, None);
        let input = UpdateQualityCheck {
            min_tolerance: Some(11.0),
            ..UpdateQualityCheck::default()
        };
        assert!(resolve_update(&current, &input).is_err());
    }
}
