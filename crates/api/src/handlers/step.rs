//! Handlers for production steps.
//!
//! Every mutation commits first and then re-runs the status aggregator for
//! the parent feedback. Step and feedback rows are locked feedback-first, the
//! same order the aggregator uses.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use millwright_core::error::CoreError;
use millwright_core::feedback::{validate_date_range, validate_quantity};
use millwright_core::steps::{
    duration_secs, stamp_transition, validate_unique_indexes, StepStatus, StepTimestamps,
    StepTransition,
};
use millwright_core::types::{DbId, Timestamp};
use millwright_db::models::step::{CreateStep, Step, StepWrite, UpdateStep};
use millwright_db::repositories::{FeedbackRepo, StepRepo};
use sqlx::{Postgres, Transaction};

use crate::engine;
use crate::error::{AppError, AppResult};
use crate::handlers::feedback::ensure_feedback_exists;
use crate::middleware::auth::AuthUser;
use crate::response::{DataResponse, DeletedResponse, MutationResponse};
use crate::state::AppState;

/// Maximum steps accepted by one batch request.
const MAX_BATCH_STEPS: usize = 200;

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

fn validate_quantities(
    processed: Option<i32>,
    passed: Option<i32>,
    rejected: Option<i32>,
) -> Result<(), CoreError> {
    validate_quantity("quantity_processed", processed)?;
    validate_quantity("quantity_passed", passed)?;
    validate_quantity("quantity_rejected", rejected)
}

fn validate_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation("Step name must not be empty".into()));
    }
    Ok(())
}

fn finish(
    mut write: StepWrite,
    transition: Option<StepTransition>,
    now: Timestamp,
) -> Result<StepWrite, CoreError> {
    if let Some(transition) = transition {
        let stamped = stamp_transition(
            transition,
            StepTimestamps {
                started_at: write.started_at,
                ended_at: write.ended_at,
            },
            now,
        );
        write.started_at = stamped.started_at;
        write.ended_at = stamped.ended_at;
    }
    validate_date_range("started_at/ended_at", write.started_at, write.ended_at)?;
    write.duration_secs = duration_secs(write.started_at, write.ended_at);
    Ok(write)
}

/// Turn a create request into the values to store.
pub fn resolve_create(input: &CreateStep, now: Timestamp) -> Result<StepWrite, CoreError> {
    validate_name(&input.name)?;
    validate_unique_indexes(&[input.step_index])?;
    validate_quantities(
        input.quantity_processed,
        input.quantity_passed,
        input.quantity_rejected,
    )?;
    let status = match &input.status {
        Some(s) => StepStatus::parse(s)?,
        None => StepStatus::Pending,
    };

    let write = StepWrite {
        step_index: input.step_index,
        name: input.name.trim().to_string(),
        description: input.description.clone(),
        status,
        machine_id: input.machine_id.clone(),
        operator_id: input.operator_id,
        started_at: input.started_at,
        ended_at: input.ended_at,
        duration_secs: None,
        quantity_processed: input.quantity_processed.unwrap_or(0),
        quantity_passed: input.quantity_passed.unwrap_or(0),
        quantity_rejected: input.quantity_rejected.unwrap_or(0),
        notes: input.notes.clone(),
    };
    let transition = StepTransition {
        from: None,
        to: status,
        explicit_end: input.ended_at.is_some(),
    };
    finish(write, Some(transition), now)
}

/// Merge an update into the current step. Timestamps are stamped only when
/// the status actually changes; re-opening a finished step drops its old end.
pub fn resolve_update(
    current: &Step,
    input: &UpdateStep,
    now: Timestamp,
) -> Result<StepWrite, CoreError> {
    if let Some(name) = &input.name {
        validate_name(name)?;
    }
    if let Some(index) = input.step_index {
        validate_unique_indexes(&[index])?;
    }
    validate_quantities(
        input.quantity_processed,
        input.quantity_passed,
        input.quantity_rejected,
    )?;

    let status = match &input.status {
        Some(s) => StepStatus::parse(s)?,
        None => current.status(),
    };
    let transition = (status != current.status()).then_some(StepTransition {
        from: Some(current.status()),
        to: status,
        explicit_end: input.ended_at.is_some(),
    });

    let write = StepWrite {
        step_index: input.step_index.unwrap_or(current.step_index),
        name: input
            .name
            .as_deref()
            .map_or_else(|| current.name.clone(), |n| n.trim().to_string()),
        description: input.description.clone().or_else(|| current.description.clone()),
        status,
        machine_id: input.machine_id.clone().or_else(|| current.machine_id.clone()),
        operator_id: input.operator_id.or(current.operator_id),
        started_at: input.started_at.or(current.started_at),
        ended_at: input.ended_at.or(current.ended_at),
        duration_secs: None,
        quantity_processed: input.quantity_processed.unwrap_or(current.quantity_processed),
        quantity_passed: input.quantity_passed.unwrap_or(current.quantity_passed),
        quantity_rejected: input.quantity_rejected.unwrap_or(current.quantity_rejected),
        notes: input.notes.clone().or_else(|| current.notes.clone()),
    };
    finish(write, transition, now)
}

// ---------------------------------------------------------------------------
// Transaction helpers
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

async fn ensure_index_free(
    tx: &mut Transaction<'_, Postgres>,
    feedback_id: DbId,
    step_index: i32,
    exclude_id: Option<DbId>,
) -> AppResult<()> {
    if StepRepo::index_in_use(tx, feedback_id, step_index, exclude_id).await? {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Step index {step_index} is already used by another step of feedback {feedback_id}"
        ))));
    }
    Ok(())
}

async fn find_step(state: &AppState, id: DbId) -> AppResult<Step> {
    StepRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Step", id }))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/feedback/{id}/steps
pub async fn list_steps(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(feedback_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Step>>>> {
    ensure_feedback_exists(&state, feedback_id).await?;
    let steps = StepRepo::list_for_feedback(&state.pool, feedback_id).await?;
    Ok(Json(DataResponse { data: steps }))
}

/// POST /api/v1/feedback/{id}/steps
pub async fn create_step(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(feedback_id): Path<DbId>,
    Json(input): Json<CreateStep>,
) -> AppResult<(StatusCode, Json<MutationResponse<Step>>)> {
    let write = resolve_create(&input, chrono::Utc::now())?;

    let mut tx = state.pool.begin().await?;
    lock_feedback(&mut tx, feedback_id).await?;
    ensure_index_free(&mut tx, feedback_id, write.step_index, None).await?;
    let step = StepRepo::create(&mut tx, feedback_id, &write).await?;
    tx.commit().await?;

    tracing::info!(
        feedback_id,
        step_id = step.id,
        step_index = step.step_index,
        status = %step.status,
        user_id = auth.user_id,
        "Step created",
    );

    let propagation = engine::propagate_steps(&state, feedback_id).await;
    Ok((
        StatusCode::CREATED,
        Json(MutationResponse::new(step, propagation)),
    ))
}

/// POST /api/v1/feedback/{id}/steps/batch
///
/// All-or-nothing: any invalid or conflicting step rejects the whole batch.
/// The aggregator runs once after the batch commits.
pub async fn create_steps_batch(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(feedback_id): Path<DbId>,
    Json(inputs): Json<Vec<CreateStep>>,
) -> AppResult<(StatusCode, Json<MutationResponse<Vec<Step>>>)> {
    if inputs.is_empty() {
        return Err(AppError::BadRequest(
            "Batch must contain at least one step".into(),
        ));
    }
    if inputs.len() > MAX_BATCH_STEPS {
        return Err(AppError::BadRequest(format!(
            "Batch exceeds maximum of {MAX_BATCH_STEPS} steps"
        )));
    }

    let indexes: Vec<i32> = inputs.iter().map(|s| s.step_index).collect();
    validate_unique_indexes(&indexes)?;

    let now = chrono::Utc::now();
    let writes = inputs
        .iter()
        .map(|input| resolve_create(input, now))
        .collect::<Result<Vec<_>, _>>()?;

    let mut tx = state.pool.begin().await?;
    lock_feedback(&mut tx, feedback_id).await?;
    let mut steps = Vec::with_capacity(writes.len());
    for write in &writes {
        ensure_index_free(&mut tx, feedback_id, write.step_index, None).await?;
        steps.push(StepRepo::create(&mut tx, feedback_id, write).await?);
    }
    tx.commit().await?;

    tracing::info!(
        feedback_id,
        count = steps.len(),
        user_id = auth.user_id,
        "Steps created in batch",
    );

    let propagation = engine::propagate_steps(&state, feedback_id).await;
    Ok((
        StatusCode::CREATED,
        Json(MutationResponse::new(steps, propagation)),
    ))
}

/// GET /api/v1/steps/{id}
pub async fn get_step(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Step>>> {
    let step = find_step(&state, id).await?;
    Ok(Json(DataResponse { data: step }))
}

/// PUT /api/v1/steps/{id}
pub async fn update_step(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateStep>,
) -> AppResult<Json<MutationResponse<Step>>> {
    let feedback_id = find_step(&state, id).await?.feedback_id;

    let mut tx = state.pool.begin().await?;
    lock_feedback(&mut tx, feedback_id).await?;
    let current = StepRepo::find_locked(&mut tx, id)
        .await?
        .ok_or(CoreError::NotFound { entity: "Step", id })?;

    let write = resolve_update(&current, &input, chrono::Utc::now())?;
    if write.step_index != current.step_index {
        ensure_index_free(&mut tx, feedback_id, write.step_index, Some(id)).await?;
    }
    let step = StepRepo::update(&mut tx, id, &write).await?;
    tx.commit().await?;

    tracing::info!(
        feedback_id,
        step_id = id,
        from = %current.status,
        to = %step.status,
        user_id = auth.user_id,
        "Step updated",
    );

    let propagation = engine::propagate_steps(&state, feedback_id).await;
    Ok(Json(MutationResponse::new(step, propagation)))
}

/// DELETE /api/v1/steps/{id}
///
/// Soft-delete; the step stops counting toward aggregation immediately.
pub async fn delete_step(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<MutationResponse<DeletedResponse>>> {
    let feedback_id = find_step(&state, id).await?.feedback_id;

    let mut tx = state.pool.begin().await?;
    lock_feedback(&mut tx, feedback_id).await?;
    let deleted = StepRepo::soft_delete(&mut tx, id).await?;
    tx.commit().await?;

    if !deleted {
        return Err(AppError::Core(CoreError::NotFound { entity: "Step", id }));
    }

    tracing::info!(feedback_id, step_id = id, user_id = auth.user_id, "Step deleted");

    let propagation = engine::propagate_steps(&state, feedback_id).await;
    Ok(Json(MutationResponse::new(
        DeletedResponse { id, deleted },
        propagation,
    )))
}
