//! Handlers for the `/feedback` resource.
//!
//! Derived fields (status, completion, quantities, quality score) are never
//! accepted from clients; they only change through the propagation engine.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use millwright_core::error::CoreError;
use millwright_core::feedback::{
    generate_feedback_uid, validate_date_range, validate_notes, validate_production_id,
    validate_quantity, FeedbackStatus,
};
use millwright_core::notifications::{route_issue, validate_manual, IssueEvent, IssueSeverity};
use millwright_core::types::DbId;
use millwright_db::models::feedback::{
    CreateFeedback, Feedback, FeedbackFilter, FeedbackPage, MarketplaceSyncStatus, UpdateFeedback,
};
use millwright_db::models::notification::Notification;
use millwright_db::repositories::{FeedbackRepo, StepRepo};
use millwright_db::{clamp_limit, clamp_offset};

use crate::engine::{self, aggregator, dispatcher, effects, synchronizer, Propagation};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireManager;
use crate::query::{DEFAULT_LIMIT, MAX_LIMIT};
use crate::response::{DataResponse, MutationResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load a feedback record or fail with 404.
pub(crate) async fn ensure_feedback_exists(state: &AppState, id: DbId) -> AppResult<Feedback> {
    FeedbackRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Feedback",
            id,
        }))
}

fn validate_user_fields(
    quantity_ordered: Option<i32>,
    start_date: Option<millwright_core::types::Timestamp>,
    estimated_completion_date: Option<millwright_core::types::Timestamp>,
    notes: Option<&str>,
    customer_notes: Option<&str>,
) -> Result<(), CoreError> {
    validate_quantity("quantity_ordered", quantity_ordered)?;
    validate_date_range(
        "start_date/estimated_completion_date",
        start_date,
        estimated_completion_date,
    )?;
    validate_notes("notes", notes)?;
    validate_notes("customer_notes", customer_notes)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// POST /api/v1/feedback
///
/// Create a feedback record for a production batch. The record starts
/// `pending` at 0%. Returns 409 if one already exists for the production id.
pub async fn create_feedback(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateFeedback>,
) -> AppResult<(StatusCode, Json<DataResponse<Feedback>>)> {
    validate_production_id(&input.production_id)?;
    validate_user_fields(
        input.quantity_ordered,
        input.start_date,
        input.estimated_completion_date,
        input.notes.as_deref(),
        input.customer_notes.as_deref(),
    )?;

    // uq_production_feedback_production_id turns a duplicate into a 409
    let uid = generate_feedback_uid();
    let feedback = FeedbackRepo::create(&state.pool, &uid, &input, auth.user_id).await?;

    tracing::info!(
        feedback_id = feedback.id,
        feedback_uid = %feedback.feedback_uid,
        production_id = %feedback.production_id,
        user_id = auth.user_id,
        "Feedback created",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: feedback })))
}

/// GET /api/v1/feedback?status=&from=&to=&product=&batch=&limit=&offset=
pub async fn list_feedback(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<FeedbackFilter>,
) -> AppResult<Json<DataResponse<FeedbackPage>>> {
    if let Some(status) = &filter.status {
        FeedbackStatus::parse(status)?;
    }
    validate_date_range("from/to", filter.from, filter.to)?;

    let limit = clamp_limit(filter.limit, DEFAULT_LIMIT, MAX_LIMIT);
    let offset = clamp_offset(filter.offset);
    let (items, total) = FeedbackRepo::list(&state.pool, &filter, limit, offset).await?;

    Ok(Json(DataResponse {
        data: FeedbackPage {
            items,
            total,
            limit,
            offset,
        },
    }))
}

/// GET /api/v1/feedback/{id}
pub async fn get_feedback(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Feedback>>> {
    let feedback = ensure_feedback_exists(&state, id).await?;
    Ok(Json(DataResponse { data: feedback }))
}

/// GET /api/v1/feedback/by-uid/{uid}
pub async fn get_feedback_by_uid(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> AppResult<Json<DataResponse<Feedback>>> {
    let feedback = FeedbackRepo::find_by_uid(&state.pool, &uid)
        .await?
        .ok_or(CoreError::NotFoundByKey {
            entity: "Feedback",
            key: uid,
        })?;
    Ok(Json(DataResponse { data: feedback }))
}

/// GET /api/v1/feedback/by-production/{production_id}
pub async fn get_feedback_by_production(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(production_id): Path<String>,
) -> AppResult<Json<DataResponse<Feedback>>> {
    let feedback = FeedbackRepo::find_by_production_id(&state.pool, &production_id)
        .await?
        .ok_or(CoreError::NotFoundByKey {
            entity: "Feedback for production",
            key: production_id,
        })?;
    Ok(Json(DataResponse { data: feedback }))
}

/// GET /api/v1/feedback/by-batch/{batch_id}
pub async fn list_feedback_by_batch(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> AppResult<Json<DataResponse<Vec<Feedback>>>> {
    let items = FeedbackRepo::list_by_batch(&state.pool, &batch_id).await?;
    Ok(Json(DataResponse { data: items }))
}

/// PUT /api/v1/feedback/{id}
///
/// Update user-settable fields, then re-run the status aggregator so the
/// derived fields are never left stale.
pub async fn update_feedback(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateFeedback>,
) -> AppResult<Json<MutationResponse<Feedback>>> {
    validate_user_fields(
        input.quantity_ordered,
        input.start_date,
        input.estimated_completion_date,
        input.notes.as_deref(),
        input.customer_notes.as_deref(),
    )?;
    validate_date_range("start_date/end_date", input.start_date, input.end_date)?;

    let updated = FeedbackRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Feedback",
            id,
        })?;

    tracing::info!(feedback_id = id, user_id = auth.user_id, "Feedback updated");

    let mut propagation = engine::propagate_steps(&state, id).await;
    let data = propagation.feedback.take().unwrap_or(updated);
    Ok(Json(MutationResponse::new(data, propagation)))
}

/// DELETE /api/v1/feedback/{id}
///
/// Soft-delete: moves the record to `cancelled`, which notifies the
/// production manager role and pushes to the marketplace.
pub async fn cancel_feedback(
    RequireManager(user): RequireManager,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<MutationResponse<Feedback>>> {
    let recomputed = aggregator::cancel(&state.pool, id).await?;
    tracing::info!(feedback_id = id, user_id = user.user_id, "Feedback cancel requested");

    let outcome = effects::run(&state, recomputed.feedback, recomputed.effects).await;
    Ok(Json(MutationResponse::new(
        outcome.feedback,
        Propagation {
            marketplace_update: outcome.marketplace_update,
            ..Propagation::default()
        },
    )))
}

// ---------------------------------------------------------------------------
// Marketplace sync
// ---------------------------------------------------------------------------

/// GET /api/v1/feedback/{id}/marketplace-sync
pub async fn get_marketplace_sync(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<MarketplaceSyncStatus>>> {
    let feedback = ensure_feedback_exists(&state, id).await?;
    Ok(Json(DataResponse {
        data: MarketplaceSyncStatus::from(&feedback),
    }))
}

/// POST /api/v1/feedback/{id}/marketplace-sync
///
/// Manual re-send. Still refused when the record has no batch id or is pending.
pub async fn resend_marketplace_sync(
    RequireManager(user): RequireManager,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<MutationResponse<Feedback>>> {
    let (outcome, feedback) = synchronizer::resend(&state, id).await?;
    tracing::info!(
        feedback_id = id,
        user_id = user.user_id,
        success = outcome.success,
        "Manual marketplace sync requested",
    );

    Ok(Json(MutationResponse::new(
        feedback,
        Propagation {
            marketplace_update: Some(outcome),
            ..Propagation::default()
        },
    )))
}

/// POST /api/v1/feedback/{id}/recompute
///
/// Force a run of the status aggregator and the quality score calculator.
pub async fn recompute_feedback(
    RequireManager(_user): RequireManager,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<MutationResponse<Feedback>>> {
    let existing = ensure_feedback_exists(&state, id).await?;

    let mut propagation = engine::propagate_all(&state, id).await;
    let data = propagation.feedback.take().unwrap_or(existing);
    Ok(Json(MutationResponse::new(data, propagation)))
}

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

/// Request body for `POST /feedback/{id}/issues`.
#[derive(Debug, Deserialize)]
pub struct ReportIssue {
    pub severity: IssueSeverity,
    pub title: String,
    pub description: String,
    pub step_id: Option<DbId>,
}

/// POST /api/v1/feedback/{id}/issues
///
/// Report a production issue. Creates a notification for the production
/// manager role; critical issues are high priority and also emailed.
pub async fn report_issue(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ReportIssue>,
) -> AppResult<(StatusCode, Json<DataResponse<Notification>>)> {
    validate_manual(&input.title, &input.description)?;
    let feedback = ensure_feedback_exists(&state, id).await?;

    if let Some(step_id) = input.step_id {
        let step = StepRepo::find_by_id(&state.pool, step_id).await?;
        if step.map_or(true, |s| s.feedback_id != id) {
            return Err(AppError::Core(CoreError::Validation(format!(
                "Step {step_id} does not belong to feedback {id}"
            ))));
        }
    }

    let draft = route_issue(
        feedback.feedback_ref(),
        IssueEvent {
            severity: input.severity,
            title: &input.title,
            description: &input.description,
            step_id: input.step_id,
            reported_by: auth.user_id,
        },
    );
    let notification = dispatcher::dispatch(&state, &draft).await?;

    tracing::info!(
        feedback_id = id,
        severity = input.severity.as_str(),
        notification_id = notification.id,
        "Production issue reported",
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse { data: notification }),
    ))
}
