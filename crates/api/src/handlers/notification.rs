//! Handlers for notifications.
//!
//! A caller sees notifications addressed to their user id or to the role in
//! their token. Email-addressed notifications are outbound only and never
//! appear in a caller's list. Managers may additionally list everything
//! attached to a feedback record.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use millwright_core::error::CoreError;
use millwright_core::notifications::{
    validate_manual, DeliveryMethod, NotificationDraft, NotificationType, Priority, Recipient,
};
use millwright_core::roles::is_manager;
use millwright_core::types::DbId;
use millwright_db::models::notification::{CreateNotification, Notification, NotificationQuery};
use millwright_db::repositories::NotificationRepo;
use millwright_db::{clamp_limit, clamp_offset};

use crate::engine::dispatcher;
use crate::error::{AppError, AppResult};
use crate::handlers::feedback::ensure_feedback_exists;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireManager;
use crate::query::{DEFAULT_LIMIT, MAX_LIMIT};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /notifications/read`.
#[derive(Debug, Deserialize)]
pub struct MarkReadRequest {
    pub ids: Vec<DbId>,
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub marked_read: u64,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub count: i64,
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Notification",
        id,
    })
}

/// Build a draft from a hand-written notification request.
pub fn draft_from_request(input: &CreateNotification) -> Result<NotificationDraft, CoreError> {
    validate_manual(&input.title, &input.message)?;

    let recipient = Recipient::from_columns(
        &input.recipient_type,
        input.recipient_id,
        input.recipient_role.as_deref(),
        input.recipient_email.as_deref(),
    )?;
    let notification_type = match &input.notification_type {
        Some(t) => NotificationType::parse(t)?,
        None => NotificationType::General,
    };
    let priority = match &input.priority {
        Some(p) => Priority::parse(p)?,
        None => Priority::Medium,
    };
    let delivery_method = match &input.delivery_method {
        Some(d) => DeliveryMethod::parse(d)?,
        None => DeliveryMethod::InApp,
    };

    Ok(NotificationDraft {
        notification_type,
        title: input.title.trim().to_string(),
        message: input.message.clone(),
        recipient,
        priority,
        delivery_method,
        feedback_id: input.feedback_id,
        comment_id: None,
        metadata: input
            .metadata
            .clone()
            .unwrap_or_else(|| serde_json::json!({})),
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/feedback/{id}/notifications
pub async fn list_feedback_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(feedback_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Notification>>>> {
    ensure_feedback_exists(&state, feedback_id).await?;
    let mut notifications = NotificationRepo::list_for_feedback(&state.pool, feedback_id).await?;

    if !is_manager(&auth.role) {
        notifications.retain(|n| {
            n.recipient()
                .is_ok_and(|r| r.is_visible_to(auth.user_id, &auth.role))
        });
    }

    Ok(Json(DataResponse {
        data: notifications,
    }))
}

/// GET /api/v1/notifications?unread_only=&limit=&offset=
pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<NotificationQuery>,
) -> AppResult<Json<DataResponse<Vec<Notification>>>> {
    let limit = clamp_limit(params.limit, DEFAULT_LIMIT, MAX_LIMIT);
    let offset = clamp_offset(params.offset);

    let notifications = NotificationRepo::list_for_recipient(
        &state.pool,
        auth.scope(),
        params.unread_only,
        limit,
        offset,
    )
    .await?;

    Ok(Json(DataResponse {
        data: notifications,
    }))
}

/// GET /api/v1/notifications/unread-count
pub async fn unread_count(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<UnreadCount>>> {
    let count = NotificationRepo::unread_count(&state.pool, auth.scope()).await?;
    Ok(Json(DataResponse {
        data: UnreadCount { count },
    }))
}

/// POST /api/v1/notifications
///
/// Hand-written notification. Email delivery is attempted when requested.
pub async fn create_notification(
    RequireManager(user): RequireManager,
    State(state): State<AppState>,
    Json(input): Json<CreateNotification>,
) -> AppResult<(StatusCode, Json<DataResponse<Notification>>)> {
    let draft = draft_from_request(&input)?;
    if let Some(feedback_id) = draft.feedback_id {
        ensure_feedback_exists(&state, feedback_id).await?;
    }

    let notification = dispatcher::dispatch(&state, &draft).await?;
    tracing::info!(
        notification_id = notification.id,
        user_id = user.user_id,
        "Manual notification created",
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse { data: notification }),
    ))
}

/// POST /api/v1/notifications/{id}/read
///
/// Returns 204 when the notification is in the caller's scope (marking an
/// already-read one is a no-op), 404 otherwise.
pub async fn mark_read(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if NotificationRepo::mark_read(&state.pool, id, auth.scope()).await? {
        return Ok(StatusCode::NO_CONTENT);
    }

    let visible = NotificationRepo::find_by_id(&state.pool, id)
        .await?
        .and_then(|n| n.recipient().ok())
        .is_some_and(|r| r.is_visible_to(auth.user_id, &auth.role));
    if visible {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}

/// POST /api/v1/notifications/read
///
/// Ids outside the caller's scope are skipped silently.
pub async fn mark_many_read(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<MarkReadRequest>,
) -> AppResult<Json<DataResponse<MarkedRead>>> {
    let marked_read =
        NotificationRepo::mark_many_read(&state.pool, &input.ids, auth.scope()).await?;
    Ok(Json(DataResponse {
        data: MarkedRead { marked_read },
    }))
}

/// POST /api/v1/notifications/read-all
pub async fn mark_all_read(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<MarkedRead>>> {
    let marked_read = NotificationRepo::mark_all_read(&state.pool, auth.scope()).await?;
    Ok(Json(DataResponse {
        data: MarkedRead { marked_read },
    }))
}

/// DELETE /api/v1/notifications/{id}
pub async fn delete_notification(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if NotificationRepo::delete(&state.pool, id, auth.scope()).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}
