//! Notification dispatcher.
//!
//! Persists routed drafts and, when the delivery method includes email,
//! makes one synchronous attempt through the configured [`EmailChannel`].
//! The row is created whether or not the email goes out; `is_delivered`
//! records the outcome and stays `false` if recording it fails. There is no
//! retry.
//!
//! [`EmailChannel`]: millwright_events::EmailChannel

use millwright_core::notifications::NotificationDraft;
use millwright_db::models::notification::Notification;
use millwright_db::repositories::NotificationRepo;
use millwright_events::EmailMessage;

use crate::state::AppState;

/// Persist one notification and attempt email delivery if requested.
pub async fn dispatch(
    state: &AppState,
    draft: &NotificationDraft,
) -> Result<Notification, sqlx::Error> {
    let mut notification = NotificationRepo::create(&state.pool, draft).await?;

    tracing::info!(
        notification_id = notification.id,
        notification_type = draft.notification_type.as_str(),
        recipient_type = draft.recipient.recipient_type().as_str(),
        feedback_id = ?draft.feedback_id,
        "Notification created",
    );

    if draft.delivery_method.includes_email() && deliver_email(state, &notification, draft).await
    {
        // email already sent; a failed flag update is logged, not returned
        match NotificationRepo::mark_delivered(&state.pool, notification.id).await {
            Ok(()) => {
                notification.is_delivered = true;
                notification.delivered_at = Some(chrono::Utc::now());
            }
            Err(e) => tracing::error!(
                notification_id = notification.id,
                error = %e,
                "Email sent but delivery flag not recorded",
            ),
        }
    }

    Ok(notification)
}

/// Dispatch every draft, logging and skipping the ones that fail to persist.
pub async fn dispatch_all(state: &AppState, drafts: &[NotificationDraft]) -> Vec<Notification> {
    let mut created = Vec::with_capacity(drafts.len());
    for draft in drafts {
        match dispatch(state, draft).await {
            Ok(notification) => created.push(notification),
            Err(e) => tracing::error!(
                notification_type = draft.notification_type.as_str(),
                feedback_id = ?draft.feedback_id,
                error = %e,
                "Failed to create notification",
            ),
        }
    }
    created
}

/// One email attempt. Returns `true` when the channel accepted the message.
async fn deliver_email(
    state: &AppState,
    notification: &Notification,
    draft: &NotificationDraft,
) -> bool {
    let Some(channel) = &state.email else {
        tracing::warn!(
            notification_id = notification.id,
            "Email delivery requested but no email channel is configured",
        );
        return false;
    };

    let message = EmailMessage {
        recipient: draft.recipient.clone(),
        subject: draft.title.clone(),
        body: draft.message.clone(),
        priority: draft.priority,
    };

    match channel.send(&message).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(
                notification_id = notification.id,
                error = %e,
                "Notification email delivery failed",
            );
            false
        }
    }
}
