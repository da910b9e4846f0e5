//! Notification models and DTOs.

use millwright_core::error::CoreError;
use millwright_core::notifications::Recipient;
use millwright_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub notification_uid: uuid::Uuid,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub recipient_type: String,
    pub recipient_id: Option<DbId>,
    pub recipient_role: Option<String>,
    pub recipient_email: Option<String>,
    pub priority: String,
    pub delivery_method: String,
    pub feedback_id: Option<DbId>,
    pub comment_id: Option<DbId>,
    pub metadata: serde_json::Value,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub is_delivered: bool,
    pub delivered_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl Notification {
    pub fn recipient(&self) -> Result<Recipient, CoreError> {
        Recipient::from_columns(
            &self.recipient_type,
            self.recipient_id,
            self.recipient_role.as_deref(),
            self.recipient_email.as_deref(),
        )
    }
}

/// DTO for a hand-written notification.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateNotification {
    pub notification_type: Option<String>,
    pub title: String,
    pub message: String,
    pub recipient_type: String,
    pub recipient_id: Option<DbId>,
    pub recipient_role: Option<String>,
    pub recipient_email: Option<String>,
    pub priority: Option<String>,
    pub delivery_method: Option<String>,
    pub feedback_id: Option<DbId>,
    pub metadata: Option<serde_json::Value>,
}

/// Query parameters for listing the caller's notifications.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Identifies the caller whose notifications are being read or modified.
///
/// A notification is in scope when addressed to `user_id` or to `role`.
#[derive(Debug, Clone, Copy)]
pub struct RecipientScope<'a> {
    pub user_id: DbId,
    pub role: &'a str,
}
