//! Repository for the `notifications` table.
//!
//! Reads and writes on behalf of a caller are scoped with
//! [`RecipientScope`]: a row is visible when it is addressed to the caller's
//! user id or to the caller's role.

use millwright_core::notifications::{NotificationDraft, Recipient};
use millwright_core::types::DbId;
use sqlx::PgPool;

use crate::models::notification::{Notification, RecipientScope};

/// Column list for `notifications` queries.
const COLUMNS: &str = "id, notification_uid, notification_type, title, message, \
    recipient_type, recipient_id, recipient_role, recipient_email, priority, delivery_method, \
    feedback_id, comment_id, metadata, is_read, read_at, is_delivered, delivered_at, created_at";

/// Recipient filter bound to `$1` (user id) and `$2` (role).
const SCOPE_CLAUSE: &str = "((recipient_type = 'user' AND recipient_id = $1) \
    OR (recipient_type = 'role' AND recipient_role = $2))";

/// Provides data access for notifications.
pub struct NotificationRepo;

impl NotificationRepo {
    /// Persist a routed draft with a fresh opaque identifier, unread and undelivered.
    pub async fn create(
        pool: &PgPool,
        draft: &NotificationDraft,
    ) -> Result<Notification, sqlx::Error> {
        let (recipient_id, recipient_role, recipient_email) = match &draft.recipient {
            Recipient::User(id) => (Some(*id), None, None),
            Recipient::Role(role) => (None, Some(role.as_str()), None),
            Recipient::Email(email) => (None, None, Some(email.as_str())),
        };
        let query = format!(
            "INSERT INTO notifications \
                (notification_uid, notification_type, title, message, recipient_type, \
                 recipient_id, recipient_role, recipient_email, priority, delivery_method, \
                 feedback_id, comment_id, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(uuid::Uuid::new_v4())
            .bind(draft.notification_type.as_str())
            .bind(&draft.title)
            .bind(&draft.message)
            .bind(draft.recipient.recipient_type().as_str())
            .bind(recipient_id)
            .bind(recipient_role)
            .bind(recipient_email)
            .bind(draft.priority.as_str())
            .bind(draft.delivery_method.as_str())
            .bind(draft.feedback_id)
            .bind(draft.comment_id)
            .bind(&draft.metadata)
            .fetch_one(pool)
            .await
    }

    /// Find a notification by ID regardless of recipient.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Notification>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notifications WHERE id = $1");
        sqlx::query_as::<_, Notification>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List notifications attached to a feedback record, newest first.
    pub async fn list_for_feedback(
        pool: &PgPool,
        feedback_id: DbId,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE feedback_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(feedback_id)
            .fetch_all(pool)
            .await
    }

    /// List notifications addressed to the caller's user id or role.
    ///
    /// When `unread_only` is `true`, only notifications with `is_read = false`
    /// are returned.
    pub async fn list_for_recipient(
        pool: &PgPool,
        scope: RecipientScope<'_>,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let filter = if unread_only {
            "AND is_read = false"
        } else {
            ""
        };
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE {SCOPE_CLAUSE} {filter} \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(scope.user_id)
            .bind(scope.role)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Get the number of unread notifications in the caller's scope.
    pub async fn unread_count(
        pool: &PgPool,
        scope: RecipientScope<'_>,
    ) -> Result<i64, sqlx::Error> {
        let query =
            format!("SELECT COUNT(*) FROM notifications WHERE {SCOPE_CLAUSE} AND is_read = false");
        sqlx::query_scalar(&query)
            .bind(scope.user_id)
            .bind(scope.role)
            .fetch_one(pool)
            .await
    }

    /// Mark a single notification as read.
    ///
    /// Returns `true` if the notification was in scope and unread.
    pub async fn mark_read(
        pool: &PgPool,
        id: DbId,
        scope: RecipientScope<'_>,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "UPDATE notifications SET is_read = true, read_at = NOW() \
             WHERE id = $3 AND {SCOPE_CLAUSE} AND is_read = false"
        );
        let result = sqlx::query(&query)
            .bind(scope.user_id)
            .bind(scope.role)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark the given notifications as read, skipping any outside the scope.
    ///
    /// Returns the number of notifications that were marked read.
    pub async fn mark_many_read(
        pool: &PgPool,
        ids: &[DbId],
        scope: RecipientScope<'_>,
    ) -> Result<u64, sqlx::Error> {
        let query = format!(
            "UPDATE notifications SET is_read = true, read_at = NOW() \
             WHERE id = ANY($3) AND {SCOPE_CLAUSE} AND is_read = false"
        );
        let result = sqlx::query(&query)
            .bind(scope.user_id)
            .bind(scope.role)
            .bind(ids)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Mark every unread notification in scope as read.
    pub async fn mark_all_read(
        pool: &PgPool,
        scope: RecipientScope<'_>,
    ) -> Result<u64, sqlx::Error> {
        let query = format!(
            "UPDATE notifications SET is_read = true, read_at = NOW() \
             WHERE {SCOPE_CLAUSE} AND is_read = false"
        );
        let result = sqlx::query(&query)
            .bind(scope.user_id)
            .bind(scope.role)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Mark a notification as delivered by email.
    pub async fn mark_delivered(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE notifications \
             SET is_delivered = true, delivered_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Delete a notification in the caller's scope. Returns `true` if removed.
    pub async fn delete(
        pool: &PgPool,
        id: DbId,
        scope: RecipientScope<'_>,
    ) -> Result<bool, sqlx::Error> {
        let query = format!("DELETE FROM notifications WHERE id = $3 AND {SCOPE_CLAUSE}");
        let result = sqlx::query(&query)
            .bind(scope.user_id)
            .bind(scope.role)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
