//! Notification vocabulary and routing rules.
//!
//! Routing is pure: each trigger (new comment, reply, status change, issue
//! report) is turned into a [`NotificationDraft`] describing who receives the
//! notification, at which priority, and through which delivery method. The
//! dispatcher in the API crate persists drafts and performs email delivery.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::feedback::FeedbackStatus;
use crate::roles::ROLE_PRODUCTION_MANAGER;
use crate::types::DbId;

/// Length of the content excerpt embedded in comment notifications.
const EXCERPT_CHARS: usize = 140;

// ---------------------------------------------------------------------------
// Vocabulary
// ---------------------------------------------------------------------------

/// Generates `as_str` / `parse` for a string-backed enum.
macro_rules! string_enum {
    ($name:ident, $what:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }

            pub fn parse(value: &str) -> Result<Self, CoreError> {
                match value {
                    $($text => Ok(Self::$variant),)+
                    other => Err(CoreError::Validation(format!(
                        concat!("Invalid ", $what, " '{}'. Must be one of: {}"),
                        other,
                        [$($text),+].join(", ")
                    ))),
                }
            }
        }
    };
}

/// What triggered a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    NewComment,
    CommentReply,
    StatusChange,
    IssueReported,
    General,
}

string_enum!(NotificationType, "notification type", {
    NewComment => "new_comment",
    CommentReply => "comment_reply",
    StatusChange => "status_change",
    IssueReported => "issue_reported",
    General => "general",
});

/// How a notification is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientType {
    User,
    Role,
    Email,
}

string_enum!(RecipientType, "recipient type", {
    User => "user",
    Role => "role",
    Email => "email",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Parse a priority; `normal` is accepted as an alias of `medium`.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "low" => Ok(Self::Low),
            "medium" | "normal" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(CoreError::Validation(format!(
                "Invalid priority '{other}'. Must be one of: low, medium, high"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    InApp,
    Email,
    Both,
}

string_enum!(DeliveryMethod, "delivery method", {
    InApp => "in_app",
    Email => "email",
    Both => "both",
});

impl DeliveryMethod {
    pub fn includes_email(self) -> bool {
        matches!(self, Self::Email | Self::Both)
    }
}

/// Severity attached to a reported production issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Low,
    Medium,
    High,
    Critical,
}

string_enum!(IssueSeverity, "issue severity", {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

// ---------------------------------------------------------------------------
// Recipients
// ---------------------------------------------------------------------------

/// Resolved addressee of a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "recipient_type", content = "recipient", rename_all = "snake_case")]
pub enum Recipient {
    User(DbId),
    Role(String),
    Email(String),
}

impl Recipient {
    pub fn recipient_type(&self) -> RecipientType {
        match self {
            Self::User(_) => RecipientType::User,
            Self::Role(_) => RecipientType::Role,
            Self::Email(_) => RecipientType::Email,
        }
    }

    /// Rebuild a recipient from the three nullable storage columns.
    pub fn from_columns(
        recipient_type: &str,
        recipient_id: Option<DbId>,
        recipient_role: Option<&str>,
        recipient_email: Option<&str>,
    ) -> Result<Self, CoreError> {
        let missing = |column: &str| {
            CoreError::Validation(format!(
                "{column} is required for recipient_type '{recipient_type}'"
            ))
        };
        match RecipientType::parse(recipient_type)? {
            RecipientType::User => recipient_id
                .map(Self::User)
                .ok_or_else(|| missing("recipient_id")),
            RecipientType::Role => recipient_role
                .filter(|r| !r.trim().is_empty())
                .map(|r| Self::Role(r.to_string()))
                .ok_or_else(|| missing("recipient_role")),
            RecipientType::Email => recipient_email
                .filter(|e| e.contains('@'))
                .map(|e| Self::Email(e.to_string()))
                .ok_or_else(|| missing("recipient_email")),
        }
    }

    /// Whether a caller with `user_id` / `role` may see a notification
    /// addressed to this recipient.
    pub fn is_visible_to(&self, user_id: DbId, role: &str) -> bool {
        match self {
            Self::User(id) => *id == user_id,
            Self::Role(r) => r == role,
            Self::Email(_) => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Drafts and routing
// ---------------------------------------------------------------------------

/// A notification ready to be persisted by the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationDraft {
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub recipient: Recipient,
    pub priority: Priority,
    pub delivery_method: DeliveryMethod,
    pub feedback_id: Option<DbId>,
    pub comment_id: Option<DbId>,
    pub metadata: serde_json::Value,
}

/// Identifies the feedback record a notification is about.
#[derive(Debug, Clone, Copy)]
pub struct FeedbackRef<'a> {
    pub id: DbId,
    pub uid: &'a str,
    pub production_id: &'a str,
}

/// A comment that was just created.
#[derive(Debug, Clone, Copy)]
pub struct CommentEvent<'a> {
    pub comment_id: DbId,
    pub author_id: DbId,
    pub content: &'a str,
    pub is_important: bool,
    /// Author of the parent comment when this is a reply.
    pub parent_author_id: Option<DbId>,
}

/// A reported production issue.
#[derive(Debug, Clone, Copy)]
pub struct IssueEvent<'a> {
    pub severity: IssueSeverity,
    pub title: &'a str,
    pub description: &'a str,
    pub step_id: Option<DbId>,
    pub reported_by: DbId,
}

fn excerpt(content: &str) -> String {
    if content.chars().count() <= EXCERPT_CHARS {
        content.to_string()
    } else {
        let cut: String = content.chars().take(EXCERPT_CHARS).collect();
        format!("{cut}...")
    }
}

/// Route a new comment.
///
/// Top-level comments go to the production manager role; replies go to the
/// parent comment's author. Important comments are raised to high priority.
pub fn route_comment(feedback: FeedbackRef<'_>, comment: CommentEvent<'_>) -> NotificationDraft {
    let priority = if comment.is_important {
        Priority::High
    } else {
        Priority::Medium
    };

    let (notification_type, recipient, title) = match comment.parent_author_id {
        Some(parent_author) => (
            NotificationType::CommentReply,
            Recipient::User(parent_author),
            format!("New reply on {}", feedback.uid),
        ),
        None => (
            NotificationType::NewComment,
            Recipient::Role(ROLE_PRODUCTION_MANAGER.to_string()),
            format!("New comment on {}", feedback.uid),
        ),
    };

    NotificationDraft {
        notification_type,
        title,
        message: excerpt(comment.content),
        recipient,
        priority,
        delivery_method: DeliveryMethod::InApp,
        feedback_id: Some(feedback.id),
        comment_id: Some(comment.comment_id),
        metadata: serde_json::json!({
            "production_id": feedback.production_id,
            "author_id": comment.author_id,
            "is_important": comment.is_important,
        }),
    }
}

/// Message body for a status transition.
pub fn status_message(feedback: FeedbackRef<'_>, to: FeedbackStatus) -> String {
    let reference = format!("Production {} ({})", feedback.production_id, feedback.uid);
    match to {
        FeedbackStatus::Pending => format!("{reference} is pending and waiting to start."),
        FeedbackStatus::InProgress => format!("{reference} is now in progress."),
        FeedbackStatus::Completed => format!("{reference} has completed all production steps."),
        FeedbackStatus::Failed => {
            format!("{reference} has failed. One or more production steps need attention.")
        }
        FeedbackStatus::Cancelled => format!("{reference} has been cancelled."),
    }
}

/// Route a feedback status transition to the production manager role.
///
/// Failures are high priority and also go out by email.
pub fn route_status_change(
    feedback: FeedbackRef<'_>,
    from: FeedbackStatus,
    to: FeedbackStatus,
) -> NotificationDraft {
    let failed = to == FeedbackStatus::Failed;
    NotificationDraft {
        notification_type: NotificationType::StatusChange,
        title: format!("{} is now {}", feedback.uid, to.label()),
        message: status_message(feedback, to),
        recipient: Recipient::Role(ROLE_PRODUCTION_MANAGER.to_string()),
        priority: if failed { Priority::High } else { Priority::Medium },
        delivery_method: if failed {
            DeliveryMethod::Both
        } else {
            DeliveryMethod::InApp
        },
        feedback_id: Some(feedback.id),
        comment_id: None,
        metadata: serde_json::json!({
            "production_id": feedback.production_id,
            "previous_status": from.as_str(),
            "new_status": to.as_str(),
        }),
    }
}

/// Route a reported issue to the production manager role.
///
/// Critical issues are high priority and also go out by email.
pub fn route_issue(feedback: FeedbackRef<'_>, issue: IssueEvent<'_>) -> NotificationDraft {
    let critical = issue.severity == IssueSeverity::Critical;
    NotificationDraft {
        notification_type: NotificationType::IssueReported,
        title: format!("[{}] {}", issue.severity.as_str().to_uppercase(), issue.title),
        message: format!(
            "Issue reported on production {} ({}): {}",
            feedback.production_id, feedback.uid, issue.description
        ),
        recipient: Recipient::Role(ROLE_PRODUCTION_MANAGER.to_string()),
        priority: if critical { Priority::High } else { Priority::Medium },
        delivery_method: if critical {
            DeliveryMethod::Both
        } else {
            DeliveryMethod::InApp
        },
        feedback_id: Some(feedback.id),
        comment_id: None,
        metadata: serde_json::json!({
            "production_id": feedback.production_id,
            "severity": issue.severity.as_str(),
            "step_id": issue.step_id,
            "reported_by": issue.reported_by,
        }),
    }
}

/// Validate the title/message pair of a hand-written notification.
pub fn validate_manual(title: &str, message: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::Validation("title must not be empty".to_string()));
    }
    if message.trim().is_empty() {
        return Err(CoreError::Validation(
            "message must not be empty".to_string(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
