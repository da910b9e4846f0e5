//! Marketplace synchronization rules: which statuses are pushed, the
//! readiness guard, and the outbound payload shape.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::feedback::FeedbackStatus;
use crate::types::Timestamp;

/// Path appended to the configured marketplace base URL.
pub const MARKETPLACE_UPDATE_PATH: &str = "/production/update";

/// Last recorded outcome of pushing a feedback record to the marketplace.
///
/// `None` on the feedback row means no attempt has been recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketplaceUpdateStatus {
    Sent,
    Failed,
}

impl MarketplaceUpdateStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            other => Err(CoreError::Validation(format!(
                "Invalid marketplace update status '{other}'"
            ))),
        }
    }
}

/// Statuses whose arrival is pushed to the marketplace automatically.
pub const AUTO_SYNC_STATUSES: [FeedbackStatus; 3] = [
    FeedbackStatus::Completed,
    FeedbackStatus::Failed,
    FeedbackStatus::Cancelled,
];

pub fn is_auto_sync_status(status: FeedbackStatus) -> bool {
    AUTO_SYNC_STATUSES.contains(&status)
}

/// Why a feedback record cannot be sent yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum NotReady {
    #[error("Feedback has no batch identifier")]
    MissingBatchId,
    #[error("Feedback is still pending")]
    StillPending,
}

/// Guard applied before every send, automatic or manual.
pub fn check_ready(batch_id: Option<&str>, status: FeedbackStatus) -> Result<(), NotReady> {
    if batch_id.map_or(true, |b| b.trim().is_empty()) {
        return Err(NotReady::MissingBatchId);
    }
    if status == FeedbackStatus::Pending {
        return Err(NotReady::StillPending);
    }
    Ok(())
}

/// Body of `POST /production/update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketplacePayload {
    pub production_id: String,
    pub batch_id: String,
    pub product_id: Option<String>,
    pub status: FeedbackStatus,
    pub completion_percentage: i16,
    pub quantity_produced: i32,
    pub quantity_rejected: i32,
    pub estimated_completion_date: Option<Timestamp>,
    pub notes: Option<String>,
}

/// Result object surfaced next to the primary entity in mutating responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub success: bool,
    pub message: String,
    pub update_status: Option<MarketplaceUpdateStatus>,
}

impl SyncOutcome {
    pub fn sent() -> Self {
        Self {
            success: true,
            message: "Marketplace updated".to_string(),
            update_status: Some(MarketplaceUpdateStatus::Sent),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            update_status: Some(MarketplaceUpdateStatus::Failed),
        }
    }

    /// Nothing was sent and the stored sync status is untouched.
    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            update_status: None,
        }
    }
}
