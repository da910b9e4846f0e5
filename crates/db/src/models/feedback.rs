//! Production feedback entity models and DTOs.

use millwright_core::feedback::{DerivedState, FeedbackStatus};
use millwright_core::marketplace::MarketplaceUpdateStatus;
use millwright_core::notifications::FeedbackRef;
use millwright_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `production_feedback` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Feedback {
    pub id: DbId,
    pub feedback_uid: String,
    pub production_id: String,
    pub batch_id: Option<String>,
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub status: String,
    pub completion_percentage: i16,
    pub quantity_ordered: Option<i32>,
    pub quantity_produced: i32,
    pub quantity_rejected: i32,
    pub quality_score: Option<i16>,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    pub estimated_completion_date: Option<Timestamp>,
    pub notes: Option<String>,
    pub customer_notes: Option<String>,
    pub marketplace_update_status: Option<String>,
    pub marketplace_last_update: Option<Timestamp>,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Feedback {
    /// Parsed status. Unknown stored values fall back to `pending`.
    pub fn status(&self) -> FeedbackStatus {
        FeedbackStatus::parse(&self.status).unwrap_or(FeedbackStatus::Pending)
    }

    pub fn marketplace_status(&self) -> Option<MarketplaceUpdateStatus> {
        self.marketplace_update_status
            .as_deref()
            .and_then(|s| MarketplaceUpdateStatus::parse(s).ok())
    }

    /// Snapshot of the derived columns for the aggregator.
    pub fn derived_state(&self) -> DerivedState {
        DerivedState {
            status: self.status(),
            completion_percentage: self.completion_percentage,
            quantity_produced: self.quantity_produced,
            quantity_rejected: self.quantity_rejected,
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }

    pub fn feedback_ref(&self) -> FeedbackRef<'_> {
        FeedbackRef {
            id: self.id,
            uid: &self.feedback_uid,
            production_id: &self.production_id,
        }
    }
}

/// DTO for creating a feedback record.
///
/// Derived fields are not accepted; the record starts `pending` at 0%.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateFeedback {
    pub production_id: String,
    pub batch_id: Option<String>,
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub quantity_ordered: Option<i32>,
    pub start_date: Option<Timestamp>,
    pub estimated_completion_date: Option<Timestamp>,
    pub notes: Option<String>,
    pub customer_notes: Option<String>,
}

/// DTO for updating user-settable feedback fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFeedback {
    pub batch_id: Option<String>,
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub quantity_ordered: Option<i32>,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    pub estimated_completion_date: Option<Timestamp>,
    pub notes: Option<String>,
    pub customer_notes: Option<String>,
}

/// Filters for listing feedback records.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedbackFilter {
    pub status: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub from: Option<Timestamp>,
    /// Inclusive upper bound on `created_at`.
    pub to: Option<Timestamp>,
    /// Case-insensitive substring match on product id or name.
    pub product: Option<String>,
    /// Case-insensitive substring match on batch id.
    pub batch: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// One page of feedback records plus the unpaginated total.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackPage {
    pub items: Vec<Feedback>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Marketplace bookkeeping for a feedback record.
#[derive(Debug, Clone, Serialize)]
pub struct MarketplaceSyncStatus {
    pub feedback_id: DbId,
    pub batch_id: Option<String>,
    pub status: String,
    pub marketplace_update_status: Option<String>,
    pub marketplace_last_update: Option<Timestamp>,
}

impl From<&Feedback> for MarketplaceSyncStatus {
    fn from(f: &Feedback) -> Self {
        Self {
            feedback_id: f.id,
            batch_id: f.batch_id.clone(),
            status: f.status.clone(),
            marketplace_update_status: f.marketplace_update_status.clone(),
            marketplace_last_update: f.marketplace_last_update,
        }
    }
}
