//! Production step models and DTOs.

use millwright_core::steps::{StepSnapshot, StepStatus};
use millwright_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `production_feedback_steps` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Step {
    pub id: DbId,
    pub feedback_id: DbId,
    pub step_index: i32,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub machine_id: Option<String>,
    pub operator_id: Option<DbId>,
    pub started_at: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,
    pub duration_secs: Option<i64>,
    pub quantity_processed: i32,
    pub quantity_passed: i32,
    pub quantity_rejected: i32,
    pub notes: Option<String>,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Step {
    pub fn status(&self) -> StepStatus {
        StepStatus::parse(&self.status).unwrap_or(StepStatus::Pending)
    }

    pub fn snapshot(&self) -> StepSnapshot {
        StepSnapshot {
            status: self.status(),
            quantity_passed: self.quantity_passed,
            quantity_rejected: self.quantity_rejected,
        }
    }
}

/// DTO for creating a step.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateStep {
    pub step_index: i32,
    pub name: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub machine_id: Option<String>,
    pub operator_id: Option<DbId>,
    pub started_at: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,
    pub quantity_processed: Option<i32>,
    pub quantity_passed: Option<i32>,
    pub quantity_rejected: Option<i32>,
    pub notes: Option<String>,
}

/// DTO for updating a step. Only non-`None` fields are applied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateStep {
    pub step_index: Option<i32>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub machine_id: Option<String>,
    pub operator_id: Option<DbId>,
    pub started_at: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,
    pub quantity_processed: Option<i32>,
    pub quantity_passed: Option<i32>,
    pub quantity_rejected: Option<i32>,
    pub notes: Option<String>,
}

/// Fully resolved step values written by the repository.
///
/// The engine fills in defaults, transition timestamps, and duration before
/// handing this to [`StepRepo`](crate::repositories::StepRepo).
#[derive(Debug, Clone)]
pub struct StepWrite {
    pub step_index: i32,
    pub name: String,
    pub description: Option<String>,
    pub status: StepStatus,
    pub machine_id: Option<String>,
    pub operator_id: Option<DbId>,
    pub started_at: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,
    pub duration_secs: Option<i64>,
    pub quantity_processed: i32,
    pub quantity_passed: i32,
    pub quantity_rejected: i32,
    pub notes: Option<String>,
}
