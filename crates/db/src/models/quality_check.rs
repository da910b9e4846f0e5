//! Quality check models and DTOs.

use millwright_core::quality::{CheckSnapshot, QualityResult};
use millwright_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `production_quality_checks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QualityCheck {
    pub id: DbId,
    pub feedback_id: DbId,
    pub step_id: Option<DbId>,
    pub check_type: String,
    pub result: String,
    pub measurement: Option<f64>,
    pub min_tolerance: Option<f64>,
    pub max_tolerance: Option<f64>,
    pub unit: Option<String>,
    pub quantity_checked: i32,
    pub quantity_passed: i32,
    pub quantity_rejected: i32,
    pub inspector_id: Option<DbId>,
    pub notes: Option<String>,
    pub checked_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl QualityCheck {
    pub fn result(&self) -> QualityResult {
        QualityResult::parse(&self.result).unwrap_or(QualityResult::Pending)
    }

    pub fn snapshot(&self) -> CheckSnapshot {
        CheckSnapshot {
            check_type: self.check_type.clone(),
            result: self.result(),
            quantity_checked: self.quantity_checked,
            quantity_passed: self.quantity_passed,
            quantity_rejected: self.quantity_rejected,
        }
    }
}

/// DTO for creating a quality check.
///
/// When `result` is omitted it is derived from the measurement and tolerance bounds.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateQualityCheck {
    pub step_id: Option<DbId>,
    pub check_type: String,
    pub result: Option<String>,
    pub measurement: Option<f64>,
    pub min_tolerance: Option<f64>,
    pub max_tolerance: Option<f64>,
    pub unit: Option<String>,
    pub quantity_checked: Option<i32>,
    pub quantity_passed: Option<i32>,
    pub quantity_rejected: Option<i32>,
    pub inspector_id: Option<DbId>,
    pub notes: Option<String>,
    pub checked_at: Option<Timestamp>,
}

/// DTO for updating a quality check. Only non-`None` fields are applied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateQualityCheck {
    pub check_type: Option<String>,
    pub result: Option<String>,
    pub measurement: Option<f64>,
    pub min_tolerance: Option<f64>,
    pub max_tolerance: Option<f64>,
    pub unit: Option<String>,
    pub quantity_checked: Option<i32>,
    pub quantity_passed: Option<i32>,
    pub quantity_rejected: Option<i32>,
    pub notes: Option<String>,
}
