//! Production feedback statuses, identifiers, and derived-state rules.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::steps::StepAggregate;
use crate::types::Timestamp;

/// Prefix for externally-facing feedback identifiers.
pub const FEEDBACK_UID_PREFIX: &str = "PF-";

/// Maximum length for free-text notes on a feedback record.
pub const MAX_NOTES_LENGTH: usize = 20_000;

// ---------------------------------------------------------------------------
// Feedback status
// ---------------------------------------------------------------------------

/// Externally visible status of a production batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl FeedbackStatus {
    pub const ALL: [FeedbackStatus; 5] = [
        FeedbackStatus::Pending,
        FeedbackStatus::InProgress,
        FeedbackStatus::Completed,
        FeedbackStatus::Failed,
        FeedbackStatus::Cancelled,
    ];

    /// Column value stored in `production_feedback.status`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse a stored or user-supplied status string.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == value)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid feedback status '{value}'. Must be one of: pending, in_progress, completed, failed, cancelled"
                ))
            })
    }

    /// Human-readable label for notification titles.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::Cancelled => "Cancelled",
        }
    }
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Generate a fresh opaque external identifier, e.g. `PF-3F9A0C1D2B7E`.
pub fn generate_feedback_uid() -> String {
    let raw = uuid::Uuid::new_v4().simple().to_string().to_uppercase();
    format!("{FEEDBACK_UID_PREFIX}{}", &raw[..12])
}

// ---------------------------------------------------------------------------
// Derived state
// ---------------------------------------------------------------------------

/// The derived columns of a feedback row plus the dates the aggregator may stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedState {
    pub status: FeedbackStatus,
    pub completion_percentage: i16,
    pub quantity_produced: i32,
    pub quantity_rejected: i32,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
}

/// Merge a step aggregate into the current derived state.
///
/// Cancelled feedback is terminal and is returned unchanged. Zero quantity
/// sums keep the stored quantities. Entering `completed` stamps `end_date`
/// when unset; entering `in_progress` stamps `start_date` when unset.
pub fn apply_aggregate(
    current: &DerivedState,
    agg: &StepAggregate,
    now: Timestamp,
) -> DerivedState {
    if current.status == FeedbackStatus::Cancelled {
        return *current;
    }

    let mut next = DerivedState {
        status: agg.status,
        completion_percentage: agg.completion_percentage,
        quantity_produced: agg.quantity_produced.unwrap_or(current.quantity_produced),
        quantity_rejected: agg.quantity_rejected.unwrap_or(current.quantity_rejected),
        start_date: current.start_date,
        end_date: current.end_date,
    };

    if next.status == FeedbackStatus::Completed && current.status != FeedbackStatus::Completed {
        next.end_date.get_or_insert(now);
    }
    if next.status == FeedbackStatus::InProgress {
        next.start_date.get_or_insert(now);
    }

    next
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate the required production identifier.
pub fn validate_production_id(production_id: &str) -> Result<(), CoreError> {
    if production_id.trim().is_empty() {
        return Err(CoreError::Validation(
            "production_id must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validate an ordered quantity when supplied.
pub fn validate_quantity(field: &str, value: Option<i32>) -> Result<(), CoreError> {
    match value {
        Some(v) if v < 0 => Err(CoreError::Validation(format!(
            "{field} must be non-negative, got {v}"
        ))),
        _ => Ok(()),
    }
}

/// Validate free-text note length.
pub fn validate_notes(field: &str, value: Option<&str>) -> Result<(), CoreError> {
    if let Some(text) = value {
        if text.chars().count() > MAX_NOTES_LENGTH {
            return Err(CoreError::Validation(format!(
                "{field} exceeds maximum length of {MAX_NOTES_LENGTH} characters"
            )));
        }
    }
    Ok(())
}

/// Validate that a date range is ordered when both ends are present.
pub fn validate_date_range(
    field: &str,
    from: Option<Timestamp>,
    to: Option<Timestamp>,
) -> Result<(), CoreError> {
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(CoreError::Validation(format!(
                "{field}: start must not be after end"
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::{aggregate_steps, StepSnapshot, StepStatus};
    use chrono::{TimeZone, Utc};

    fn state(status: FeedbackStatus) -> DerivedState {
        DerivedState {
            status,
            completion_percentage: 0,
            quantity_produced: 12,
            quantity_rejected: 3,
            start_date: None,
            end_date: None,
        }
    }

    fn completed(passed: i32) -> StepSnapshot {
        StepSnapshot {
            status: StepStatus::Completed,
            quantity_passed: passed,
            quantity_rejected: 0,
        }
    }

    #[test]
    fn uid_has_prefix_and_is_unique() {
        let a = generate_feedback_uid();
        let b = generate_feedback_uid();
        assert!(a.starts_with(FEEDBACK_UID_PREFIX));
        assert_eq!(a.len(), FEEDBACK_UID_PREFIX.len() + 12);
        assert_ne!(a, b);
    }

    #[test]
    fn completing_sets_end_date_when_unset() {
        let now = Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap();
        let agg = aggregate_steps(&[completed(10), completed(0)]).unwrap();
        let next = apply_aggregate(&state(FeedbackStatus::InProgress), &agg, now);
        assert_eq!(next.status, FeedbackStatus::Completed);
        assert_eq!(next.completion_percentage, 100);
        assert_eq!(next.end_date, Some(now));
        assert_eq!(next.quantity_produced, 10);
        assert_eq!(next.quantity_rejected, 3, "zero rejected sum keeps stored value");
    }

    #[test]
    fn completing_keeps_existing_end_date() {
        let now = Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap();
        let earlier = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        let mut current = state(FeedbackStatus::Pending);
        current.end_date = Some(earlier);
        let agg = aggregate_steps(&[completed(1)]).unwrap();
        let next = apply_aggregate(&current, &agg, now);
        assert_eq!(next.end_date, Some(earlier));
    }

    #[test]
    fn cancelled_feedback_is_frozen() {
        let now = Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap();
        let current = state(FeedbackStatus::Cancelled);
        let agg = aggregate_steps(&[completed(99)]).unwrap();
        assert_eq!(apply_aggregate(&current, &agg, now), current);
    }

    #[test]
    fn status_parse_rejects_unknown() {
        assert_eq!(
            FeedbackStatus::parse("in_progress").unwrap(),
            FeedbackStatus::InProgress
        );
        assert!(FeedbackStatus::parse("archived").is_err());
    }

    #[test]
    fn validation_helpers() {
        assert!(validate_production_id("  ").is_err());
        assert!(validate_production_id("PRD-1").is_ok());
        assert!(validate_quantity("quantity_ordered", Some(-1)).is_err());
        assert!(validate_quantity("quantity_ordered", None).is_ok());
        let a = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        assert!(validate_date_range("dates", Some(a), Some(b)).is_ok());
        assert!(validate_date_range("dates", Some(b), Some(a)).is_err());
    }

    #[test]
    fn notes_limit_counts_characters() {
        // 3 bytes per char: far over the limit in bytes, exactly at it in chars
        let at_limit = "\u{6f22}".repeat(MAX_NOTES_LENGTH);
        assert!(validate_notes("notes", Some(&at_limit)).is_ok());

        let over = format!("{at_limit}x");
        assert!(validate_notes("customer_notes", Some(&over)).is_err());
    }
}
