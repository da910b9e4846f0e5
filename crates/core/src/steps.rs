//! Production step statuses and the step-driven status aggregation.
//!
//! A feedback record's `status`, `completion_percentage`, and produced /
//! rejected quantities are derived from its non-deleted steps. The DB layer
//! loads the step rows, converts them into [`StepSnapshot`]s, and calls
//! [`aggregate_steps`] to get the new derived values.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::feedback::FeedbackStatus;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Step status
// ---------------------------------------------------------------------------

/// Lifecycle status of a single production step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl StepStatus {
    pub const ALL: [StepStatus; 4] = [
        StepStatus::Pending,
        StepStatus::InProgress,
        StepStatus::Completed,
        StepStatus::Failed,
    ];

    /// Column value stored in `production_feedback_steps.status`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse a stored or user-supplied status string.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == value)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid step status '{value}'. Must be one of: pending, in_progress, completed, failed"
                ))
            })
    }

    /// Whether the step has stopped running.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// The subset of a step row the aggregator needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSnapshot {
    pub status: StepStatus,
    pub quantity_passed: i32,
    pub quantity_rejected: i32,
}

/// Derived feedback state computed from a set of steps.
///
/// `quantity_produced` / `quantity_rejected` are `None` when the summed step
/// quantities are zero, meaning the feedback's stored values stay unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepAggregate {
    pub status: FeedbackStatus,
    pub completion_percentage: i16,
    pub quantity_produced: Option<i32>,
    pub quantity_rejected: Option<i32>,
    pub total_steps: usize,
    pub completed_steps: usize,
}

/// Integer percentage of `part` over `total`, rounded half away from zero.
pub fn rounded_percentage(part: usize, total: usize) -> i16 {
    if total == 0 {
        return 0;
    }
    ((part as f64 * 100.0) / total as f64).round() as i16
}

/// Compute the derived feedback state for a set of non-deleted steps.
///
/// Returns `None` for an empty step set; the feedback keeps its current state.
///
/// Status precedence, first match wins:
/// 1. any step `in_progress` -> `in_progress`
/// 2. every step `completed` -> `completed`
/// 3. any step `failed` -> `failed`
/// 4. otherwise -> `pending`
pub fn aggregate_steps(steps: &[StepSnapshot]) -> Option<StepAggregate> {
    if steps.is_empty() {
        return None;
    }

    let total_steps = steps.len();
    let count = |status: StepStatus| steps.iter().filter(|s| s.status == status).count();
    let completed_steps = count(StepStatus::Completed);
    let in_progress = count(StepStatus::InProgress);
    let failed = count(StepStatus::Failed);

    let status = if in_progress > 0 {
        FeedbackStatus::InProgress
    } else if completed_steps == total_steps {
        FeedbackStatus::Completed
    } else if failed > 0 {
        FeedbackStatus::Failed
    } else {
        FeedbackStatus::Pending
    };

    let passed: i64 = steps.iter().map(|s| i64::from(s.quantity_passed.max(0))).sum();
    let rejected: i64 = steps
        .iter()
        .map(|s| i64::from(s.quantity_rejected.max(0)))
        .sum();

    Some(StepAggregate {
        status,
        completion_percentage: rounded_percentage(completed_steps, total_steps),
        quantity_produced: positive_sum(passed),
        quantity_rejected: positive_sum(rejected),
        total_steps,
        completed_steps,
    })
}

fn positive_sum(sum: i64) -> Option<i32> {
    (sum > 0).then(|| sum.min(i64::from(i32::MAX)) as i32)
}

// ---------------------------------------------------------------------------
// Status transition timestamps
// ---------------------------------------------------------------------------

/// Start/end timestamps of a step after a status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepTimestamps {
    pub started_at: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,
}

/// A status change being applied to a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepTransition {
    /// Status before the write; `None` for a new step.
    pub from: Option<StepStatus>,
    pub to: StepStatus,
    /// The client sent `ended_at` with this write.
    pub explicit_end: bool,
}

/// Apply automatic timestamping for a step status transition.
///
/// Entering `in_progress` stamps `started_at` if unset; entering `completed`
/// or `failed` stamps `ended_at` if unset. Re-opening a finished step
/// (back to `in_progress` or `pending`) clears the old `ended_at` unless the
/// client supplied one. Explicit values always win.
pub fn stamp_transition(
    transition: StepTransition,
    current: StepTimestamps,
    now: Timestamp,
) -> StepTimestamps {
    let mut next = current;
    let reopened = !transition.to.is_finished()
        && transition.from.is_some_and(StepStatus::is_finished)
        && !transition.explicit_end;
    if reopened {
        next.ended_at = None;
    }

    match transition.to {
        StepStatus::InProgress => {
            next.started_at.get_or_insert(now);
        }
        StepStatus::Completed | StepStatus::Failed => {
            next.ended_at.get_or_insert(now);
        }
        StepStatus::Pending => {}
    }
    next
}

/// Step duration in whole seconds, when both ends are known and ordered.
pub fn duration_secs(started_at: Option<Timestamp>, ended_at: Option<Timestamp>) -> Option<i64> {
    match (started_at, ended_at) {
        (Some(start), Some(end)) if end >= start => Some((end - start).num_seconds()),
        _ => None,
    }
}

/// Reject duplicate step indexes inside a single batch request.
pub fn validate_unique_indexes(indexes: &[i32]) -> Result<(), CoreError> {
    let mut seen = std::collections::HashSet::with_capacity(indexes.len());
    for idx in indexes {
        if *idx < 0 {
            return Err(CoreError::Validation(format!(
                "Step index must be non-negative, got {idx}"
            )));
        }
        if !seen.insert(*idx) {
            return Err(CoreError::Validation(format!(
                "Duplicate step index {idx} in request"
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
