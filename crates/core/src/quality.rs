//! Quality check results, score calculation, and per-feedback summaries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::steps::rounded_percentage;

/// Outcome of a single quality inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityResult {
    Pending,
    Passed,
    Failed,
    Waived,
}

impl QualityResult {
    pub const ALL: [QualityResult; 4] = [
        QualityResult::Pending,
        QualityResult::Passed,
        QualityResult::Failed,
        QualityResult::Waived,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Waived => "waived",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == value)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid quality result '{value}'. Must be one of: pending, passed, failed, waived"
                ))
            })
    }
}

/// Resolve the stored result of a check.
///
/// An explicit result always wins. Otherwise, when a measurement and both
/// tolerance bounds are present, the check passes iff `min <= measurement <= max`.
/// Anything else stays `pending`.
pub fn resolve_result(
    explicit: Option<QualityResult>,
    measurement: Option<f64>,
    min_tolerance: Option<f64>,
    max_tolerance: Option<f64>,
) -> QualityResult {
    if let Some(result) = explicit {
        return result;
    }
    match (measurement, min_tolerance, max_tolerance) {
        (Some(m), Some(min), Some(max)) if m >= min && m <= max => QualityResult::Passed,
        (Some(_), Some(_), Some(_)) => QualityResult::Failed,
        _ => QualityResult::Pending,
    }
}

/// Validate tolerance bounds and quantities on a check.
pub fn validate_check(
    min_tolerance: Option<f64>,
    max_tolerance: Option<f64>,
    quantities: [Option<i32>; 3],
) -> Result<(), CoreError> {
    if let (Some(min), Some(max)) = (min_tolerance, max_tolerance) {
        if min > max {
            return Err(CoreError::Validation(format!(
                "min_tolerance ({min}) must not exceed max_tolerance ({max})"
            )));
        }
    }
    if quantities.iter().flatten().any(|q| *q < 0) {
        return Err(CoreError::Validation(
            "Quality check quantities must be non-negative".to_string(),
        ));
    }
    Ok(())
}

/// `round(100 * passed / total)` across all checks, or `None` with no checks.
pub fn compute_quality_score(results: &[QualityResult]) -> Option<i16> {
    if results.is_empty() {
        return None;
    }
    let passed = results
        .iter()
        .filter(|r| **r == QualityResult::Passed)
        .count();
    Some(rounded_percentage(passed, results.len()))
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// The subset of a quality check row the summary needs.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckSnapshot {
    pub check_type: String,
    pub result: QualityResult,
    pub quantity_checked: i32,
    pub quantity_passed: i32,
    pub quantity_rejected: i32,
}

/// Aggregated view of every quality check on one feedback record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualitySummary {
    pub total_checks: usize,
    pub by_result: BTreeMap<&'static str, usize>,
    pub by_type: BTreeMap<String, usize>,
    pub quantity_checked: i64,
    pub quantity_passed: i64,
    pub quantity_rejected: i64,
    pub quality_score: Option<i16>,
}

/// Build a [`QualitySummary`] from check snapshots.
pub fn summarize(checks: &[CheckSnapshot]) -> QualitySummary {
    let mut by_result: BTreeMap<&'static str, usize> =
        QualityResult::ALL.iter().map(|r| (r.as_str(), 0)).collect();
    let mut by_type: BTreeMap<String, usize> = BTreeMap::new();

    for check in checks {
        *by_result.entry(check.result.as_str()).or_default() += 1;
        *by_type.entry(check.check_type.clone()).or_default() += 1;
    }

    let results: Vec<QualityResult> = checks.iter().map(|c| c.result).collect();

    QualitySummary {
        total_checks: checks.len(),
        by_result,
        by_type,
        quantity_checked: checks.iter().map(|c| i64::from(c.quantity_checked)).sum(),
        quantity_passed: checks.iter().map(|c| i64::from(c.quantity_passed)).sum(),
        quantity_rejected: checks.iter().map(|c| i64::from(c.quantity_rejected)).sum(),
        quality_score: compute_quality_score(&results),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_checks_leaves_score_unset() {
        assert_eq!(compute_quality_score(&[]), None);
    }

    #[test]
    fn two_of_three_passed_scores_67() {
        let score = compute_quality_score(&[
            QualityResult::Passed,
            QualityResult::Passed,
            QualityResult::Failed,
        ]);
        assert_eq!(score, Some(67));
    }

    #[test]
    fn waived_and_pending_count_toward_total() {
        let score = compute_quality_score(&[
            QualityResult::Passed,
            QualityResult::Waived,
            QualityResult::Pending,
            QualityResult::Passed,
        ]);
        assert_eq!(score, Some(50));
    }

    #[test]
    fn score_is_idempotent() {
        let results = [QualityResult::Passed, QualityResult::Failed];
        assert_eq!(compute_quality_score(&results), compute_quality_score(&results));
    }

    #[test]
    fn measurement_inside_tolerance_passes() {
        let r = resolve_result(None, Some(10.0), Some(9.5), Some(10.5));
        assert_eq!(r, QualityResult::Passed);
        let edge = resolve_result(None, Some(10.5), Some(9.5), Some(10.5));
        assert_eq!(edge, QualityResult::Passed);
    }

    #[test]
    fn measurement_outside_tolerance_fails() {
        let r = resolve_result(None, Some(11.0), Some(9.5), Some(10.5));
        assert_eq!(r, QualityResult::Failed);
    }

    #[test]
    fn explicit_result_wins_over_measurement() {
        let r = resolve_result(
            Some(QualityResult::Waived),
            Some(11.0),
            Some(9.5),
            Some(10.5),
        );
        assert_eq!(r, QualityResult::Waived);
    }

    #[test]
    fn missing_bound_stays_pending() {
        assert_eq!(
            resolve_result(None, Some(10.0), Some(9.5), None),
            QualityResult::Pending
        );
    }

    #[test]
    fn inverted_tolerance_rejected() {
        assert!(validate_check(Some(5.0), Some(1.0), [None; 3]).is_err());
        assert!(validate_check(Some(1.0), Some(5.0), [Some(3), None, None]).is_ok());
        assert!(validate_check(None, None, [Some(-2), None, None]).is_err());
    }

    #[test]
    fn summary_counts_by_result_and_type() {
        let checks = vec![
            CheckSnapshot {
                check_type: "dimension".into(),
                result: QualityResult::Passed,
                quantity_checked: 10,
                quantity_passed: 10,
                quantity_rejected: 0,
            },
            CheckSnapshot {
                check_type: "dimension".into(),
                result: QualityResult::Failed,
                quantity_checked: 10,
                quantity_passed: 7,
                quantity_rejected: 3,
            },
            CheckSnapshot {
                check_type: "visual".into(),
                result: QualityResult::Passed,
                quantity_checked: 5,
                quantity_passed: 5,
                quantity_rejected: 0,
            },
        ];
        let summary = summarize(&checks);
        assert_eq!(summary.total_checks, 3);
        assert_eq!(summary.by_result["passed"], 2);
        assert_eq!(summary.by_result["failed"], 1);
        assert_eq!(summary.by_result["waived"], 0);
        assert_eq!(summary.by_type["dimension"], 2);
        assert_eq!(summary.quantity_checked, 25);
        assert_eq!(summary.quantity_rejected, 3);
        assert_eq!(summary.quality_score, Some(67));
    }
}
