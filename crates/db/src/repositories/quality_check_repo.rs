//! Repository for the `production_quality_checks` table.

use millwright_core::quality::QualityResult;
use millwright_core::types::{DbId, Timestamp};
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::quality_check::{QualityCheck, UpdateQualityCheck};

/// Column list for `production_quality_checks` queries.
const COLUMNS: &str = "id, feedback_id, step_id, check_type, result, measurement, \
    min_tolerance, max_tolerance, unit, quantity_checked, quantity_passed, quantity_rejected, \
    inspector_id, notes, checked_at, created_at, updated_at";

/// Fully resolved values for inserting a quality check.
#[derive(Debug, Clone)]
pub struct NewQualityCheck {
    pub step_id: Option<DbId>,
    pub check_type: String,
    pub result: QualityResult,
    pub measurement: Option<f64>,
    pub min_tolerance: Option<f64>,
    pub max_tolerance: Option<f64>,
    pub unit: Option<String>,
    pub quantity_checked: i32,
    pub quantity_passed: i32,
    pub quantity_rejected: i32,
    pub inspector_id: Option<DbId>,
    pub notes: Option<String>,
    pub checked_at: Option<Timestamp>,
}

/// Provides data access for quality checks.
pub struct QualityCheckRepo;

impl QualityCheckRepo {
    /// Insert a check under an already-locked feedback row.
    pub async fn create(
        tx: &mut Transaction<'_, Postgres>,
        feedback_id: DbId,
        input: &NewQualityCheck,
    ) -> Result<QualityCheck, sqlx::Error> {
        let query = format!(
            "INSERT INTO production_quality_checks \
                (feedback_id, step_id, check_type, result, measurement, min_tolerance, \
                 max_tolerance, unit, quantity_checked, quantity_passed, quantity_rejected, \
                 inspector_id, notes, checked_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, COALESCE($14, NOW())) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QualityCheck>(&query)
            .bind(feedback_id)
            .bind(input.step_id)
            .bind(&input.check_type)
            .bind(input.result.as_str())
            .bind(input.measurement)
            .bind(input.min_tolerance)
            .bind(input.max_tolerance)
            .bind(&input.unit)
            .bind(input.quantity_checked)
            .bind(input.quantity_passed)
            .bind(input.quantity_rejected)
            .bind(input.inspector_id)
            .bind(&input.notes)
            .bind(input.checked_at)
            .fetch_one(&mut **tx)
            .await
    }

    /// Find a check by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<QualityCheck>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM production_quality_checks WHERE id = $1");
        sqlx::query_as::<_, QualityCheck>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Re-read a check inside the transaction holding its feedback lock.
    pub async fn find_locked(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
    ) -> Result<Option<QualityCheck>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM production_quality_checks WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, QualityCheck>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// List checks for a feedback record, most recent inspection first.
    pub async fn list_for_feedback(
        pool: &PgPool,
        feedback_id: DbId,
    ) -> Result<Vec<QualityCheck>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM production_quality_checks \
             WHERE feedback_id = $1 \
             ORDER BY checked_at DESC, id DESC"
        );
        sqlx::query_as::<_, QualityCheck>(&query)
            .bind(feedback_id)
            .fetch_all(pool)
            .await
    }

    /// Load every check result for a feedback record inside the lock.
    pub async fn results(
        tx: &mut Transaction<'_, Postgres>,
        feedback_id: DbId,
    ) -> Result<Vec<QualityResult>, sqlx::Error> {
        let rows: Vec<String> = sqlx::query_scalar(
            "SELECT result FROM production_quality_checks WHERE feedback_id = $1",
        )
        .bind(feedback_id)
        .fetch_all(&mut **tx)
        .await?;

        Ok(rows
            .iter()
            .map(|r| QualityResult::parse(r).unwrap_or(QualityResult::Pending))
            .collect())
    }

    /// Apply a partial update. `result` is the resolved result to store.
    pub async fn update(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        input: &UpdateQualityCheck,
        result: QualityResult,
    ) -> Result<QualityCheck, sqlx::Error> {
        let query = format!(
            "UPDATE production_quality_checks SET \
                check_type = COALESCE($2, check_type), \
                result = $3, \
                measurement = COALESCE($4, measurement), \
                min_tolerance = COALESCE($5, min_tolerance), \
                max_tolerance = COALESCE($6, max_tolerance), \
                unit = COALESCE($7, unit), \
                quantity_checked = COALESCE($8, quantity_checked), \
                quantity_passed = COALESCE($9, quantity_passed), \
                quantity_rejected = COALESCE($10, quantity_rejected), \
                notes = COALESCE($11, notes) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QualityCheck>(&query)
            .bind(id)
            .bind(&input.check_type)
            .bind(result.as_str())
            .bind(input.measurement)
            .bind(input.min_tolerance)
            .bind(input.max_tolerance)
            .bind(&input.unit)
            .bind(input.quantity_checked)
            .bind(input.quantity_passed)
            .bind(input.quantity_rejected)
            .bind(&input.notes)
            .fetch_one(&mut **tx)
            .await
    }

    /// Delete a check. Returns `true` if a row was removed.
    pub async fn delete(tx: &mut Transaction<'_, Postgres>, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM production_quality_checks WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
