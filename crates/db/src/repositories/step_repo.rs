//! Repository for the `production_feedback_steps` table.
//!
//! Steps are soft-deleted. Every read here ignores rows with `deleted_at`
//! set, so deleted steps never reach the aggregator.

use millwright_core::steps::{StepSnapshot, StepStatus};
use millwright_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::step::{Step, StepWrite};

/// Column list for `production_feedback_steps` queries.
const COLUMNS: &str = "id, feedback_id, step_index, name, description, status, machine_id, \
    operator_id, started_at, ended_at, duration_secs, quantity_processed, quantity_passed, \
    quantity_rejected, notes, deleted_at, created_at, updated_at";

/// Provides data access for production steps.
pub struct StepRepo;

impl StepRepo {
    /// Insert a step under an already-locked feedback row.
    pub async fn create(
        tx: &mut Transaction<'_, Postgres>,
        feedback_id: DbId,
        input: &StepWrite,
    ) -> Result<Step, sqlx::Error> {
        let query = format!(
            "INSERT INTO production_feedback_steps \
                (feedback_id, step_index, name, description, status, machine_id, operator_id, \
                 started_at, ended_at, duration_secs, quantity_processed, quantity_passed, \
                 quantity_rejected, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Step>(&query)
            .bind(feedback_id)
            .bind(input.step_index)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.status.as_str())
            .bind(&input.machine_id)
            .bind(input.operator_id)
            .bind(input.started_at)
            .bind(input.ended_at)
            .bind(input.duration_secs)
            .bind(input.quantity_processed)
            .bind(input.quantity_passed)
            .bind(input.quantity_rejected)
            .bind(&input.notes)
            .fetch_one(&mut **tx)
            .await
    }

    /// Find a live step by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Step>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM production_feedback_steps \
             WHERE id = $1 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, Step>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Re-read a live step inside the transaction holding its feedback lock.
    pub async fn find_locked(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
    ) -> Result<Option<Step>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM production_feedback_steps \
             WHERE id = $1 AND deleted_at IS NULL \
             FOR UPDATE"
        );
        sqlx::query_as::<_, Step>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// List live steps for a feedback record, ordered by step index.
    pub async fn list_for_feedback(
        pool: &PgPool,
        feedback_id: DbId,
    ) -> Result<Vec<Step>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM production_feedback_steps \
             WHERE feedback_id = $1 AND deleted_at IS NULL \
             ORDER BY step_index ASC"
        );
        sqlx::query_as::<_, Step>(&query)
            .bind(feedback_id)
            .fetch_all(pool)
            .await
    }

    /// Load the aggregator's view of every live step for a feedback record.
    ///
    /// Rows with an unrecognized status are treated as `pending`.
    pub async fn snapshots(
        tx: &mut Transaction<'_, Postgres>,
        feedback_id: DbId,
    ) -> Result<Vec<StepSnapshot>, sqlx::Error> {
        let rows: Vec<(String, i32, i32)> = sqlx::query_as(
            "SELECT status, quantity_passed, quantity_rejected \
             FROM production_feedback_steps \
             WHERE feedback_id = $1 AND deleted_at IS NULL",
        )
        .bind(feedback_id)
        .fetch_all(&mut **tx)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(status, quantity_passed, quantity_rejected)| StepSnapshot {
                status: StepStatus::parse(&status).unwrap_or(StepStatus::Pending),
                quantity_passed,
                quantity_rejected,
            })
            .collect())
    }

    /// Whether a live step other than `exclude_id` already uses `step_index`.
    pub async fn index_in_use(
        tx: &mut Transaction<'_, Postgres>,
        feedback_id: DbId,
        step_index: i32,
        exclude_id: Option<DbId>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS( \
                SELECT 1 FROM production_feedback_steps \
                WHERE feedback_id = $1 AND step_index = $2 AND deleted_at IS NULL \
                  AND ($3::bigint IS NULL OR id <> $3))",
        )
        .bind(feedback_id)
        .bind(step_index)
        .bind(exclude_id)
        .fetch_one(&mut **tx)
        .await
    }

    /// Overwrite a step with fully resolved values.
    pub async fn update(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        input: &StepWrite,
    ) -> Result<Step, sqlx::Error> {
        let query = format!(
            "UPDATE production_feedback_steps SET \
                step_index = $2, name = $3, description = $4, status = $5, \
                machine_id = $6, operator_id = $7, started_at = $8, ended_at = $9, \
                duration_secs = $10, quantity_processed = $11, quantity_passed = $12, \
                quantity_rejected = $13, notes = $14 \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Step>(&query)
            .bind(id)
            .bind(input.step_index)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.status.as_str())
            .bind(&input.machine_id)
            .bind(input.operator_id)
            .bind(input.started_at)
            .bind(input.ended_at)
            .bind(input.duration_secs)
            .bind(input.quantity_processed)
            .bind(input.quantity_passed)
            .bind(input.quantity_rejected)
            .bind(&input.notes)
            .fetch_one(&mut **tx)
            .await
    }

    /// Soft-delete a step. Returns `true` if a live row was marked deleted.
    pub async fn soft_delete(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE production_feedback_steps SET deleted_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
