//! Repository for the `production_feedback` table.

use millwright_core::feedback::{DerivedState, FeedbackStatus};
use millwright_core::marketplace::MarketplaceUpdateStatus;
use millwright_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::feedback::{CreateFeedback, Feedback, FeedbackFilter, UpdateFeedback};

/// Column list for `production_feedback` queries.
const COLUMNS: &str = "id, feedback_uid, production_id, batch_id, product_id, product_name, \
    status, completion_percentage, quantity_ordered, quantity_produced, quantity_rejected, \
    quality_score, start_date, end_date, estimated_completion_date, notes, customer_notes, \
    marketplace_update_status, marketplace_last_update, created_by, created_at, updated_at";

/// Shared `WHERE` clause for filtered listing. Every filter is optional.
const FILTER_CLAUSE: &str = "($1::text IS NULL OR status = $1) \
    AND ($2::timestamptz IS NULL OR created_at >= $2) \
    AND ($3::timestamptz IS NULL OR created_at <= $3) \
    AND ($4::text IS NULL OR product_id ILIKE '%' || $4 || '%' OR product_name ILIKE '%' || $4 || '%') \
    AND ($5::text IS NULL OR batch_id ILIKE '%' || $5 || '%')";

/// Provides data access for production feedback records.
pub struct FeedbackRepo;

impl FeedbackRepo {
    /// Insert a new feedback record in the `pending` state.
    ///
    /// Fails with a unique violation on `uq_production_feedback_production_id`
    /// when a record already exists for the production id.
    pub async fn create(
        pool: &PgPool,
        feedback_uid: &str,
        input: &CreateFeedback,
        created_by: DbId,
    ) -> Result<Feedback, sqlx::Error> {
        let query = format!(
            "INSERT INTO production_feedback \
                (feedback_uid, production_id, batch_id, product_id, product_name, \
                 quantity_ordered, start_date, estimated_completion_date, notes, \
                 customer_notes, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Feedback>(&query)
            .bind(feedback_uid)
            .bind(input.production_id.trim())
            .bind(&input.batch_id)
            .bind(&input.product_id)
            .bind(&input.product_name)
            .bind(input.quantity_ordered)
            .bind(input.start_date)
            .bind(input.estimated_completion_date)
            .bind(&input.notes)
            .bind(&input.customer_notes)
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    /// Find a feedback record by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Feedback>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM production_feedback WHERE id = $1");
        sqlx::query_as::<_, Feedback>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a feedback record by its external identifier.
    pub async fn find_by_uid(pool: &PgPool, uid: &str) -> Result<Option<Feedback>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM production_feedback WHERE feedback_uid = $1");
        sqlx::query_as::<_, Feedback>(&query)
            .bind(uid)
            .fetch_optional(pool)
            .await
    }

    /// Find the feedback record for a production id.
    pub async fn find_by_production_id(
        pool: &PgPool,
        production_id: &str,
    ) -> Result<Option<Feedback>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM production_feedback WHERE production_id = $1");
        sqlx::query_as::<_, Feedback>(&query)
            .bind(production_id)
            .fetch_optional(pool)
            .await
    }

    /// List every feedback record carrying an exact batch id, newest first.
    pub async fn list_by_batch(
        pool: &PgPool,
        batch_id: &str,
    ) -> Result<Vec<Feedback>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM production_feedback \
             WHERE batch_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Feedback>(&query)
            .bind(batch_id)
            .fetch_all(pool)
            .await
    }

    /// List feedback records matching `filter`, newest first.
    ///
    /// Returns the requested page and the total number of matching rows.
    pub async fn list(
        pool: &PgPool,
        filter: &FeedbackFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Feedback>, i64), sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM production_feedback \
             WHERE {FILTER_CLAUSE} \
             ORDER BY created_at DESC, id DESC \
             LIMIT $6 OFFSET $7"
        );
        let items = sqlx::query_as::<_, Feedback>(&query)
            .bind(&filter.status)
            .bind(filter.from)
            .bind(filter.to)
            .bind(&filter.product)
            .bind(&filter.batch)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        let count_query = format!("SELECT COUNT(*) FROM production_feedback WHERE {FILTER_CLAUSE}");
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(&filter.status)
            .bind(filter.from)
            .bind(filter.to)
            .bind(&filter.product)
            .bind(&filter.batch)
            .fetch_one(pool)
            .await?;

        Ok((items, total))
    }

    /// Update user-settable fields. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateFeedback,
    ) -> Result<Option<Feedback>, sqlx::Error> {
        let query = format!(
            "UPDATE production_feedback SET \
                batch_id = COALESCE($2, batch_id), \
                product_id = COALESCE($3, product_id), \
                product_name = COALESCE($4, product_name), \
                quantity_ordered = COALESCE($5, quantity_ordered), \
                start_date = COALESCE($6, start_date), \
                end_date = COALESCE($7, end_date), \
                estimated_completion_date = COALESCE($8, estimated_completion_date), \
                notes = COALESCE($9, notes), \
                customer_notes = COALESCE($10, customer_notes) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Feedback>(&query)
            .bind(id)
            .bind(&input.batch_id)
            .bind(&input.product_id)
            .bind(&input.product_name)
            .bind(input.quantity_ordered)
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(input.estimated_completion_date)
            .bind(&input.notes)
            .bind(&input.customer_notes)
            .fetch_optional(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Serialized derived-field writes
    // -----------------------------------------------------------------------

    /// Lock a feedback row for the rest of the transaction.
    ///
    /// All derived-field writes go through this lock so concurrent
    /// recomputations for the same feedback run one after another.
    pub async fn lock(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
    ) -> Result<Option<Feedback>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM production_feedback WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Feedback>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Persist aggregator output.
    pub async fn update_derived(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        state: &DerivedState,
    ) -> Result<Feedback, sqlx::Error> {
        let query = format!(
            "UPDATE production_feedback SET \
                status = $2, completion_percentage = $3, \
                quantity_produced = $4, quantity_rejected = $5, \
                start_date = $6, end_date = $7 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Feedback>(&query)
            .bind(id)
            .bind(state.status.as_str())
            .bind(state.completion_percentage)
            .bind(state.quantity_produced)
            .bind(state.quantity_rejected)
            .bind(state.start_date)
            .bind(state.end_date)
            .fetch_one(&mut **tx)
            .await
    }

    /// Set the status directly. Only used for cancellation.
    pub async fn set_status(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        status: FeedbackStatus,
    ) -> Result<Feedback, sqlx::Error> {
        let query = format!(
            "UPDATE production_feedback SET status = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Feedback>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_one(&mut **tx)
            .await
    }

    /// Persist calculator output. `None` clears the score.
    pub async fn set_quality_score(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        score: Option<i16>,
    ) -> Result<Feedback, sqlx::Error> {
        let query = format!(
            "UPDATE production_feedback SET quality_score = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Feedback>(&query)
            .bind(id)
            .bind(score)
            .fetch_one(&mut **tx)
            .await
    }

    // -----------------------------------------------------------------------
    // Marketplace bookkeeping
    // -----------------------------------------------------------------------

    /// Record the outcome of a marketplace push, stamping the attempt time.
    pub async fn record_marketplace_sync(
        pool: &PgPool,
        id: DbId,
        status: MarketplaceUpdateStatus,
    ) -> Result<Option<Feedback>, sqlx::Error> {
        let query = format!(
            "UPDATE production_feedback SET \
                marketplace_update_status = $2, marketplace_last_update = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Feedback>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(pool)
            .await
    }
}
