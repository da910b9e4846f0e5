//! Schema-wide conventions and the guard constraints on derived columns.

use sqlx::PgPool;

/// All `id` columns are bigint.
#[sqlx::test(migrations = "./migrations")]
async fn all_pks_are_bigint(pool: PgPool) {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT table_name, data_type
         FROM information_schema.columns
         WHERE column_name = 'id'
           AND table_schema = 'public'
           AND table_name != '_sqlx_migrations'
         ORDER BY table_name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert_eq!(rows.len(), 5);
    for (table, data_type) in &rows {
        assert_eq!(data_type, "bigint", "Table {table}.id should be bigint");
    }
}

/// Every table carries `created_at` as timestamptz.
#[sqlx::test(migrations = "./migrations")]
async fn all_tables_have_created_at(pool: PgPool) {
    let tables: Vec<(String,)> = sqlx::query_as(
        "SELECT table_name
         FROM information_schema.tables
         WHERE table_schema = 'public'
           AND table_type = 'BASE TABLE'
           AND table_name != '_sqlx_migrations'
         ORDER BY table_name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    for (table,) in &tables {
        let result: Option<(String,)> = sqlx::query_as(
            "SELECT data_type
             FROM information_schema.columns
             WHERE table_schema = 'public'
               AND table_name = $1
               AND column_name = 'created_at'",
        )
        .bind(table)
        .fetch_optional(&pool)
        .await
        .unwrap();

        let (data_type,) =
            result.unwrap_or_else(|| panic!("Table {table} is missing column created_at"));
        assert_eq!(data_type, "timestamp with time zone", "{table}.created_at");
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn no_varchar_columns(pool: PgPool) {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT table_name, column_name
         FROM information_schema.columns
         WHERE table_schema = 'public'
           AND data_type = 'character varying'
           AND table_name != '_sqlx_migrations'
         ORDER BY table_name, column_name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert!(rows.is_empty(), "Found VARCHAR columns: {rows:?}");
}

/// Every foreign key column has an index; parent lookups run on every recompute.
#[sqlx::test(migrations = "./migrations")]
async fn all_fks_have_indexes(pool: PgPool) {
    let fk_columns: Vec<(String, String)> = sqlx::query_as(
        "SELECT DISTINCT tc.table_name, kcu.column_name
         FROM information_schema.table_constraints tc
         JOIN information_schema.key_column_usage kcu
             ON tc.constraint_name = kcu.constraint_name
             AND tc.table_schema = kcu.table_schema
         WHERE tc.constraint_type = 'FOREIGN KEY'
           AND tc.table_schema = 'public'
         ORDER BY tc.table_name, kcu.column_name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert!(!fk_columns.is_empty());
    for (table, column) in &fk_columns {
        let (has_index,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (
                SELECT 1 FROM pg_indexes
                WHERE schemaname = 'public'
                  AND tablename = $1
                  AND indexdef LIKE '%(' || $2 || '%'
            )",
        )
        .bind(table)
        .bind(column)
        .fetch_one(&pool)
        .await
        .unwrap();

        assert!(has_index, "FK column {table}.{column} has no index");
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn derived_columns_reject_out_of_range_values(pool: PgPool) {
    sqlx::query(
        "INSERT INTO production_feedback (feedback_uid, production_id)
         VALUES ('PF-SCHEMA', 'PRD-SCHEMA')",
    )
    .execute(&pool)
    .await
    .unwrap();

    for update in [
        "UPDATE production_feedback SET status = 'paused'",
        "UPDATE production_feedback SET completion_percentage = 101",
        "UPDATE production_feedback SET quality_score = -1",
        "UPDATE production_feedback SET quantity_rejected = -5",
        "UPDATE production_feedback SET marketplace_update_status = 'queued'",
    ] {
        let result = sqlx::query(update).execute(&pool).await;
        assert!(result.is_err(), "expected check violation for: {update}");
    }
}
