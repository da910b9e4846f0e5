use sqlx::PgPool;

/// Connect, migrate, and verify every table the engine writes to exists.
#[sqlx::test(migrations = "./migrations")]
async fn full_bootstrap(pool: PgPool) {
    millwright_db::health_check(&pool).await.unwrap();

    let tables = [
        "production_feedback",
        "production_feedback_steps",
        "production_quality_checks",
        "production_feedback_comments",
        "notifications",
    ];

    for table in tables {
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&pool)
            .await
            .unwrap_or_else(|e| panic!("{table} query failed: {e}"));
        assert_eq!(count, 0, "{table} should start empty");
    }
}
