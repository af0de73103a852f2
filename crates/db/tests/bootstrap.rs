use sqlx::PgPool;

/// Connect, migrate, verify every table exists.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_full_bootstrap(pool: PgPool) {
    vellum_db::health_check(&pool).await.unwrap();

    let tables = [
        "collections",
        "releases",
        "contents",
        "content_versions",
        "resource_locks",
    ];
    for table in tables {
        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&pool)
            .await
            .unwrap_or_else(|e| panic!("{table} query failed: {e}"));
        assert_eq!(count.0, 0, "{table} should start empty");
    }
}

/// Unique constraints the engine relies on carry the names it reports.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unique_constraints_exist(pool: PgPool) {
    let names: Vec<(String,)> = sqlx::query_as(
        "SELECT conname::TEXT FROM pg_constraint WHERE contype = 'u' ORDER BY conname",
    )
    .fetch_all(&pool)
    .await
    .unwrap();
    let names: Vec<_> = names.into_iter().map(|(n,)| n).collect();
    for expected in [
        "uq_collections_name",
        "uq_content_versions_content_number",
        "uq_releases_collection_name",
        "uq_resource_locks_resource",
    ] {
        assert!(names.iter().any(|n| n == expected), "missing {expected}");
    }
}
