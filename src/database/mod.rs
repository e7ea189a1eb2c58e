pub mod connection;

pub use connection::*;

/// Fresh in-memory SQLite database with the schema applied.
#[cfg(test)]
pub(crate) async fn test_pool() -> DbPool {
    let config = crate::config::DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        // one connection, otherwise each checkout sees an empty database
        max_connections: 1,
    };
    let pool = create_pool(&config).await.expect("connect sqlite");
    run_migrations(&pool).await.expect("migrate sqlite");
    pool
}

/// SQLite file with the schema applied, for tests that need several
/// connections in flight at once. The caller removes the returned file.
#[cfg(test)]
pub(crate) async fn file_test_pool(max_connections: u32) -> (DbPool, std::path::PathBuf) {
    let path = std::env::temp_dir().join(format!("ticketing-{}.db", uuid::Uuid::new_v4()));
    let config = crate::config::DatabaseConfig {
        url: format!("sqlite://{}?mode=rwc", path.display()),
        max_connections,
    };
    let pool = create_pool(&config).await.expect("open sqlite file");
    run_migrations(&pool).await.expect("migrate sqlite file");
    (pool, path)
}
