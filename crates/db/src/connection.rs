use std::time::Duration;

use seatwise_core::config::DatabaseConfig;
use sqlx::sqlite::SqlitePoolOptions;

pub type DbPool = sqlx::SqlitePool;

/// Pools for `:memory:` urls are clamped to one connection so every query sees
/// the same database.
pub async fn connect(database: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    let max_connections =
        if database.url.contains(":memory:") { 1 } else { database.max_connections };
    connect_with_settings(&database.url, max_connections, database.timeout_secs).await
}

/// In-memory SQLite databases are private to each connection, so callers that
/// pass `sqlite::memory:` should keep `max_connections` at 1.
pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}
