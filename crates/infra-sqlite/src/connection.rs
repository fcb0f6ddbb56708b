// SQLite connection pool setup (§4.1 Store)

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Create the SQLite connection pool with WAL mode and foreign keys enabled.
///
/// # Configuration
/// - `TASKRUNNER_POOL_SIZE`: max connections (default: 20)
/// - `TASKRUNNER_POOL_TIMEOUT`: busy timeout in seconds (default: 5)
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, Box<dyn std::error::Error>> {
    ensure_parent_dir(database_url)?;

    let max_connections: u32 = std::env::var("TASKRUNNER_POOL_SIZE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(20);

    let busy_timeout_secs: u64 = std::env::var("TASKRUNNER_POOL_TIMEOUT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5);

    let options = SqliteConnectOptions::from_str(database_url)?
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(busy_timeout_secs))
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    Ok(pool)
}

/// Creates the parent directory of a file-based database URL if it doesn't exist yet.
/// No-op for in-memory URLs (`:memory:`, `sqlite::memory:`).
fn ensure_parent_dir(database_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if database_url.contains(":memory:") {
        return Ok(());
    }

    let path_str = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);

    if let Some(parent) = Path::new(path_str).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    Ok(())
}
