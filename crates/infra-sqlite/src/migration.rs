// Migration runner (§4.1 Store)
//
// `schema_version` records every applied version. On open we compute
// `max(version)` and apply every registered migration with id > current, in
// ascending order, each wrapped in its own transaction alongside the version
// insert (P1: running migrations N times is equivalent to running once).

use sqlx::SqlitePool;
use tracing::info;

struct Migration {
    version: i64,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        sql: include_str!("../migrations/001_initial_schema.sql"),
    },
    Migration {
        version: 2,
        sql: include_str!("../migrations/002_state_and_queue.sql"),
    },
];

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY, applied_at INTEGER NOT NULL)",
    )
    .execute(pool)
    .await?;

    let current_version: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_version")
        .fetch_one(pool)
        .await?;

    info!(current_version, "checking for pending migrations");

    for migration in MIGRATIONS.iter().filter(|m| m.version > current_version) {
        info!(version = migration.version, "applying migration");
        apply_migration(pool, migration).await?;
    }

    Ok(())
}

async fn apply_migration(pool: &SqlitePool, migration: &Migration) -> Result<(), Box<dyn std::error::Error>> {
    let mut tx = pool.begin().await?;

    for statement in migration.sql.split(';') {
        let clean: String = statement
            .lines()
            .filter(|line| !line.trim_start().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string();

        if !clean.is_empty() {
            sqlx::query(&clean).execute(&mut *tx).await?;
        }
    }

    let applied_at = chrono::Utc::now().timestamp_millis();
    sqlx::query("INSERT INTO schema_version (version, applied_at) VALUES (?, ?)")
        .bind(migration.version)
        .bind(applied_at)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_pool;

    #[tokio::test]
    async fn applies_all_migrations_and_records_versions() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);

        let versions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_version")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(versions, MIGRATIONS.len() as i64);
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let versions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_version")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(versions, MIGRATIONS.len() as i64);
    }
}
