//! # Database Migrations
//!
//! Embedded SQL migrations for the document store schema.
//!
//! ## How Migrations Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Migration Process                                    │
//! │                                                                         │
//! │  Compile Time:                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │ sqlx::migrate!("../../migrations/sqlite")                       │   │
//! │  │   → Reads all .sql files from the workspace migrations folder   │   │
//! │  │   → Embeds them into the binary                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  Runtime (App Startup):                                                │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │ MIGRATOR.run(&pool)                                             │   │
//! │  │   → Checks _sqlx_migrations for applied versions               │   │
//! │  │   → Runs pending migrations in order                            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Migration Files
//! ```text
//! migrations/sqlite/
//! └── 001_documents.sql    ← documents table + json_extract indexes
//! ```

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Embedded migrator, paths relative to this crate's Cargo.toml.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending database migrations.
///
/// Idempotent: safe to run on every startup.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// Returns `(total_migrations, applied_migrations)`.
///
/// For diagnostics and health checks.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((total, applied.max(0) as usize))
}

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};

    use super::*;

    #[tokio::test]
    async fn test_migrations_are_applied_once() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        // Second run is a no-op
        run_migrations(db.pool()).await.unwrap();

        let (total, applied) = migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);
        assert!(total >= 1);
    }
}
