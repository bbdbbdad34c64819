// crates/db/src/lib.rs
//! SQLite persistence for tasks, work sessions and timer events
//! (spec.md §2 "Store", §6 "Persisted schema").

mod analytics;
mod migrations;
mod queries;

pub use analytics::{
    aggregate_label_totals, aggregate_period_totals, aggregate_project_totals,
    aggregate_task_totals, clip_range, next_boundary, period_key, sum_rows_seconds, LabelTotal,
    Period, PeriodTotal, ProjectTotal, TaskTotal,
};
pub use queries::{TaskDurationRow, UpsertOutcome};

pub use migrations::MIGRATIONS;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{ConnectOptions, SqlitePool};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Failed to create database directory: {0}")]
    CreateDir(#[from] std::io::Error),

    #[error("invalid date `{0}`: {1}")]
    InvalidDate(String, chrono::ParseError),
}

pub type DbResult<T> = Result<T, DbError>;

/// Main database handle wrapping a SQLite connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl Database {
    /// Open (or create) the database at the given path and run migrations.
    pub async fn new(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30))
            .log_slow_statements(
                tracing::log::LevelFilter::Warn,
                std::time::Duration::from_secs(5),
            );

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let db = Self {
            pool,
            db_path: path.to_owned(),
        };
        db.run_migrations().await?;

        info!(path = %path.display(), "database opened");
        Ok(db)
    }

    /// Create an in-memory database, sharing a cache so every pool
    /// connection sees the same data (without it, concurrent queries on
    /// separate connections would each get a fresh empty database).
    pub async fn new_in_memory() -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?
            .shared_cache(true)
            .busy_timeout(std::time::Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        let db = Self {
            pool,
            db_path: PathBuf::new(),
        };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Run all inline migrations.
    ///
    /// Uses a `_migrations` table to track which migrations have already
    /// been applied, so non-idempotent statements (`ALTER TABLE ADD
    /// COLUMN`) are only executed once.
    async fn run_migrations(&self) -> DbResult<()> {
        sqlx::query("CREATE TABLE IF NOT EXISTS _migrations (version INTEGER PRIMARY KEY)")
            .execute(&self.pool)
            .await?;

        let row: (i64,) = sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM _migrations")
            .fetch_one(&self.pool)
            .await?;
        let current_version = row.0 as usize;

        for (i, migration) in migrations::MIGRATIONS.iter().enumerate() {
            let version = i + 1;
            if version > current_version {
                let result = sqlx::query(migration).execute(&self.pool).await.map(|_| ());
                match result {
                    Ok(_) => {}
                    Err(e) if e.to_string().contains("duplicate column name") => {
                        // Column already exists from an earlier untracked run.
                    }
                    Err(e) => return Err(e.into()),
                }
                sqlx::query("INSERT INTO _migrations (version) VALUES (?)")
                    .bind(version as i64)
                    .execute(&self.pool)
                    .await?;
            }
        }

        self.ensure_schema_columns().await?;
        Ok(())
    }

    /// Reconciliation pass: some deployments may have reached a migration
    /// version with a different column set than this binary expects. Add
    /// anything still missing rather than trust the version number alone.
    async fn ensure_schema_columns(&self) -> DbResult<()> {
        let expected_task_cols: &[(&str, &str)] = &[("iteration_options", "TEXT NOT NULL DEFAULT '[]'")];
        for (col, typedef) in expected_task_cols {
            self.add_column_if_missing("tasks", col, typedef).await?;
        }
        Ok(())
    }

    async fn add_column_if_missing(
        &self,
        table: &str,
        column: &str,
        typedef: &str,
    ) -> DbResult<()> {
        let columns: Vec<(String,)> =
            sqlx::query_as(&format!("SELECT name FROM pragma_table_info('{table}')"))
                .fetch_all(&self.pool)
                .await?;

        if !columns.iter().any(|(name,)| name == column) {
            let sql = format!("ALTER TABLE {table} ADD COLUMN {column} {typedef}");
            let result = sqlx::query(&sql).execute(&self.pool).await.map(|_| ());
            match result {
                Ok(_) => info!(table, column, "schema reconciliation: added column"),
                // Same idempotency guarantee as run_migrations: a concurrent
                // opener may have won the race between the check above and
                // this ALTER.
                Err(e) if e.to_string().contains("duplicate column name") => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let db = Database::new_in_memory().await.unwrap();
        db.run_migrations().await.unwrap();
        db.run_migrations().await.unwrap();

        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(row.0, 0);
    }
}
