//! Database initialization
//!
//! Opens (or creates) the SQLite database and applies the schema. Every
//! statement is idempotent, so initialization runs on each startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Open the database file, creating it and its tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // WAL lets readers proceed while an import transaction holds the write lock
    let options = connect_options(SqliteConnectOptions::new().filename(db_path))
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// In-memory database with the full schema
///
/// Limited to one connection: every SQLite `:memory:` connection is a
/// separate database.
pub async fn init_in_memory() -> Result<SqlitePool> {
    let options = connect_options(SqliteConnectOptions::from_str("sqlite::memory:")?);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Per-connection settings; pragmas set here apply to every pooled connection
fn connect_options(options: SqliteConnectOptions) -> SqliteConnectOptions {
    options
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5))
}

/// Create all tables and indexes
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_schools_table(pool).await?;
    create_students_table(pool).await?;
    Ok(())
}

pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_schools_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schools (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE COLLATE NOCASE,
            password_hash TEXT NOT NULL,
            plan TEXT,
            students_allowed INTEGER NOT NULL DEFAULT 0,
            subscription_expiry TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_students_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS students (
            id TEXT PRIMARY KEY,
            school_id TEXT NOT NULL REFERENCES schools(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            grade TEXT NOT NULL,
            dob TEXT NOT NULL,
            blood_group TEXT NOT NULL,
            guardian_contact TEXT NOT NULL,
            address TEXT NOT NULL,
            image TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_students_school ON students(school_id)")
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn table_names(pool: &SqlitePool) -> Vec<String> {
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .fetch_all(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_schema() {
        let pool = init_in_memory().await.unwrap();
        let tables = table_names(&pool).await;
        assert_eq!(tables, vec!["schools", "settings", "students"]);
    }

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let pool = init_in_memory().await.unwrap();
        create_schema(&pool).await.unwrap();
        create_schema(&pool).await.unwrap();
        assert_eq!(table_names(&pool).await.len(), 3);
    }

    #[tokio::test]
    async fn test_init_database_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("roster.db");

        let pool = init_database(&db_path).await.unwrap();
        assert!(db_path.exists());
        assert_eq!(table_names(&pool).await.len(), 3);
        pool.close().await;

        // Reopening an existing database keeps the schema
        let pool = init_database(&db_path).await.unwrap();
        assert_eq!(table_names(&pool).await.len(), 3);
    }

    #[tokio::test]
    async fn test_foreign_keys_enforced() {
        let pool = init_in_memory().await.unwrap();
        let result = sqlx::query(
            "INSERT INTO students (id, school_id, name, grade, dob, blood_group, \
             guardian_contact, address, image, created_at, updated_at) \
             VALUES ('s1', 'missing', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i')",
        )
        .execute(&pool)
        .await;
        assert!(result.is_err());
    }
}
