//! Database access for mplan-gen
//!
//! Shared SQLite database in the root folder; tables are created
//! idempotently at pool initialization.

pub mod artists;
pub mod jobs;
pub mod settings;
pub mod songs;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    init_tables(&pool).await?;
    let schema_version = settings::ensure_schema_version(&pool).await?;
    tracing::debug!(schema_version, "Database schema version verified");

    Ok(pool)
}

/// Initialize mplan-gen specific tables
///
/// Creates songs, portrait_jobs, artists, and settings tables if they
/// don't exist
async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            record_id TEXT PRIMARY KEY,
            owner TEXT NOT NULL,
            artifact TEXT NOT NULL,
            song_id INTEGER,
            mode TEXT NOT NULL,
            artist TEXT,
            concept TEXT,
            lyrics TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS portrait_jobs (
            job_id TEXT PRIMARY KEY,
            owner TEXT NOT NULL,
            status TEXT NOT NULL,
            request TEXT NOT NULL,
            artifacts TEXT NOT NULL DEFAULT '[]',
            selected TEXT,
            error TEXT,
            created_at TEXT NOT NULL,
            completed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS artists (
            name TEXT PRIMARY KEY,
            portrait_path TEXT,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (settings, songs, portrait_jobs, artists)");

    Ok(())
}
