//! Settings database operations
//!
//! Get/set accessors for the settings key-value table, plus the schema
//! version stamp written at pool initialization.

use sqlx::{Pool, Sqlite};

use mplan_common::{Error, Result};

/// Schema version written by this build
pub const SCHEMA_VERSION: i64 = 1;

/// Stamp the schema version, or verify an existing stamp
///
/// A database from a newer build is refused rather than silently read
/// with the wrong expectations.
pub async fn ensure_schema_version(db: &Pool<Sqlite>) -> Result<i64> {
    match get_setting::<i64>(db, "schema_version").await? {
        Some(version) if version > SCHEMA_VERSION => Err(Error::Config(format!(
            "Database schema version {} is newer than supported version {}",
            version, SCHEMA_VERSION
        ))),
        Some(version) => Ok(version),
        None => {
            set_setting(db, "schema_version", SCHEMA_VERSION).await?;
            Ok(SCHEMA_VERSION)
        }
    }
}

/// Generic setting getter
pub async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row {
        Some((value,)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting failed: {}", e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Generic setting setter (upsert)
pub async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_test_db() -> (tempfile::TempDir, sqlx::SqlitePool) {
        let temp = tempfile::tempdir().unwrap();
        let pool = crate::db::init_database_pool(&temp.path().join("mplan.db"))
            .await
            .unwrap();
        (temp, pool)
    }

    #[tokio::test]
    async fn schema_version_is_stamped_at_init() {
        let (_temp, pool) = setup_test_db().await;
        let version: Option<i64> = get_setting(&pool, "schema_version").await.unwrap();
        assert_eq!(version, Some(SCHEMA_VERSION));
    }

    #[tokio::test]
    async fn missing_key_reads_as_none() {
        let (_temp, pool) = setup_test_db().await;
        let value: Option<String> = get_setting(&pool, "no_such_key").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn set_then_get_round_trips_and_overwrites() {
        let (_temp, pool) = setup_test_db().await;

        set_setting(&pool, "portrait_quality", "high").await.unwrap();
        let value: Option<String> = get_setting(&pool, "portrait_quality").await.unwrap();
        assert_eq!(value.as_deref(), Some("high"));

        set_setting(&pool, "portrait_quality", "ultra").await.unwrap();
        let value: Option<String> = get_setting(&pool, "portrait_quality").await.unwrap();
        assert_eq!(value.as_deref(), Some("ultra"));
    }

    #[tokio::test]
    async fn newer_schema_version_is_refused() {
        let (_temp, pool) = setup_test_db().await;
        set_setting(&pool, "schema_version", SCHEMA_VERSION + 1)
            .await
            .unwrap();
        let err = ensure_schema_version(&pool).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn unparsable_value_is_a_config_error() {
        let (_temp, pool) = setup_test_db().await;
        set_setting(&pool, "job_slots", "many").await.unwrap();
        let err = get_setting::<i64>(&pool, "job_slots").await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
