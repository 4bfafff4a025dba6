//! Performer record portrait cross-reference
//!
//! The artists table is owned by the catalog subsystem; this module only
//! performs the portrait-path write that the select operation requires,
//! inside the caller's transaction.

use sqlx::{Sqlite, SqlitePool, Transaction};

use mplan_common::Result;

/// Point the performer record at the selected portrait
///
/// Upserts so that selecting a portrait for a performer the catalog has not
/// registered yet still succeeds.
pub async fn set_portrait(
    tx: &mut Transaction<'_, Sqlite>,
    artist: &str,
    portrait_path: &str,
) -> std::result::Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO artists (name, portrait_path, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT(name) DO UPDATE SET
            portrait_path = excluded.portrait_path,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(artist)
    .bind(portrait_path)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Current portrait path of a performer, if any
pub async fn get_portrait(pool: &SqlitePool, artist: &str) -> Result<Option<String>> {
    let path: Option<Option<String>> =
        sqlx::query_scalar("SELECT portrait_path FROM artists WHERE name = ?")
            .bind(artist)
            .fetch_optional(pool)
            .await?;

    Ok(path.flatten())
}
