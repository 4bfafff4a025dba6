//! Song record persistence

use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::SongRecord;
use mplan_common::{Error, Result};

/// Insert a synchronous generation result record
pub async fn insert_song(pool: &SqlitePool, record: &SongRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO songs (
            record_id, owner, artifact, song_id, mode,
            artist, concept, lyrics, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.record_id.to_string())
    .bind(&record.owner)
    .bind(&record.artifact)
    .bind(record.song_id)
    .bind(&record.mode)
    .bind(&record.artist)
    .bind(&record.concept)
    .bind(&record.lyrics)
    .bind(record.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load one song record by id
pub async fn load_song(pool: &SqlitePool, record_id: Uuid) -> Result<Option<SongRecord>> {
    let row = sqlx::query(
        r#"
        SELECT record_id, owner, artifact, song_id, mode,
               artist, concept, lyrics, created_at
        FROM songs
        WHERE record_id = ?
        "#,
    )
    .bind(record_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(song_from_row).transpose()
}

/// Number of song records owned by an actor
pub async fn count_songs(pool: &SqlitePool, owner: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM songs WHERE owner = ?")
        .bind(owner)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

fn song_from_row(row: sqlx::sqlite::SqliteRow) -> Result<SongRecord> {
    let record_id: String = row.get("record_id");
    let record_id = Uuid::parse_str(&record_id)
        .map_err(|e| Error::Internal(format!("Invalid record id in database: {}", e)))?;

    let created_at: String = row.get("created_at");
    let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| Error::Internal(format!("Failed to parse created_at: {}", e)))?
        .with_timezone(&chrono::Utc);

    Ok(SongRecord {
        record_id,
        owner: row.get("owner"),
        artifact: row.get("artifact"),
        song_id: row.get("song_id"),
        mode: row.get("mode"),
        artist: row.get("artist"),
        concept: row.get("concept"),
        lyrics: row.get("lyrics"),
        created_at,
    })
}
