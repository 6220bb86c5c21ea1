//! Metadata cache persistence
//!
//! Short-circuits repeated AI calls for the same normalized software name.
//! Written whenever a review item is approved or manually resolved; read by
//! the auto-matcher before it reaches for the synthesizer.

use softshelf_common::Result;
use sqlx::{Executor, Row, Sqlite, SqlitePool};

/// Origin of a cached metadata payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
    Ai,
    Manual,
    Web,
}

impl CacheSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheSource::Ai => "ai",
            CacheSource::Manual => "manual",
            CacheSource::Web => "web",
        }
    }
}

/// One cached metadata payload, keyed by normalized software name.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub id: i64,
    pub software_name: String,
    pub metadata_json: String,
    pub confidence_score: f64,
    pub source: String,
    pub hit_count: i64,
}

/// Look up cached metadata by normalized name.
pub async fn lookup(pool: &SqlitePool, software_name: &str) -> Result<Option<CacheEntry>> {
    let row = sqlx::query(
        "SELECT id, software_name, metadata_json, confidence_score, source, hit_count \
         FROM metadata_cache WHERE software_name = ?",
    )
    .bind(software_name)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| CacheEntry {
        id: row.get("id"),
        software_name: row.get("software_name"),
        metadata_json: row.get("metadata_json"),
        confidence_score: row.get("confidence_score"),
        source: row.get("source"),
        hit_count: row.get("hit_count"),
    }))
}

/// Count a cache hit.
pub async fn record_hit<'e, E>(ex: E, id: i64) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE metadata_cache SET hit_count = hit_count + 1 WHERE id = ?")
        .bind(id)
        .execute(ex)
        .await?;
    Ok(())
}

/// Store (or refresh) a cached payload for a normalized name.
pub async fn store<'e, E>(
    ex: E,
    software_name: &str,
    metadata_json: &str,
    confidence_score: f64,
    source: CacheSource,
) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO metadata_cache (software_name, metadata_json, confidence_score, source)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(software_name) DO UPDATE SET
            metadata_json = excluded.metadata_json,
            confidence_score = excluded.confidence_score,
            source = excluded.source,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(software_name)
    .bind(metadata_json)
    .bind(confidence_score)
    .bind(source.as_str())
    .execute(ex)
    .await?;
    Ok(())
}
