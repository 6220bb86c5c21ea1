//! Scan history persistence
//!
//! One row per scan invocation, for status reporting.

use crate::models::summary::{MatchSummary, ScanSummary};
use softshelf_common::Result;
use sqlx::{Row, SqlitePool};
use std::path::PathBuf;

/// One recorded scan run.
#[derive(Debug, Clone)]
pub struct ScanHistoryRow {
    pub id: i64,
    pub scan_type: String,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub status: String,
    pub new_products: i64,
    pub new_versions: i64,
    pub ai_generated: i64,
    pub error_message: Option<String>,
}

/// Record the start of a scan. Returns the history row id.
pub async fn start(
    pool: &SqlitePool,
    scan_type: &str,
    scanned_paths: &[PathBuf],
    use_ai: bool,
) -> Result<i64> {
    let paths: Vec<String> = scanned_paths
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    let paths_json = serde_json::to_string(&paths).unwrap_or_else(|_| "[]".to_string());

    let result = sqlx::query(
        "INSERT INTO scan_history (scan_type, status, scanned_paths, use_ai) \
         VALUES (?, 'running', ?, ?)",
    )
    .bind(scan_type)
    .bind(paths_json)
    .bind(use_ai as i64)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Record the outcome of a scan run.
pub async fn finish(
    pool: &SqlitePool,
    id: i64,
    scan: &ScanSummary,
    matching: &MatchSummary,
    status: &str,
    error_message: Option<&str>,
) -> Result<()> {
    let mut errors: Vec<String> = scan.errors.clone();
    errors.extend(matching.errors.iter().cloned());
    let errors_json = serde_json::to_string(&errors).unwrap_or_else(|_| "[]".to_string());

    sqlx::query(
        r#"
        UPDATE scan_history SET
            completed_at = CURRENT_TIMESTAMP,
            status = ?,
            new_products = ?,
            new_versions = ?,
            updated_products = ?,
            ai_generated = ?,
            icons_cached = ?,
            errors = ?,
            error_message = ?
        WHERE id = ?
        "#,
    )
    .bind(status)
    .bind(scan.new_products as i64)
    .bind(matching.matched as i64)
    .bind(scan.updated_products as i64)
    .bind(matching.ai_generated as i64)
    .bind(scan.icons_cached as i64)
    .bind(errors_json)
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Most recent scan run, if any.
pub async fn latest(pool: &SqlitePool) -> Result<Option<ScanHistoryRow>> {
    let row = sqlx::query(
        "SELECT id, scan_type, started_at, completed_at, status, new_products, new_versions, \
         ai_generated, error_message \
         FROM scan_history ORDER BY id DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| ScanHistoryRow {
        id: row.get("id"),
        scan_type: row.get("scan_type"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
        status: row.get("status"),
        new_products: row.get("new_products"),
        new_versions: row.get("new_versions"),
        ai_generated: row.get("ai_generated"),
        error_message: row.get("error_message"),
    }))
}
