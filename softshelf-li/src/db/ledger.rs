//! Scan ledger persistence
//!
//! The staging table of per-file records produced by the scanner. Each row
//! is either `scanned` (clean name, awaiting matching) or carries its
//! highest-priority naming violation. Resolved rows are linked to the
//! catalog product/version they were materialized into.

use crate::services::filename_validator::ViolationKind;
use softshelf_common::{Error, Result};
use sqlx::{Executor, Row, Sqlite, SqlitePool};
use std::collections::HashMap;

/// Entry kind: cleanly scanned, or one of the naming violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerKind {
    Scanned,
    UnderscoreOveruse,
    BracketUsage,
    VersionFormat,
    LowercaseName,
    ComplexName,
    InvalidChars,
}

impl LedgerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerKind::Scanned => "scanned",
            LedgerKind::UnderscoreOveruse => "underscore_overuse",
            LedgerKind::BracketUsage => "bracket_usage",
            LedgerKind::VersionFormat => "version_format",
            LedgerKind::LowercaseName => "lowercase_name",
            LedgerKind::ComplexName => "complex_name",
            LedgerKind::InvalidChars => "invalid_chars",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "scanned" => Ok(LedgerKind::Scanned),
            "underscore_overuse" => Ok(LedgerKind::UnderscoreOveruse),
            "bracket_usage" => Ok(LedgerKind::BracketUsage),
            "version_format" => Ok(LedgerKind::VersionFormat),
            "lowercase_name" => Ok(LedgerKind::LowercaseName),
            "complex_name" => Ok(LedgerKind::ComplexName),
            "invalid_chars" => Ok(LedgerKind::InvalidChars),
            other => Err(Error::Internal(format!("Unknown ledger kind: {}", other))),
        }
    }

    /// Whether this entry records a naming violation.
    pub fn is_violation(&self) -> bool {
        !matches!(self, LedgerKind::Scanned)
    }
}

impl From<ViolationKind> for LedgerKind {
    fn from(kind: ViolationKind) -> Self {
        match kind {
            ViolationKind::UnderscoreOveruse => LedgerKind::UnderscoreOveruse,
            ViolationKind::BracketUsage => LedgerKind::BracketUsage,
            ViolationKind::VersionFormat => LedgerKind::VersionFormat,
            ViolationKind::LowercaseName => LedgerKind::LowercaseName,
            ViolationKind::ComplexName => LedgerKind::ComplexName,
            ViolationKind::InvalidChars => LedgerKind::InvalidChars,
        }
    }
}

/// One staged file record.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub id: i64,
    pub folder_path: String,
    pub file_name: String,
    pub kind: LedgerKind,
    pub details: Option<String>,
    pub suggestion: Option<String>,
    pub is_resolved: bool,
    pub product_id: Option<i64>,
    pub version_id: Option<i64>,
}

impl LedgerEntry {
    /// Full path of the staged file.
    pub fn file_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.folder_path).join(&self.file_name)
    }
}

/// New entry to stage. Refs are set only for files already in the catalog.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub folder_path: String,
    pub file_name: String,
    pub kind: LedgerKind,
    pub details: String,
    pub suggestion: String,
    pub is_resolved: bool,
    pub product_id: Option<i64>,
    pub version_id: Option<i64>,
}

const ENTRY_COLUMNS: &str =
    "id, folder_path, file_name, kind, details, suggestion, is_resolved, product_id, version_id";

fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<LedgerEntry> {
    let kind: String = row.get("kind");
    Ok(LedgerEntry {
        id: row.get("id"),
        folder_path: row.get("folder_path"),
        file_name: row.get("file_name"),
        kind: LedgerKind::parse(&kind)?,
        details: row.get("details"),
        suggestion: row.get("suggestion"),
        is_resolved: row.get::<i64, _>("is_resolved") != 0,
        product_id: row.get("product_id"),
        version_id: row.get("version_id"),
    })
}

/// Whether an entry already exists for this folder + file name.
pub async fn exists<'e, E>(ex: E, folder_path: &str, file_name: &str) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM scan_ledger WHERE folder_path = ? AND file_name = ?",
    )
    .bind(folder_path)
    .bind(file_name)
    .fetch_one(ex)
    .await?;
    Ok(count > 0)
}

/// Stage a new entry. Returns the new row id.
pub async fn insert<'e, E>(ex: E, entry: &NewLedgerEntry) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO scan_ledger
            (folder_path, file_name, kind, details, suggestion, is_resolved, product_id, version_id)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&entry.folder_path)
    .bind(&entry.file_name)
    .bind(entry.kind.as_str())
    .bind(&entry.details)
    .bind(&entry.suggestion)
    .bind(entry.is_resolved as i64)
    .bind(entry.product_id)
    .bind(entry.version_id)
    .execute(ex)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Load one entry by id.
pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<LedgerEntry>> {
    let sql = format!("SELECT {} FROM scan_ledger WHERE id = ?", ENTRY_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    row.as_ref().map(row_to_entry).transpose()
}

/// Unresolved `scanned` entries awaiting matching, oldest first.
pub async fn list_unresolved_scanned(pool: &SqlitePool) -> Result<Vec<LedgerEntry>> {
    let sql = format!(
        "SELECT {} FROM scan_ledger WHERE kind = 'scanned' AND is_resolved = 0 ORDER BY id",
        ENTRY_COLUMNS
    );
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(row_to_entry).collect()
}

/// Entries filtered by resolution state, newest first.
pub async fn list_by_resolved(pool: &SqlitePool, resolved: bool) -> Result<Vec<LedgerEntry>> {
    let sql = format!(
        "SELECT {} FROM scan_ledger WHERE is_resolved = ? ORDER BY created_at DESC, id DESC",
        ENTRY_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(resolved as i64)
        .fetch_all(pool)
        .await?;
    rows.iter().map(row_to_entry).collect()
}

/// All entries under a root folder (for reconciliation).
pub async fn list_under_root(pool: &SqlitePool, root_prefix: &str) -> Result<Vec<LedgerEntry>> {
    let like = format!("{}%", root_prefix);
    let sql = format!(
        "SELECT {} FROM scan_ledger WHERE folder_path LIKE ?",
        ENTRY_COLUMNS
    );
    let rows = sqlx::query(&sql).bind(&like).fetch_all(pool).await?;
    rows.iter().map(row_to_entry).collect()
}

/// Ledger statistics: totals plus per-violation-type counts.
#[derive(Debug, Clone, Default)]
pub struct LedgerStats {
    pub total: i64,
    pub scanned: i64,
    pub mismatched: i64,
    pub by_type: HashMap<String, i64>,
}

pub async fn stats(pool: &SqlitePool) -> Result<LedgerStats> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scan_ledger")
        .fetch_one(pool)
        .await?;
    let scanned: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM scan_ledger WHERE kind = 'scanned'")
            .fetch_one(pool)
            .await?;

    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT kind, COUNT(*) FROM scan_ledger WHERE kind != 'scanned' GROUP BY kind",
    )
    .fetch_all(pool)
    .await?;

    let by_type: HashMap<String, i64> = rows.into_iter().collect();
    Ok(LedgerStats {
        total,
        scanned,
        mismatched: total - scanned,
        by_type,
    })
}

/// Mark an entry resolved without linking it to the catalog.
pub async fn mark_resolved<'e, E>(ex: E, id: i64) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE scan_ledger SET is_resolved = 1 WHERE id = ?")
        .bind(id)
        .execute(ex)
        .await?;
    Ok(())
}

/// Resolve an entry and link it to its catalog product/version.
///
/// The two refs are always written together, keeping the both-or-neither
/// invariant on resolved rows.
pub async fn link_and_resolve<'e, E>(
    ex: E,
    id: i64,
    product_id: i64,
    version_id: i64,
) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "UPDATE scan_ledger SET is_resolved = 1, product_id = ?, version_id = ? WHERE id = ?",
    )
    .bind(product_id)
    .bind(version_id)
    .bind(id)
    .execute(ex)
    .await?;
    Ok(())
}

/// Delete one entry.
pub async fn delete<'e, E>(ex: E, id: i64) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("DELETE FROM scan_ledger WHERE id = ?")
        .bind(id)
        .execute(ex)
        .await?;
    Ok(())
}

/// Delete entries by id. Returns the number of rows removed.
pub async fn delete_by_ids<'e, E>(ex: E, ids: &[i64]) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    if ids.is_empty() {
        return Ok(0);
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!("DELETE FROM scan_ledger WHERE id IN ({})", placeholders);
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(id);
    }
    let result = query.execute(ex).await?;
    Ok(result.rows_affected())
}

/// Bulk delete, optionally restricted to resolved entries.
pub async fn clear(pool: &SqlitePool, resolved_only: bool) -> Result<u64> {
    let result = if resolved_only {
        sqlx::query("DELETE FROM scan_ledger WHERE is_resolved = 1")
            .execute(pool)
            .await?
    } else {
        sqlx::query("DELETE FROM scan_ledger").execute(pool).await?
    };
    Ok(result.rows_affected())
}
