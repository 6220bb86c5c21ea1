//! Review queue persistence
//!
//! Items the auto-matcher could not confidently resolve, awaiting human
//! disposition. `file_path` is unique: re-queuing the same file updates the
//! pending suggestion instead of duplicating it.

use softshelf_common::{Error, Result};
use sqlx::{Executor, Row, Sqlite, SqlitePool};

/// Review item lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewStatus {
    Pending,
    Approved,
    Manual,
    Ignored,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Manual => "manual",
            ReviewStatus::Ignored => "ignored",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ReviewStatus::Pending),
            "approved" => Ok(ReviewStatus::Approved),
            "manual" => Ok(ReviewStatus::Manual),
            "ignored" => Ok(ReviewStatus::Ignored),
            other => Err(Error::Internal(format!("Unknown review status: {}", other))),
        }
    }
}

/// One item awaiting (or past) review.
#[derive(Debug, Clone)]
pub struct ReviewItem {
    pub id: i64,
    pub file_path: String,
    pub file_name: String,
    pub folder_path: String,
    pub parsed_name: Option<String>,
    pub parsed_version: Option<String>,
    pub parsed_vendor: Option<String>,
    pub suggested_metadata: Option<String>,
    pub confidence_score: f64,
    pub status: ReviewStatus,
    pub manual_metadata: Option<String>,
    pub reviewed_at: Option<String>,
    pub reviewed_by: Option<String>,
}

const ITEM_COLUMNS: &str = "id, file_path, file_name, folder_path, parsed_name, parsed_version, \
     parsed_vendor, suggested_metadata, confidence_score, status, manual_metadata, \
     reviewed_at, reviewed_by";

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Result<ReviewItem> {
    let status: String = row.get("status");
    Ok(ReviewItem {
        id: row.get("id"),
        file_path: row.get("file_path"),
        file_name: row.get("file_name"),
        folder_path: row.get("folder_path"),
        parsed_name: row.get("parsed_name"),
        parsed_version: row.get("parsed_version"),
        parsed_vendor: row.get("parsed_vendor"),
        suggested_metadata: row.get("suggested_metadata"),
        confidence_score: row.get("confidence_score"),
        status: ReviewStatus::parse(&status)?,
        manual_metadata: row.get("manual_metadata"),
        reviewed_at: row.get("reviewed_at"),
        reviewed_by: row.get("reviewed_by"),
    })
}

/// Fields captured when queueing a file for review.
#[derive(Debug, Clone)]
pub struct NewReviewItem {
    pub file_path: String,
    pub file_name: String,
    pub folder_path: String,
    pub parsed_name: Option<String>,
    pub parsed_version: Option<String>,
    pub parsed_vendor: Option<String>,
    pub suggested_metadata: String,
    pub confidence_score: f64,
}

/// Queue a file for review. Re-queuing an already-pending file refreshes its
/// suggestion; items a reviewer has already dispositioned are left alone.
pub async fn upsert_pending<'e, E>(ex: E, item: &NewReviewItem) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO review_queue
            (file_path, file_name, folder_path, parsed_name, parsed_version, parsed_vendor,
             suggested_metadata, confidence_score, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'pending')
        ON CONFLICT(file_path) DO UPDATE SET
            parsed_name = excluded.parsed_name,
            parsed_version = excluded.parsed_version,
            parsed_vendor = excluded.parsed_vendor,
            suggested_metadata = excluded.suggested_metadata,
            confidence_score = excluded.confidence_score
        WHERE review_queue.status = 'pending'
        "#,
    )
    .bind(&item.file_path)
    .bind(&item.file_name)
    .bind(&item.folder_path)
    .bind(&item.parsed_name)
    .bind(&item.parsed_version)
    .bind(&item.parsed_vendor)
    .bind(&item.suggested_metadata)
    .bind(item.confidence_score)
    .execute(ex)
    .await?;
    Ok(())
}

/// Load one item by id.
pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<ReviewItem>> {
    let sql = format!("SELECT {} FROM review_queue WHERE id = ?", ITEM_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    row.as_ref().map(row_to_item).transpose()
}

/// List items, optionally filtered by status, newest first.
pub async fn list(
    pool: &SqlitePool,
    status: Option<ReviewStatus>,
    offset: i64,
    limit: i64,
) -> Result<(i64, Vec<ReviewItem>)> {
    let (total, rows) = match status {
        Some(status) => {
            let total: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM review_queue WHERE status = ?")
                    .bind(status.as_str())
                    .fetch_one(pool)
                    .await?;
            let sql = format!(
                "SELECT {} FROM review_queue WHERE status = ? \
                 ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
                ITEM_COLUMNS
            );
            let rows = sqlx::query(&sql)
                .bind(status.as_str())
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?;
            (total, rows)
        }
        None => {
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM review_queue")
                .fetch_one(pool)
                .await?;
            let sql = format!(
                "SELECT {} FROM review_queue ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
                ITEM_COLUMNS
            );
            let rows = sqlx::query(&sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?;
            (total, rows)
        }
    };

    let items: Result<Vec<ReviewItem>> = rows.iter().map(row_to_item).collect();
    Ok((total, items?))
}

/// Transition an item to a terminal status, recording reviewer and time.
pub async fn set_status<'e, E>(
    ex: E,
    id: i64,
    status: ReviewStatus,
    reviewed_by: Option<&str>,
) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "UPDATE review_queue SET status = ?, reviewed_at = CURRENT_TIMESTAMP, reviewed_by = ? \
         WHERE id = ?",
    )
    .bind(status.as_str())
    .bind(reviewed_by)
    .bind(id)
    .execute(ex)
    .await?;
    Ok(())
}

/// Store reviewer-entered metadata alongside the manual disposition.
pub async fn set_manual_metadata<'e, E>(ex: E, id: i64, metadata_json: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE review_queue SET manual_metadata = ? WHERE id = ?")
        .bind(metadata_json)
        .bind(id)
        .execute(ex)
        .await?;
    Ok(())
}

/// Replace the suggestion after an operator-driven re-search.
pub async fn update_suggestion<'e, E>(
    ex: E,
    id: i64,
    parsed_name: &str,
    metadata_json: &str,
    confidence_score: f64,
) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "UPDATE review_queue SET parsed_name = ?, suggested_metadata = ?, confidence_score = ? \
         WHERE id = ?",
    )
    .bind(parsed_name)
    .bind(metadata_json)
    .bind(confidence_score)
    .bind(id)
    .execute(ex)
    .await?;
    Ok(())
}

/// Per-status counts for the review dashboard.
#[derive(Debug, Clone, Default)]
pub struct ReviewStats {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub manual: i64,
    pub ignored: i64,
}

pub async fn stats(pool: &SqlitePool) -> Result<ReviewStats> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM review_queue GROUP BY status")
            .fetch_all(pool)
            .await?;

    let mut stats = ReviewStats::default();
    for (status, count) in rows {
        stats.total += count;
        match status.as_str() {
            "pending" => stats.pending = count,
            "approved" => stats.approved = count,
            "manual" => stats.manual = count,
            "ignored" => stats.ignored = count,
            _ => {}
        }
    }
    Ok(stats)
}
