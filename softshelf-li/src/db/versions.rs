//! Version persistence
//!
//! One version per physical file: `file_path` is globally unique, so a
//! file on disk maps to at most one catalog version.

use softshelf_common::Result;
use sqlx::{Executor, Row, Sqlite, SqlitePool};

/// Catalog version row.
#[derive(Debug, Clone)]
pub struct Version {
    pub id: i64,
    pub product_id: i64,
    pub version_name: Option<String>,
    pub file_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub is_portable: bool,
}

fn row_to_version(row: &sqlx::sqlite::SqliteRow) -> Version {
    Version {
        id: row.get("id"),
        product_id: row.get("product_id"),
        version_name: row.get("version_name"),
        file_name: row.get("file_name"),
        file_path: row.get("file_path"),
        file_size: row.get("file_size"),
        is_portable: row.get::<i64, _>("is_portable") != 0,
    }
}

/// Find the version backed by a physical file.
pub async fn find_by_path<'e, E>(ex: E, file_path: &str) -> Result<Option<Version>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        "SELECT id, product_id, version_name, file_name, file_path, file_size, is_portable \
         FROM versions WHERE file_path = ?",
    )
    .bind(file_path)
    .fetch_optional(ex)
    .await?;

    Ok(row.as_ref().map(row_to_version))
}

/// Insert a new version for a product. Returns the new version id.
pub async fn insert<'e, E>(
    ex: E,
    product_id: i64,
    file_name: &str,
    file_path: &str,
    file_size: i64,
    version_name: Option<&str>,
    is_portable: bool,
) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO versions (product_id, version_name, file_name, file_path, file_size, is_portable)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(product_id)
    .bind(version_name)
    .bind(file_name)
    .bind(file_path)
    .bind(file_size)
    .bind(is_portable as i64)
    .execute(ex)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Rename the backing file of a version.
pub async fn update_path<'e, E>(ex: E, id: i64, file_name: &str, file_path: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE versions SET file_name = ?, file_path = ? WHERE id = ?")
        .bind(file_name)
        .bind(file_path)
        .bind(id)
        .execute(ex)
        .await?;
    Ok(())
}

/// All versions whose owning product's folder lies under a scanned root.
pub async fn list_under_root(pool: &SqlitePool, root_prefix: &str) -> Result<Vec<Version>> {
    let like = format!("{}%", root_prefix);
    let rows = sqlx::query(
        "SELECT v.id, v.product_id, v.version_name, v.file_name, v.file_path, v.file_size, v.is_portable \
         FROM versions v JOIN products p ON p.id = v.product_id \
         WHERE p.folder_path LIKE ?",
    )
    .bind(&like)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(row_to_version).collect())
}

/// Delete versions by id. Returns the number of rows removed.
pub async fn delete_by_ids<'e, E>(ex: E, ids: &[i64]) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    if ids.is_empty() {
        return Ok(0);
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!("DELETE FROM versions WHERE id IN ({})", placeholders);
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(id);
    }
    let result = query.execute(ex).await?;
    Ok(result.rows_affected())
}
