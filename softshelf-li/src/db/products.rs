//! Product persistence
//!
//! One product per source directory: `folder_path` is globally unique, and a
//! product owns its versions (cascade delete).

use crate::models::metadata::SoftwareMetadata;
use softshelf_common::Result;
use sqlx::{Executor, Row, Sqlite, SqlitePool};

/// Catalog product row (core fields; extended metadata stays in the table).
#[derive(Debug, Clone)]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub vendor: Option<String>,
    pub category: Option<String>,
    pub icon_url: Option<String>,
    pub official_website: Option<String>,
    pub folder_path: String,
    pub is_portable: bool,
}

fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Product {
    Product {
        id: row.get("id"),
        title: row.get("title"),
        subtitle: row.get("subtitle"),
        description: row.get("description"),
        vendor: row.get("vendor"),
        category: row.get("category"),
        icon_url: row.get("icon_url"),
        official_website: row.get("official_website"),
        folder_path: row.get("folder_path"),
        is_portable: row.get::<i64, _>("is_portable") != 0,
    }
}

const PRODUCT_COLUMNS: &str =
    "id, title, subtitle, description, vendor, category, icon_url, official_website, \
     folder_path, is_portable";

/// Find the product owning a source directory.
pub async fn find_by_folder<'e, E>(ex: E, folder_path: &str) -> Result<Option<Product>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM products WHERE folder_path = ?",
        PRODUCT_COLUMNS
    );
    let row = sqlx::query(&sql).bind(folder_path).fetch_optional(ex).await?;

    Ok(row.as_ref().map(row_to_product))
}

/// Load a product by id.
pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = ?", PRODUCT_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;

    Ok(row.as_ref().map(row_to_product))
}

fn json_or_null<T: serde::Serialize>(value: &Option<T>) -> Option<String> {
    value
        .as_ref()
        .and_then(|v| serde_json::to_string(v).ok())
}

/// Insert a new product from structured metadata.
///
/// Returns the new product id. Violating the `folder_path` uniqueness
/// invariant surfaces as a database error.
pub async fn insert<'e, E>(
    ex: E,
    folder_path: &str,
    is_portable: bool,
    meta: &SoftwareMetadata,
) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO products (
            title, subtitle, description, vendor, category, icon_url,
            official_website, license_type, platform, detailed_description,
            features, system_requirements, supported_formats, installation_info,
            release_notes, release_date, patch_links, folder_path, is_portable
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&meta.title)
    .bind(&meta.subtitle)
    .bind(&meta.description)
    .bind(&meta.vendor)
    .bind(&meta.category)
    .bind(&meta.icon_url)
    .bind(&meta.official_website)
    .bind(&meta.license_type)
    .bind(&meta.platform)
    .bind(&meta.detailed_description)
    .bind(json_or_null(&meta.features))
    .bind(json_or_null(&meta.system_requirements))
    .bind(json_or_null(&meta.supported_formats))
    .bind(json_or_null(&meta.installation_info))
    .bind(&meta.release_notes)
    .bind(&meta.release_date)
    .bind(json_or_null(&meta.patch_links))
    .bind(folder_path)
    .bind(is_portable as i64)
    .execute(ex)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Update an existing product from reviewer-supplied metadata.
///
/// Only overwrites fields for which a non-empty value was provided.
pub async fn update_provided_fields<'e, E>(ex: E, id: i64, meta: &SoftwareMetadata) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let mut sets: Vec<&str> = Vec::new();
    let mut values: Vec<String> = Vec::new();

    let mut push = |column: &'static str, value: &str| {
        if !value.trim().is_empty() {
            sets.push(column);
            values.push(value.to_string());
        }
    };

    push("title", &meta.title);
    push("subtitle", meta.subtitle.as_deref().unwrap_or(""));
    push("description", &meta.description);
    push("vendor", &meta.vendor);
    push("category", &meta.category);
    push("icon_url", &meta.icon_url);
    push("official_website", &meta.official_website);
    push("license_type", meta.license_type.as_deref().unwrap_or(""));
    push("platform", meta.platform.as_deref().unwrap_or(""));
    push(
        "detailed_description",
        meta.detailed_description.as_deref().unwrap_or(""),
    );
    push("release_notes", meta.release_notes.as_deref().unwrap_or(""));
    push("release_date", meta.release_date.as_deref().unwrap_or(""));

    for (column, json) in [
        ("features", json_or_null(&meta.features)),
        ("system_requirements", json_or_null(&meta.system_requirements)),
        ("supported_formats", json_or_null(&meta.supported_formats)),
        ("installation_info", json_or_null(&meta.installation_info)),
        ("patch_links", json_or_null(&meta.patch_links)),
    ] {
        if let Some(json) = json {
            sets.push(column);
            values.push(json);
        }
    }

    if sets.is_empty() {
        return Ok(());
    }

    let assignments: Vec<String> = sets.iter().map(|c| format!("{} = ?", c)).collect();
    let sql = format!(
        "UPDATE products SET {}, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        assignments.join(", ")
    );

    let mut query = sqlx::query(&sql);
    for value in &values {
        query = query.bind(value);
    }
    query.bind(id).execute(ex).await?;

    Ok(())
}

/// Number of versions owned by a product.
pub async fn version_count<'e, E>(ex: E, product_id: i64) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM versions WHERE product_id = ?")
        .bind(product_id)
        .fetch_one(ex)
        .await?;
    Ok(count)
}

/// Delete a product (versions cascade).
pub async fn delete<'e, E>(ex: E, id: i64) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(id)
        .execute(ex)
        .await?;
    Ok(())
}
