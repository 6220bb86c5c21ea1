//! Database access for softshelf-li
//!
//! SQLite-backed catalog, scan ledger, review queue, metadata cache, and
//! scan history. Tables are created on startup; foreign keys are enforced so
//! product deletion cascades to its versions.

pub mod ledger;
pub mod metadata_cache;
pub mod products;
pub mod review;
pub mod scan_history;
pub mod versions;

use anyhow::Result;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool against the shared softshelf.db.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::debug!(path = %db_path.display(), "Connecting to database");

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePool::connect_with(options).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the ingest tables if they don't exist yet.
///
/// Public so tests can run against in-memory pools.
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            subtitle TEXT,
            description TEXT,
            vendor TEXT,
            category TEXT,
            icon_url TEXT,
            official_website TEXT,
            license_type TEXT,
            platform TEXT,
            detailed_description TEXT,
            features TEXT,
            system_requirements TEXT,
            supported_formats TEXT,
            installation_info TEXT,
            release_notes TEXT,
            release_date TEXT,
            patch_links TEXT,
            folder_path TEXT NOT NULL UNIQUE,
            is_portable INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS versions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            version_name TEXT,
            file_name TEXT NOT NULL,
            file_path TEXT NOT NULL UNIQUE,
            file_size INTEGER NOT NULL DEFAULT 0,
            release_date TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            is_portable INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scan_ledger (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            folder_path TEXT NOT NULL,
            file_name TEXT NOT NULL,
            kind TEXT NOT NULL,
            details TEXT,
            suggestion TEXT,
            is_resolved INTEGER NOT NULL DEFAULT 0,
            product_id INTEGER REFERENCES products(id) ON DELETE SET NULL,
            version_id INTEGER REFERENCES versions(id) ON DELETE SET NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(folder_path, file_name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS review_queue (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_path TEXT NOT NULL UNIQUE,
            file_name TEXT NOT NULL,
            folder_path TEXT NOT NULL,
            parsed_name TEXT,
            parsed_version TEXT,
            parsed_vendor TEXT,
            suggested_metadata TEXT,
            confidence_score REAL NOT NULL DEFAULT 0.0,
            status TEXT NOT NULL DEFAULT 'pending',
            manual_metadata TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            reviewed_at TEXT,
            reviewed_by TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS metadata_cache (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            software_name TEXT NOT NULL UNIQUE,
            metadata_json TEXT NOT NULL,
            confidence_score REAL NOT NULL DEFAULT 0.0,
            source TEXT NOT NULL DEFAULT 'ai',
            hit_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scan_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            scan_type TEXT NOT NULL,
            started_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            completed_at TEXT,
            status TEXT NOT NULL,
            new_products INTEGER NOT NULL DEFAULT 0,
            new_versions INTEGER NOT NULL DEFAULT 0,
            updated_products INTEGER NOT NULL DEFAULT 0,
            ai_generated INTEGER NOT NULL DEFAULT 0,
            icons_cached INTEGER NOT NULL DEFAULT 0,
            scanned_paths TEXT,
            use_ai INTEGER NOT NULL DEFAULT 1,
            errors TEXT,
            error_message TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_ledger_folder ON scan_ledger(folder_path)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_ledger_resolved ON scan_ledger(is_resolved)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_versions_product ON versions(product_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_review_status ON review_queue(status)")
        .execute(pool)
        .await?;

    tracing::info!("Database tables initialized");

    Ok(())
}
