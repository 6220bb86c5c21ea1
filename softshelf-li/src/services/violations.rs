//! Naming-violation administration
//!
//! Operator-facing operations over the scan ledger's violation entries:
//! list, stats, resolve, delete, clear, and renaming the backing file to a
//! compliant name. Renaming touches the filesystem and keeps any linked
//! catalog version's path in sync.

use crate::db::{ledger, versions};
use sqlx::SqlitePool;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViolationError {
    #[error("Ledger entry not found: {0}")]
    NotFound(i64),

    #[error("File not found on disk: {0}")]
    FileMissing(PathBuf),

    #[error("A file with the target name already exists: {0}")]
    TargetExists(String),

    #[error("Entry {0} has no usable suggestion")]
    NoSuggestion(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error(transparent)]
    Common(#[from] softshelf_common::Error),
}

/// Result of renaming a staged file.
#[derive(Debug, Clone)]
pub struct RenameOutcome {
    pub old_filename: String,
    pub new_filename: String,
    pub file_path: PathBuf,
    /// Product owning the updated version, when one was linked
    pub product_id: Option<i64>,
}

/// Administrative operations over ledger violation entries.
pub struct ViolationOps {
    db: SqlitePool,
}

impl ViolationOps {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Entries filtered by resolution state, newest first.
    pub async fn list(&self, resolved: bool) -> Result<Vec<ledger::LedgerEntry>, ViolationError> {
        Ok(ledger::list_by_resolved(&self.db, resolved).await?)
    }

    /// Ledger statistics (scanned vs mismatched, per-type counts).
    pub async fn stats(&self) -> Result<ledger::LedgerStats, ViolationError> {
        Ok(ledger::stats(&self.db).await?)
    }

    /// Mark an entry resolved without touching the catalog.
    pub async fn resolve(&self, id: i64) -> Result<(), ViolationError> {
        self.require(id).await?;
        ledger::mark_resolved(&self.db, id).await?;
        Ok(())
    }

    /// Delete one entry.
    pub async fn delete(&self, id: i64) -> Result<(), ViolationError> {
        self.require(id).await?;
        ledger::delete(&self.db, id).await?;
        Ok(())
    }

    /// Bulk delete entries, optionally only resolved ones.
    pub async fn clear(&self, resolved_only: bool) -> Result<u64, ViolationError> {
        Ok(ledger::clear(&self.db, resolved_only).await?)
    }

    /// Rename the backing file on disk, update any linked catalog version,
    /// and mark the entry resolved.
    pub async fn rename(
        &self,
        id: i64,
        new_filename: &str,
    ) -> Result<RenameOutcome, ViolationError> {
        let entry = self.require(id).await?;

        let folder = PathBuf::from(&entry.folder_path);
        let old_path = folder.join(&entry.file_name);
        let new_path = folder.join(new_filename);

        if !old_path.exists() {
            return Err(ViolationError::FileMissing(old_path));
        }
        if new_path.exists() {
            return Err(ViolationError::TargetExists(new_filename.to_string()));
        }

        std::fs::rename(&old_path, &new_path)?;
        tracing::info!(
            from = %old_path.display(),
            to = %new_path.display(),
            "Renamed staged file"
        );

        // Keep a linked catalog version in sync with the new path
        let old_path_str = old_path.to_string_lossy().to_string();
        let new_path_str = new_path.to_string_lossy().to_string();
        let mut product_id = None;
        if let Some(version) = versions::find_by_path(&self.db, &old_path_str).await? {
            versions::update_path(&self.db, version.id, new_filename, &new_path_str).await?;
            product_id = Some(version.product_id);
        }

        ledger::mark_resolved(&self.db, id).await?;

        Ok(RenameOutcome {
            old_filename: entry.file_name,
            new_filename: new_filename.to_string(),
            file_path: new_path,
            product_id,
        })
    }

    /// Rename using the entry's own suggestion.
    pub async fn rename_to_suggestion(&self, id: i64) -> Result<RenameOutcome, ViolationError> {
        let entry = self.require(id).await?;
        let suggestion = entry
            .suggestion
            .as_deref()
            .filter(|s| !s.trim().is_empty() && *s != entry.file_name)
            .ok_or(ViolationError::NoSuggestion(id))?
            .to_string();
        self.rename(id, &suggestion).await
    }

    async fn require(&self, id: i64) -> Result<ledger::LedgerEntry, ViolationError> {
        ledger::get(&self.db, id)
            .await?
            .ok_or(ViolationError::NotFound(id))
    }
}
