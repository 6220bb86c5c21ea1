//! Directory scanner
//!
//! Walks a scan root, applies the exclusion rules, and stages every eligible
//! file into the scan ledger: cleanly named files as `scanned` entries, badly
//! named ones under their highest-priority violation. Files already backed
//! by a catalog version are staged pre-resolved and linked, which makes
//! re-scanning idempotent.
//!
//! A per-root single-flight guard rejects overlapping scans of the same
//! root; without it two concurrent walks would race on the already-exists
//! checks.

use crate::config::ExclusionRules;
use crate::db::{ledger, versions};
use crate::models::summary::ScanSummary;
use crate::services::filename_validator;
use crate::services::reconciler::Reconciler;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use walkdir::WalkDir;

/// Scanner errors. These abort the invocation; per-file problems are
/// recorded in the summary's error list instead.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Another scan of the same root is already running
    #[error("Scan already in progress: {0}")]
    ScanInProgress(PathBuf),

    /// Storage failure
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// Shared-layer failure
    #[error(transparent)]
    Common(#[from] softshelf_common::Error),
}

/// Releases the single-flight slot for a root when the scan ends.
struct ScanGuard {
    active: Arc<Mutex<HashSet<PathBuf>>>,
    root: PathBuf,
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.lock() {
            active.remove(&self.root);
        }
    }
}

/// Filesystem scanner staging files into the scan ledger.
pub struct Scanner {
    db: SqlitePool,
    rules: ExclusionRules,
    active_roots: Arc<Mutex<HashSet<PathBuf>>>,
}

impl Scanner {
    pub fn new(db: SqlitePool, rules: ExclusionRules) -> Self {
        Self {
            db,
            rules,
            active_roots: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Scan a root directory, stage eligible files, then reconcile the
    /// catalog against what the walk actually saw.
    pub async fn scan(&self, root: &Path) -> Result<ScanSummary, ScanError> {
        if !root.exists() {
            return Err(ScanError::PathNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }

        let root = root
            .canonicalize()
            .map_err(|_| ScanError::PathNotFound(root.to_path_buf()))?;

        let _guard = self.acquire(&root)?;

        tracing::info!(root = %root.display(), "Starting scan");

        let mut summary = ScanSummary::default();
        let mut seen: HashSet<String> = HashSet::new();

        let walker = WalkDir::new(&root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| {
                // Excluded directories are pruned with their whole subtree
                if !e.file_type().is_dir() {
                    return true;
                }
                let name = e.file_name().to_string_lossy();
                !self.rules.is_excluded_folder(&name) && !self.rules.is_excluded_path(e.path())
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "Error accessing entry");
                    summary.errors.push(format!("Access error: {}", e));
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy().to_string();
            if self.rules.is_excluded_file(&file_name) {
                tracing::debug!(file = %file_name, "Skipping excluded file");
                continue;
            }
            if self.rules.is_excluded_path(entry.path()) {
                tracing::debug!(path = %entry.path().display(), "Skipping excluded path");
                continue;
            }

            let path_str = entry.path().to_string_lossy().to_string();
            seen.insert(path_str.clone());

            if let Err(e) = self.stage_file(entry.path(), &file_name, &mut summary).await {
                summary
                    .errors
                    .push(format!("Error processing {}: {}", path_str, e));
            }
        }

        // Remove catalog entries whose backing files vanished
        let reconciler = Reconciler::new(self.db.clone());
        match reconciler.reconcile(&root, &seen).await {
            Ok(outcome) => {
                summary.deleted_versions = outcome.deleted_versions;
                summary.deleted_products = outcome.deleted_products;
            }
            Err(e) => summary.errors.push(format!("Cleanup error: {}", e)),
        }

        tracing::info!(
            root = %root.display(),
            new_entries = summary.new_products,
            deleted_versions = summary.deleted_versions,
            deleted_products = summary.deleted_products,
            errors = summary.errors.len(),
            "Scan complete"
        );

        Ok(summary)
    }

    /// Stage one file into the ledger, skipping files already staged.
    async fn stage_file(
        &self,
        path: &Path,
        file_name: &str,
        summary: &mut ScanSummary,
    ) -> Result<(), ScanError> {
        let folder_path = path
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();

        // Idempotence: a staged file is skipped, not duplicated
        if ledger::exists(&self.db, &folder_path, file_name).await? {
            return Ok(());
        }

        let file_path = path.to_string_lossy().to_string();
        let existing_version = versions::find_by_path(&self.db, &file_path).await?;

        let report = filename_validator::validate(file_name);
        let mut entry = if report.is_valid {
            ledger::NewLedgerEntry {
                folder_path,
                file_name: file_name.to_string(),
                kind: ledger::LedgerKind::Scanned,
                details: "Scanned file awaiting matching".to_string(),
                suggestion: file_name.to_string(),
                is_resolved: false,
                product_id: None,
                version_id: None,
            }
        } else {
            // Highest-priority violation becomes the entry type
            let violation = &report.violations[0];
            ledger::NewLedgerEntry {
                folder_path,
                file_name: file_name.to_string(),
                kind: violation.kind.into(),
                details: violation.details.clone(),
                suggestion: if violation.suggestion.is_empty() {
                    file_name.to_string()
                } else {
                    violation.suggestion.clone()
                },
                is_resolved: false,
                product_id: None,
                version_id: None,
            }
        };

        // Files already in the catalog are staged pre-resolved and linked
        if let Some(version) = existing_version {
            entry.product_id = Some(version.product_id);
            entry.version_id = Some(version.id);
            entry.is_resolved = true;
            entry.details = "File already registered in the catalog".to_string();
        }

        ledger::insert(&self.db, &entry).await?;
        summary.new_products += 1;

        Ok(())
    }

    /// Take the single-flight slot for a root.
    fn acquire(&self, root: &Path) -> Result<ScanGuard, ScanError> {
        let mut active = self
            .active_roots
            .lock()
            .map_err(|_| ScanError::ScanInProgress(root.to_path_buf()))?;
        if !active.insert(root.to_path_buf()) {
            return Err(ScanError::ScanInProgress(root.to_path_buf()));
        }
        Ok(ScanGuard {
            active: Arc::clone(&self.active_roots),
            root: root.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scan_nonexistent_path() {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        let scanner = Scanner::new(pool, ExclusionRules::default());
        let result = scanner.scan(Path::new("/nonexistent/path")).await;
        match result {
            Err(ScanError::PathNotFound(_)) => {}
            other => panic!("expected PathNotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn scan_file_as_directory() {
        let temp = tempfile::TempDir::new().unwrap();
        let file = temp.path().join("plain.txt");
        std::fs::write(&file, b"x").unwrap();

        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        let scanner = Scanner::new(pool, ExclusionRules::default());
        match scanner.scan(&file).await {
            Err(ScanError::NotADirectory(_)) => {}
            other => panic!("expected NotADirectory, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn single_flight_guard_rejects_overlap() {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        let scanner = Scanner::new(pool, ExclusionRules::default());
        let root = PathBuf::from("/library");

        let first = scanner.acquire(&root).unwrap();
        match scanner.acquire(&root) {
            Err(ScanError::ScanInProgress(_)) => {}
            _ => panic!("expected ScanInProgress"),
        }
        drop(first);
        scanner.acquire(&root).unwrap();
    }
}
