//! Catalog reconciliation
//!
//! After a walk, compares the set of file paths actually seen against the
//! catalog versions under the scanned root. Versions whose backing file
//! vanished are deleted; products left with zero versions are deleted with
//! them. Stale ledger entries for vanished files are dropped too, so a
//! resolved entry never outlives its catalog links.

use crate::db::{ledger, products, versions};
use softshelf_common::Result;
use sqlx::SqlitePool;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

/// What a reconciliation pass removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOutcome {
    pub deleted_versions: u64,
    pub deleted_products: u64,
    pub deleted_entries: u64,
}

/// Removes catalog records whose backing files no longer exist on disk.
pub struct Reconciler {
    db: SqlitePool,
}

impl Reconciler {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Reconcile the catalog under `root` against the `seen` path set from
    /// the walk that just finished.
    pub async fn reconcile(&self, root: &Path, seen: &HashSet<String>) -> Result<ReconcileOutcome> {
        let root_prefix = root.to_string_lossy().to_string();
        let mut outcome = ReconcileOutcome::default();

        // Versions under this root whose path was not seen are gone
        let candidates = versions::list_under_root(&self.db, &root_prefix).await?;
        let mut vanished_ids = Vec::new();
        let mut affected_products = BTreeSet::new();
        for version in &candidates {
            if !seen.contains(&version.file_path) {
                tracing::info!(path = %version.file_path, "Deleted file detected");
                vanished_ids.push(version.id);
                affected_products.insert(version.product_id);
            }
        }

        outcome.deleted_versions = versions::delete_by_ids(&self.db, &vanished_ids).await?;

        // Products that lost their last version are garbage
        for product_id in affected_products {
            if products::version_count(&self.db, product_id).await? == 0 {
                products::delete(&self.db, product_id).await?;
                outcome.deleted_products += 1;
            }
        }

        // Ledger entries for vanished files are stale regardless of state
        let entries = ledger::list_under_root(&self.db, &root_prefix).await?;
        let stale: Vec<i64> = entries
            .iter()
            .filter(|e| !seen.contains(&e.file_path().to_string_lossy().to_string()))
            .map(|e| e.id)
            .collect();
        outcome.deleted_entries = ledger::delete_by_ids(&self.db, &stale).await?;

        if outcome.deleted_versions > 0 || outcome.deleted_products > 0 {
            tracing::info!(
                deleted_versions = outcome.deleted_versions,
                deleted_products = outcome.deleted_products,
                deleted_entries = outcome.deleted_entries,
                "Reconciliation removed vanished catalog records"
            );
        }

        Ok(outcome)
    }
}
