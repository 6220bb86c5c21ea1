//! Scan and match result summaries
//!
//! These are the values handed to the (out-of-scope) web layer and recorded
//! in scan history. Partial failure is the norm: both summaries carry an
//! `errors` list instead of aborting on the first bad folder.

use serde::Serialize;

/// Result of one scan invocation over a single root.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    /// Ledger entries staged by this run (files seen for the first time)
    pub new_products: u64,
    /// Catalog versions created by this run
    pub new_versions: u64,
    /// Existing products whose fields were updated
    pub updated_products: u64,
    /// Versions removed by reconciliation
    pub deleted_versions: u64,
    /// Products removed by reconciliation
    pub deleted_products: u64,
    /// Metadata payloads generated by the AI provider
    pub ai_generated: u64,
    /// Icons cached (populated by the out-of-scope image layer)
    pub icons_cached: u64,
    /// Non-fatal errors encountered during the run
    pub errors: Vec<String>,
}

impl ScanSummary {
    /// Fold another summary into this one (multi-path scheduler runs).
    pub fn absorb(&mut self, other: ScanSummary) {
        self.new_products += other.new_products;
        self.new_versions += other.new_versions;
        self.updated_products += other.updated_products;
        self.deleted_versions += other.deleted_versions;
        self.deleted_products += other.deleted_products;
        self.ai_generated += other.ai_generated;
        self.icons_cached += other.icons_cached;
        self.errors.extend(other.errors);
    }
}

/// Compact product projection returned to callers after matching.
#[derive(Debug, Clone, Serialize)]
pub struct ProductSummary {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub vendor: Option<String>,
    pub category: Option<String>,
    pub icon_url: Option<String>,
    pub folder_path: String,
}

/// Result of one auto-match batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchSummary {
    /// Ledger entries resolved into catalog versions
    pub matched: u64,
    /// Entries whose folder group failed to materialize
    pub failed: u64,
    /// Entries routed to the review queue instead of the catalog
    pub queued_for_review: u64,
    /// Metadata payloads generated by the AI provider during this batch
    pub ai_generated: u64,
    /// Non-fatal errors (clarity/synthesis failures, folder rollbacks)
    pub errors: Vec<String>,
    /// Products created or updated by this batch
    pub products: Vec<ProductSummary>,
}
