//! Auto-matcher
//!
//! Consumes unresolved `scanned` ledger entries and turns them into catalog
//! products and versions:
//!
//! 1. split-archive parts are dropped from unattended batches;
//! 2. entries group by folder (one product candidate per folder);
//! 3. each folder passes the clarity gate (AI judgment, fail-open);
//! 4. metadata comes from the reviewer (manual mode), the metadata cache,
//!    or the synthesizer, with heuristic fallback on synthesis failure;
//! 5. synthesized metadata is confidence-scored: high scores materialize,
//!    low scores route the folder to the review queue;
//! 6. materialization runs per folder inside a transaction, so one bad
//!    folder rolls back alone and the batch continues.

use crate::db::{ledger, metadata_cache, products, review, versions};
use crate::models::metadata::SoftwareMetadata;
use crate::models::summary::{MatchSummary, ProductSummary};
use crate::services::ai_client::{Clarity, SynthesisError, TextSynthClient};
use crate::services::confidence;
use crate::services::filename_parser::{self, ParsedFilename};
use chrono::Utc;
use softshelf_common::events::{EventBus, ShelfEvent};
use softshelf_common::{Error, Result};
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::path::Path;

/// Cache key patterns purged after a successful batch.
const INVALIDATED_CACHE_PATTERNS: &[&str] = &[
    "products_list:*",
    "products_recent:*",
    "products_by_category:*",
    "search_suggestions:*",
    "stats_overview:*",
    "stats_categories:*",
];

/// Mode flags for one match batch.
#[derive(Debug, Clone, Default)]
pub struct MatchOptions {
    /// True for operator-initiated matching: split-archive filtering and
    /// the clarity gate are skipped.
    pub skip_clarity_check: bool,
    /// Metadata supplied by a human, used verbatim instead of synthesis.
    pub provided_metadata: Option<SoftwareMetadata>,
}

/// Where a folder's metadata came from.
enum MetadataOrigin {
    Provided,
    Cache(f64),
    Synthesized,
    Fallback,
}

enum FolderOutcome {
    Materialized {
        product: ProductSummary,
        resolved_entries: u64,
    },
    SentToReview {
        queued: u64,
    },
}

/// Orchestrates clarity classification, metadata synthesis, confidence
/// scoring, and catalog materialization for batches of ledger entries.
pub struct AutoMatcher {
    db: SqlitePool,
    client: TextSynthClient,
    events: EventBus,
    auto_accept_threshold: f64,
}

impl AutoMatcher {
    pub fn new(
        db: SqlitePool,
        client: TextSynthClient,
        events: EventBus,
        auto_accept_threshold: f64,
    ) -> Self {
        Self {
            db,
            client,
            events,
            auto_accept_threshold,
        }
    }

    /// Match a batch of ledger entries into the catalog.
    ///
    /// Never fails as a whole: per-folder problems are recorded in the
    /// summary's error list and the remaining folders proceed.
    pub async fn match_entries(
        &self,
        entries: Vec<ledger::LedgerEntry>,
        opts: &MatchOptions,
    ) -> MatchSummary {
        let mut summary = MatchSummary::default();
        if entries.is_empty() {
            return summary;
        }

        // 1. Unattended batches never touch split-archive parts
        let eligible: Vec<ledger::LedgerEntry> = if opts.skip_clarity_check {
            entries
        } else {
            entries
                .into_iter()
                .filter(|e| !filename_parser::is_split_archive(&e.file_name))
                .collect()
        };

        // 2. One product candidate per folder
        let mut folder_groups: BTreeMap<String, Vec<ledger::LedgerEntry>> = BTreeMap::new();
        for entry in eligible {
            folder_groups
                .entry(entry.folder_path.clone())
                .or_default()
                .push(entry);
        }

        // 3. Clarity gate: unclear folders stay in the scanned backlog
        let folder_groups = if opts.skip_clarity_check {
            folder_groups
        } else {
            self.filter_clear_folders(folder_groups, &mut summary).await
        };

        // 4-5. Materialize folder by folder, each inside its own boundary
        for (folder_path, group) in folder_groups {
            match self.process_folder(&folder_path, &group, opts, &mut summary).await {
                Ok(FolderOutcome::Materialized {
                    product,
                    resolved_entries,
                }) => {
                    summary.matched += resolved_entries;
                    summary.products.push(product);
                }
                Ok(FolderOutcome::SentToReview { queued }) => {
                    summary.queued_for_review += queued;
                }
                Err(e) => {
                    summary.failed += group.len() as u64;
                    summary
                        .errors
                        .push(format!("Failed to process {}: {}", folder_path, e));
                    tracing::warn!(folder = %folder_path, error = %e, "Folder match failed");
                }
            }
        }

        // 6. Downstream caches are stale once anything materialized
        if summary.matched > 0 {
            self.events
                .emit(ShelfEvent::CacheInvalidation {
                    patterns: INVALIDATED_CACHE_PATTERNS
                        .iter()
                        .map(|p| p.to_string())
                        .collect(),
                    timestamp: Utc::now(),
                })
                .ok();
        }
        self.events
            .emit(ShelfEvent::MatchCompleted {
                matched: summary.matched,
                failed: summary.failed,
                timestamp: Utc::now(),
            })
            .ok();

        summary
    }

    /// Classify each folder's representative filename, keeping clear ones.
    /// Classifier errors fail open: the folder is treated as clear.
    async fn filter_clear_folders(
        &self,
        folder_groups: BTreeMap<String, Vec<ledger::LedgerEntry>>,
        summary: &mut MatchSummary,
    ) -> BTreeMap<String, Vec<ledger::LedgerEntry>> {
        let mut clear = BTreeMap::new();
        for (folder_path, group) in folder_groups {
            let sample = &group[0].file_name;
            let folder_name = basename(&folder_path);
            let parsed = filename_parser::parse(sample, Some(folder_name.as_str()));

            match self.client.classify_clarity(sample, &folder_name, &parsed).await {
                Ok(Clarity::Clear) => {
                    clear.insert(folder_path, group);
                }
                Ok(Clarity::Unclear) => {
                    tracing::debug!(folder = %folder_path, file = %sample, "Filename unclear, leaving in backlog");
                }
                Err(e) => {
                    summary
                        .errors
                        .push(format!("Clarity check failed for {}: {}", folder_path, e));
                    clear.insert(folder_path, group);
                }
            }
        }
        clear
    }

    async fn process_folder(
        &self,
        folder_path: &str,
        group: &[ledger::LedgerEntry],
        opts: &MatchOptions,
        summary: &mut MatchSummary,
    ) -> Result<FolderOutcome> {
        let folder_name = basename(folder_path);
        let parsed_folder = filename_parser::parse(&folder_name, None);

        let (metadata, origin) = match &opts.provided_metadata {
            Some(provided) => (provided.clone(), MetadataOrigin::Provided),
            None => self.obtain_metadata(&parsed_folder, summary).await?,
        };

        // Confidence gate applies only to unattended (non-provided) metadata
        if opts.provided_metadata.is_none() {
            let score = match origin {
                MetadataOrigin::Cache(cached_score) => cached_score,
                _ => confidence::score(&metadata, &parsed_folder),
            };
            if !confidence::should_auto_register(score, self.auto_accept_threshold) {
                let queued = self
                    .queue_for_review(folder_path, group, &parsed_folder, &metadata, score)
                    .await?;
                tracing::info!(
                    folder = %folder_path,
                    score = score,
                    level = confidence::level(score).as_str(),
                    "Confidence below threshold, routed to review queue"
                );
                return Ok(FolderOutcome::SentToReview { queued });
            }
        }

        self.materialize(folder_path, group, opts, &metadata).await
    }

    /// Metadata for a folder: cache hit, fresh synthesis, or heuristic
    /// fallback when the provider is unavailable or failing.
    async fn obtain_metadata(
        &self,
        parsed: &ParsedFilename,
        summary: &mut MatchSummary,
    ) -> Result<(SoftwareMetadata, MetadataOrigin)> {
        let cache_key = confidence::normalize_software_name(&parsed.software_name);
        if !cache_key.is_empty() {
            if let Some(entry) = metadata_cache::lookup(&self.db, &cache_key).await? {
                if let Ok(metadata) = serde_json::from_str::<SoftwareMetadata>(&entry.metadata_json)
                {
                    metadata_cache::record_hit(&self.db, entry.id).await?;
                    tracing::debug!(key = %cache_key, hits = entry.hit_count + 1, "Metadata cache hit");
                    return Ok((metadata, MetadataOrigin::Cache(entry.confidence_score)));
                }
            }
        }

        match self.client.synthesize_metadata(parsed).await {
            Ok(provider_metadata) => {
                summary.ai_generated += 1;
                Ok((provider_metadata.into_catalog(), MetadataOrigin::Synthesized))
            }
            Err(SynthesisError::NotConfigured) => {
                Ok((crate::services::ai_client::fallback_metadata(parsed), MetadataOrigin::Fallback))
            }
            Err(e) => {
                summary
                    .errors
                    .push(format!("Synthesis failed for '{}': {}", parsed.software_name, e));
                Ok((crate::services::ai_client::fallback_metadata(parsed), MetadataOrigin::Fallback))
            }
        }
    }

    /// Queue the folder's representative file for human review.
    async fn queue_for_review(
        &self,
        folder_path: &str,
        group: &[ledger::LedgerEntry],
        parsed_folder: &ParsedFilename,
        metadata: &SoftwareMetadata,
        score: f64,
    ) -> Result<u64> {
        let representative = &group[0];
        let metadata_json = serde_json::to_string(metadata)
            .map_err(|e| Error::Internal(format!("Serialize metadata failed: {}", e)))?;

        review::upsert_pending(
            &self.db,
            &review::NewReviewItem {
                file_path: representative.file_path().to_string_lossy().to_string(),
                file_name: representative.file_name.clone(),
                folder_path: folder_path.to_string(),
                parsed_name: Some(parsed_folder.software_name.clone()),
                parsed_version: parsed_folder.version.clone(),
                parsed_vendor: parsed_folder.vendor.clone(),
                suggested_metadata: metadata_json,
                confidence_score: score,
            },
        )
        .await?;

        Ok(1)
    }

    /// Create or update the folder's product and a version per file, inside
    /// one transaction so a failure rolls the whole folder back.
    async fn materialize(
        &self,
        folder_path: &str,
        group: &[ledger::LedgerEntry],
        opts: &MatchOptions,
        metadata: &SoftwareMetadata,
    ) -> Result<FolderOutcome> {
        let mut tx = self.db.begin().await?;

        let existing = products::find_by_folder(&mut *tx, folder_path).await?;
        let product_id = match &existing {
            Some(product) => {
                // Human-provided metadata may refresh existing fields;
                // unattended mode never overwrites what is already there
                if opts.provided_metadata.is_some() {
                    products::update_provided_fields(&mut *tx, product.id, metadata).await?;
                }
                product.id
            }
            None => {
                let representative = &group[0];
                let folder_name = basename(folder_path);
                let parsed_rep =
                    filename_parser::parse(&representative.file_name, Some(folder_name.as_str()));
                products::insert(&mut *tx, folder_path, parsed_rep.is_portable, metadata).await?
            }
        };

        let mut resolved_entries = 0u64;
        for entry in group {
            let file_path = entry.file_path();
            let file_path_str = file_path.to_string_lossy().to_string();

            let version_id = match versions::find_by_path(&mut *tx, &file_path_str).await? {
                Some(version) => version.id,
                None => {
                    let folder_name = basename(folder_path);
                    let parsed =
                        filename_parser::parse(&entry.file_name, Some(folder_name.as_str()));
                    let file_size = file_size_or_zero(&file_path)?;
                    versions::insert(
                        &mut *tx,
                        product_id,
                        &entry.file_name,
                        &file_path_str,
                        file_size,
                        parsed.version.as_deref(),
                        parsed.is_portable,
                    )
                    .await?
                }
            };

            ledger::link_and_resolve(&mut *tx, entry.id, product_id, version_id).await?;
            resolved_entries += 1;
        }

        tx.commit().await?;

        let product = products::get(&self.db, product_id)
            .await?
            .ok_or_else(|| Error::Internal(format!("Product {} vanished after commit", product_id)))?;

        Ok(FolderOutcome::Materialized {
            product: ProductSummary {
                id: product.id,
                title: product.title,
                description: product.description,
                vendor: product.vendor,
                category: product.category,
                icon_url: product.icon_url,
                folder_path: product.folder_path,
            },
            resolved_entries,
        })
    }
}

/// Size of the backing file; a file that vanished between walk and match
/// registers as zero, any other I/O failure fails the folder.
fn file_size_or_zero(path: &Path) -> Result<i64> {
    match std::fs::metadata(path) {
        Ok(meta) => Ok(meta.len() as i64),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(Error::Io(e)),
    }
}

fn basename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}
