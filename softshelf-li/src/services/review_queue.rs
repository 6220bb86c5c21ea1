//! Review queue service
//!
//! Human disposition of items the auto-matcher could not confidently
//! resolve: approve the AI suggestion, enter metadata manually, re-search
//! under a different name, or ignore. Approval and manual entry materialize
//! a catalog product and feed the metadata cache so the same software never
//! needs another AI call.

use crate::db::{metadata_cache, products, review};
use crate::models::metadata::SoftwareMetadata;
use crate::services::ai_client::TextSynthClient;
use crate::services::confidence;
use crate::services::filename_parser::ParsedFilename;
use chrono::Utc;
use softshelf_common::events::{EventBus, ShelfEvent};
use sqlx::SqlitePool;
use thiserror::Error;

/// Cache key patterns purged after a product materializes from review.
const INVALIDATED_CACHE_PATTERNS: &[&str] = &[
    "products_list:*",
    "products_recent:*",
    "products_by_category:*",
    "search_suggestions:*",
    "stats_overview:*",
    "stats_categories:*",
];

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Review item not found: {0}")]
    NotFound(i64),

    #[error("Review item {0} has no suggested metadata")]
    MissingSuggestion(i64),

    #[error("Suggested metadata has no title")]
    MissingTitle,

    #[error("A product already exists for this folder: {0}")]
    DuplicateProduct(String),

    #[error("Invalid metadata payload: {0}")]
    InvalidMetadata(String),

    #[error("Synthesis failed: {0}")]
    Synthesis(#[from] crate::services::ai_client::SynthesisError),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error(transparent)]
    Common(#[from] softshelf_common::Error),
}

/// Review queue operations.
pub struct ReviewQueue {
    db: SqlitePool,
    events: EventBus,
}

impl ReviewQueue {
    pub fn new(db: SqlitePool, events: EventBus) -> Self {
        Self { db, events }
    }

    /// List items, optionally filtered by status.
    pub async fn list(
        &self,
        status: Option<review::ReviewStatus>,
        offset: i64,
        limit: i64,
    ) -> Result<(i64, Vec<review::ReviewItem>), ReviewError> {
        Ok(review::list(&self.db, status, offset, limit).await?)
    }

    pub async fn get(&self, id: i64) -> Result<review::ReviewItem, ReviewError> {
        review::get(&self.db, id)
            .await?
            .ok_or(ReviewError::NotFound(id))
    }

    /// Per-status counts.
    pub async fn stats(&self) -> Result<review::ReviewStats, ReviewError> {
        Ok(review::stats(&self.db).await?)
    }

    /// Approve the AI suggestion: materialize a product from the suggested
    /// metadata, mark the item approved, and cache the metadata under the
    /// item's normalized name.
    pub async fn approve(&self, id: i64, reviewed_by: &str) -> Result<i64, ReviewError> {
        let item = self.get(id).await?;

        let metadata_json = item
            .suggested_metadata
            .as_deref()
            .ok_or(ReviewError::MissingSuggestion(id))?;
        let metadata: SoftwareMetadata = serde_json::from_str(metadata_json)
            .map_err(|e| ReviewError::InvalidMetadata(e.to_string()))?;
        if metadata.title.trim().is_empty() {
            return Err(ReviewError::MissingTitle);
        }

        let product_id = self
            .materialize(&item, &metadata, review::ReviewStatus::Approved, reviewed_by, None)
            .await?;

        let cache_key = cache_key_for(&item);
        metadata_cache::store(
            &self.db,
            &cache_key,
            metadata_json,
            item.confidence_score,
            metadata_cache::CacheSource::Ai,
        )
        .await?;

        self.invalidate_caches();
        tracing::info!(item = id, product = product_id, "Review item approved");
        Ok(product_id)
    }

    /// Save reviewer-entered metadata and materialize a product from it.
    /// Manual metadata is cached with full confidence.
    pub async fn manual(
        &self,
        id: i64,
        metadata: SoftwareMetadata,
        reviewed_by: &str,
    ) -> Result<i64, ReviewError> {
        if metadata.title.trim().is_empty() {
            return Err(ReviewError::MissingTitle);
        }
        let item = self.get(id).await?;

        let metadata_json = serde_json::to_string(&metadata)
            .map_err(|e| ReviewError::InvalidMetadata(e.to_string()))?;

        let product_id = self
            .materialize(
                &item,
                &metadata,
                review::ReviewStatus::Manual,
                reviewed_by,
                Some(&metadata_json),
            )
            .await?;

        let cache_key = cache_key_for(&item);
        metadata_cache::store(
            &self.db,
            &cache_key,
            &metadata_json,
            1.0,
            metadata_cache::CacheSource::Manual,
        )
        .await?;

        self.invalidate_caches();
        tracing::info!(item = id, product = product_id, "Manual metadata saved");
        Ok(product_id)
    }

    /// Re-run synthesis under an operator-supplied software name and update
    /// the stored suggestion with the re-scored result.
    pub async fn search(
        &self,
        id: i64,
        client: &TextSynthClient,
        software_name: &str,
    ) -> Result<(SoftwareMetadata, f64), ReviewError> {
        let item = self.get(id).await?;

        let parsed = ParsedFilename {
            software_name: software_name.to_string(),
            ..Default::default()
        };
        let metadata = client.synthesize_metadata(&parsed).await?.into_catalog();
        let score = confidence::score(&metadata, &parsed);

        let metadata_json = serde_json::to_string(&metadata)
            .map_err(|e| ReviewError::InvalidMetadata(e.to_string()))?;
        review::update_suggestion(&self.db, item.id, software_name, &metadata_json, score).await?;

        Ok((metadata, score))
    }

    /// Ignore an item: terminal, no catalog effect.
    pub async fn ignore(&self, id: i64, reviewed_by: &str) -> Result<(), ReviewError> {
        let item = self.get(id).await?;
        review::set_status(
            &self.db,
            item.id,
            review::ReviewStatus::Ignored,
            Some(reviewed_by),
        )
        .await?;
        tracing::info!(item = id, "Review item ignored");
        Ok(())
    }

    /// Create the product and flip the item's status in one transaction.
    async fn materialize(
        &self,
        item: &review::ReviewItem,
        metadata: &SoftwareMetadata,
        status: review::ReviewStatus,
        reviewed_by: &str,
        manual_metadata_json: Option<&str>,
    ) -> Result<i64, ReviewError> {
        if let Some(existing) = products::find_by_folder(&self.db, &item.folder_path).await? {
            return Err(ReviewError::DuplicateProduct(existing.title));
        }

        let is_portable = crate::services::filename_parser::detect_portable(&item.file_name, "");

        let mut tx = self.db.begin().await?;
        let product_id =
            products::insert(&mut *tx, &item.folder_path, is_portable, metadata).await?;
        review::set_status(&mut *tx, item.id, status, Some(reviewed_by)).await?;
        if let Some(json) = manual_metadata_json {
            review::set_manual_metadata(&mut *tx, item.id, json).await?;
        }
        tx.commit().await?;

        Ok(product_id)
    }

    fn invalidate_caches(&self) {
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
}

/// Cache key: the parsed name when present, the file name otherwise.
fn cache_key_for(item: &review::ReviewItem) -> String {
    let name = item
        .parsed_name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(&item.file_name);
    confidence::normalize_software_name(name)
}
