//! Review queue and violation administration tests

mod helpers;

use helpers::{setup_test_db, write_file};
use softshelf_common::events::EventBus;
use softshelf_li::config::ExclusionRules;
use softshelf_li::db::{ledger, metadata_cache, products, review};
use softshelf_li::models::metadata::SoftwareMetadata;
use softshelf_li::services::confidence;
use softshelf_li::services::review_queue::{ReviewError, ReviewQueue};
use softshelf_li::services::violations::{ViolationError, ViolationOps};
use softshelf_li::services::{AiProvider, AutoMatcher, MatchOptions, Scanner, TextSynthClient};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Stage a low-confidence folder into the review queue and return the
/// pending item.
async fn queue_one_item(pool: &SqlitePool, root: &std::path::Path) -> review::ReviewItem {
    let scanner = Scanner::new(pool.clone(), ExclusionRules::default());
    scanner.scan(root).await.unwrap();

    let client = TextSynthClient::new(AiProvider::OpenAi, "", None).unwrap();
    let matcher = AutoMatcher::new(
        pool.clone(),
        client,
        EventBus::new(16),
        confidence::AUTO_ACCEPT_THRESHOLD,
    );
    let entries = ledger::list_unresolved_scanned(pool).await.unwrap();
    let summary = matcher
        .match_entries(entries, &MatchOptions::default())
        .await;
    assert_eq!(summary.queued_for_review, 1, "errors: {:?}", summary.errors);

    let (_, items) = review::list(pool, Some(review::ReviewStatus::Pending), 0, 10)
        .await
        .unwrap();
    items.into_iter().next().expect("pending item")
}

#[tokio::test]
async fn approve_materializes_product_and_feeds_cache() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().canonicalize().unwrap();
    let folder = root.join("Obscure Tool");
    write_file(&folder, "Obscure Tool v1.2.exe");

    let pool = setup_test_db().await;
    let item = queue_one_item(&pool, &root).await;

    let queue = ReviewQueue::new(pool.clone(), EventBus::new(16));
    let product_id = queue.approve(item.id, "admin").await.unwrap();

    let product = products::get(&pool, product_id).await.unwrap().unwrap();
    assert_eq!(product.folder_path, folder.to_string_lossy());
    assert_eq!(product.title, "Obscure Tool");

    let item = queue.get(item.id).await.unwrap();
    assert_eq!(item.status, review::ReviewStatus::Approved);
    assert_eq!(item.reviewed_by.as_deref(), Some("admin"));

    // Approved suggestions land in the metadata cache under the parsed name
    let key = confidence::normalize_software_name("Obscure Tool");
    let cached = metadata_cache::lookup(&pool, &key).await.unwrap().unwrap();
    assert_eq!(cached.source, "ai");
}

#[tokio::test]
async fn approve_refuses_duplicate_folder() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().canonicalize().unwrap();
    let folder = root.join("Obscure Tool");
    write_file(&folder, "Obscure Tool v1.2.exe");

    let pool = setup_test_db().await;
    let item = queue_one_item(&pool, &root).await;

    // Somebody registered the folder in the meantime
    products::insert(
        &pool,
        &folder.to_string_lossy(),
        false,
        &SoftwareMetadata {
            title: "Obscure Tool".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let queue = ReviewQueue::new(pool.clone(), EventBus::new(16));
    match queue.approve(item.id, "admin").await {
        Err(ReviewError::DuplicateProduct(_)) => {}
        other => panic!("expected DuplicateProduct, got {:?}", other),
    }

    // The item stays pending
    let item = queue.get(item.id).await.unwrap();
    assert_eq!(item.status, review::ReviewStatus::Pending);
}

#[tokio::test]
async fn manual_metadata_materializes_with_full_confidence_cache() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().canonicalize().unwrap();
    write_file(&root.join("Obscure Tool"), "Obscure Tool v1.2.exe");

    let pool = setup_test_db().await;
    let item = queue_one_item(&pool, &root).await;

    let queue = ReviewQueue::new(pool.clone(), EventBus::new(16));
    let metadata = SoftwareMetadata {
        title: "Obscure Tool Deluxe".to_string(),
        vendor: "Obscure Labs".to_string(),
        category: "Utility".to_string(),
        ..Default::default()
    };
    let product_id = queue.manual(item.id, metadata, "admin").await.unwrap();

    let product = products::get(&pool, product_id).await.unwrap().unwrap();
    assert_eq!(product.title, "Obscure Tool Deluxe");

    let item = queue.get(item.id).await.unwrap();
    assert_eq!(item.status, review::ReviewStatus::Manual);
    assert!(item.manual_metadata.is_some());

    let key = confidence::normalize_software_name("Obscure Tool");
    let cached = metadata_cache::lookup(&pool, &key).await.unwrap().unwrap();
    assert_eq!(cached.source, "manual");
    assert!((cached.confidence_score - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn ignore_is_terminal_with_no_catalog_effect() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().canonicalize().unwrap();
    write_file(&root.join("Obscure Tool"), "Obscure Tool v1.2.exe");

    let pool = setup_test_db().await;
    let item = queue_one_item(&pool, &root).await;

    let queue = ReviewQueue::new(pool.clone(), EventBus::new(16));
    queue.ignore(item.id, "admin").await.unwrap();

    let item = queue.get(item.id).await.unwrap();
    assert_eq!(item.status, review::ReviewStatus::Ignored);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);

    let stats = queue.stats().await.unwrap();
    assert_eq!(stats.ignored, 1);
    assert_eq!(stats.pending, 0);
}

#[tokio::test]
async fn rename_to_suggestion_fixes_file_and_resolves_entry() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().canonicalize().unwrap();
    let folder = root.join("Tools");
    let bad = write_file(&folder, "My_Bad_Tool_Name_2.5.zip");

    let pool = setup_test_db().await;
    let scanner = Scanner::new(pool.clone(), ExclusionRules::default());
    scanner.scan(&root).await.unwrap();

    let entries = ledger::list_by_resolved(&pool, false).await.unwrap();
    let entry = entries
        .iter()
        .find(|e| e.kind == ledger::LedgerKind::UnderscoreOveruse)
        .expect("violation entry");

    let ops = ViolationOps::new(pool.clone());
    let outcome = ops.rename_to_suggestion(entry.id).await.unwrap();

    assert_eq!(outcome.new_filename, "My Bad Tool Name 2.5.zip");
    assert!(!bad.exists());
    assert!(folder.join("My Bad Tool Name 2.5.zip").exists());

    let entry = ledger::get(&pool, entry.id).await.unwrap().unwrap();
    assert!(entry.is_resolved);
}

#[tokio::test]
async fn rename_refuses_when_target_exists() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().canonicalize().unwrap();
    let folder = root.join("Tools");
    write_file(&folder, "My_Bad_Tool_Name_2.5.zip");
    write_file(&folder, "My Bad Tool Name 2.5.zip");

    let pool = setup_test_db().await;
    let scanner = Scanner::new(pool.clone(), ExclusionRules::default());
    scanner.scan(&root).await.unwrap();

    let entries = ledger::list_by_resolved(&pool, false).await.unwrap();
    let entry = entries
        .iter()
        .find(|e| e.kind == ledger::LedgerKind::UnderscoreOveruse)
        .expect("violation entry");

    let ops = ViolationOps::new(pool.clone());
    match ops.rename_to_suggestion(entry.id).await {
        Err(ViolationError::TargetExists(_)) => {}
        other => panic!("expected TargetExists, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn violation_stats_distinguish_scanned_from_mismatched() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().canonicalize().unwrap();
    write_file(&root.join("Tools"), "My_Bad_Tool_Name_2.5.zip");
    write_file(&root.join("Clean"), "Total Commander.v10.51.zip");

    let pool = setup_test_db().await;
    let scanner = Scanner::new(pool.clone(), ExclusionRules::default());
    scanner.scan(&root).await.unwrap();

    let ops = ViolationOps::new(pool.clone());
    let stats = ops.stats().await.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.scanned, 1);
    assert_eq!(stats.mismatched, 1);
    assert_eq!(stats.by_type.get("underscore_overuse"), Some(&1));
}
