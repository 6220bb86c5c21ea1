//! Scanner and reconciler integration tests

mod helpers;

use helpers::{setup_test_db, write_file};
use softshelf_li::config::ExclusionRules;
use softshelf_li::db::{ledger, products, versions};
use softshelf_li::models::metadata::SoftwareMetadata;
use softshelf_li::services::Scanner;
use std::path::PathBuf;
use tempfile::TempDir;

/// Library tree with one cleanly named file, one violating file, and noise
/// that the exclusion rules must skip.
fn create_library() -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let root = temp.path().canonicalize().unwrap();

    write_file(
        &root.join("Adobe Photoshop CC"),
        "Adobe Photoshop CC 2023 v24.0.1.exe",
    );
    write_file(&root.join("Tools"), "My_Bad_Tool_Name_2.5.zip");
    write_file(&root.join(".git"), "hook.exe");
    write_file(&root.join("Notes"), "readme.txt");

    (temp, root)
}

#[tokio::test]
async fn scanning_twice_is_idempotent() {
    let (_temp, root) = create_library();
    let pool = setup_test_db().await;
    let scanner = Scanner::new(pool.clone(), ExclusionRules::default());

    let first = scanner.scan(&root).await.unwrap();
    assert_eq!(first.new_products, 2, "errors: {:?}", first.errors);
    assert_eq!(first.new_versions, 0);

    let second = scanner.scan(&root).await.unwrap();
    assert_eq!(second.new_products, 0);
    assert_eq!(second.new_versions, 0);
}

#[tokio::test]
async fn exclusion_rules_are_applied() {
    let (_temp, root) = create_library();
    let pool = setup_test_db().await;
    let scanner = Scanner::new(pool.clone(), ExclusionRules::default());

    scanner.scan(&root).await.unwrap();

    let entries = ledger::list_by_resolved(&pool, false).await.unwrap();
    assert_eq!(entries.len(), 2);
    for entry in &entries {
        assert!(
            !entry.folder_path.contains(".git"),
            "excluded folder was scanned: {}",
            entry.folder_path
        );
        assert!(
            !entry.file_name.ends_with(".txt"),
            "excluded pattern was scanned: {}",
            entry.file_name
        );
    }
}

#[tokio::test]
async fn violations_are_staged_with_suggestions() {
    let (_temp, root) = create_library();
    let pool = setup_test_db().await;
    let scanner = Scanner::new(pool.clone(), ExclusionRules::default());

    scanner.scan(&root).await.unwrap();

    let entries = ledger::list_by_resolved(&pool, false).await.unwrap();
    let violation = entries
        .iter()
        .find(|e| e.file_name == "My_Bad_Tool_Name_2.5.zip")
        .expect("violating file staged");
    assert_eq!(violation.kind, ledger::LedgerKind::UnderscoreOveruse);
    assert_eq!(
        violation.suggestion.as_deref(),
        Some("My Bad Tool Name 2.5.zip")
    );
    assert!(!violation.is_resolved);

    let clean = entries
        .iter()
        .find(|e| e.file_name == "Adobe Photoshop CC 2023 v24.0.1.exe")
        .expect("clean file staged");
    assert_eq!(clean.kind, ledger::LedgerKind::Scanned);
}

#[tokio::test]
async fn files_already_in_catalog_are_staged_pre_resolved() {
    let (_temp, root) = create_library();
    let pool = setup_test_db().await;

    // Register the clean file in the catalog before the first scan
    let folder = root.join("Adobe Photoshop CC");
    let file_path = folder.join("Adobe Photoshop CC 2023 v24.0.1.exe");
    let meta = SoftwareMetadata {
        title: "Adobe Photoshop CC".to_string(),
        ..Default::default()
    };
    let product_id = products::insert(&pool, &folder.to_string_lossy(), false, &meta)
        .await
        .unwrap();
    let version_id = versions::insert(
        &pool,
        product_id,
        "Adobe Photoshop CC 2023 v24.0.1.exe",
        &file_path.to_string_lossy(),
        17,
        Some("24.0.1"),
        false,
    )
    .await
    .unwrap();

    let scanner = Scanner::new(pool.clone(), ExclusionRules::default());
    scanner.scan(&root).await.unwrap();

    let resolved = ledger::list_by_resolved(&pool, true).await.unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].product_id, Some(product_id));
    assert_eq!(resolved[0].version_id, Some(version_id));
}

#[tokio::test]
async fn reconciliation_removes_vanished_files() {
    let (_temp, root) = create_library();
    let pool = setup_test_db().await;

    let folder = root.join("Adobe Photoshop CC");
    let file_path = folder.join("Adobe Photoshop CC 2023 v24.0.1.exe");
    let meta = SoftwareMetadata {
        title: "Adobe Photoshop CC".to_string(),
        ..Default::default()
    };
    let product_id = products::insert(&pool, &folder.to_string_lossy(), false, &meta)
        .await
        .unwrap();
    versions::insert(
        &pool,
        product_id,
        "Adobe Photoshop CC 2023 v24.0.1.exe",
        &file_path.to_string_lossy(),
        17,
        Some("24.0.1"),
        false,
    )
    .await
    .unwrap();

    let scanner = Scanner::new(pool.clone(), ExclusionRules::default());

    // File still on disk: nothing to reconcile
    let summary = scanner.scan(&root).await.unwrap();
    assert_eq!(summary.deleted_versions, 0);
    assert_eq!(summary.deleted_products, 0);

    // Delete the file and rescan: version and (now empty) product go away
    std::fs::remove_file(&file_path).unwrap();
    let summary = scanner.scan(&root).await.unwrap();
    assert_eq!(summary.deleted_versions, 1);
    assert_eq!(summary.deleted_products, 1);

    let gone = versions::find_by_path(&pool, &file_path.to_string_lossy())
        .await
        .unwrap();
    assert!(gone.is_none());
    let product = products::get(&pool, product_id).await.unwrap();
    assert!(product.is_none());
}

#[tokio::test]
async fn reconciliation_keeps_products_with_surviving_versions() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().canonicalize().unwrap();
    let folder = root.join("Total Commander");
    let keep = write_file(&folder, "Total Commander v10.51.zip");
    let vanish = write_file(&folder, "Total Commander v10.50.zip");

    let pool = setup_test_db().await;
    let meta = SoftwareMetadata {
        title: "Total Commander".to_string(),
        ..Default::default()
    };
    let product_id = products::insert(&pool, &folder.to_string_lossy(), false, &meta)
        .await
        .unwrap();
    for (path, name, version) in [
        (&keep, "Total Commander v10.51.zip", "10.51"),
        (&vanish, "Total Commander v10.50.zip", "10.50"),
    ] {
        versions::insert(
            &pool,
            product_id,
            name,
            &path.to_string_lossy(),
            17,
            Some(version),
            false,
        )
        .await
        .unwrap();
    }

    std::fs::remove_file(&vanish).unwrap();

    let scanner = Scanner::new(pool.clone(), ExclusionRules::default());
    let summary = scanner.scan(&root).await.unwrap();

    assert_eq!(summary.deleted_versions, 1);
    assert_eq!(summary.deleted_products, 0);
    assert!(products::get(&pool, product_id).await.unwrap().is_some());
}
