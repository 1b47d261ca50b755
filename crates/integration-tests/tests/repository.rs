//! Product repository behavior against the in-memory store.

#![allow(clippy::unwrap_used)]

use std::time::{Duration, Instant};

use boutique_catalog::{ProductRepository, SyncConfig};
use boutique_core::{DocumentId, ProductKey};
use boutique_integration_tests::{TestCatalog, product_fields, seed_products, wait_until};

fn repository(catalog: &TestCatalog) -> &ProductRepository {
    catalog.state.repository()
}

#[tokio::test]
async fn test_fetch_all_merges_images_in_listing_order() {
    let catalog = TestCatalog::seeded();

    let products = repository(&catalog).fetch_all().await.unwrap();

    assert_eq!(products.len(), 3);
    let tee = products.iter().find(|p| p.product_id().as_str() == "sku-tee").unwrap();
    assert_eq!(
        tee.image_urls(),
        ["https://cdn.test/tee-front.jpg", "https://cdn.test/tee-back.jpg"]
    );
    let mug = products.iter().find(|p| p.product_id().as_str() == "sku-mug").unwrap();
    assert!(mug.image_urls().is_empty());

    let snapshot = repository(&catalog).snapshot();
    assert_eq!(snapshot.revision, 1);
    assert!(snapshot.error.is_none());
}

#[tokio::test]
async fn test_slow_and_failing_images_do_not_block_others() {
    let catalog = TestCatalog::with_sync(SyncConfig {
        image_concurrency: 2,
        ..SyncConfig::default()
    });
    seed_products(&catalog.store);
    catalog.store.fail_images_for("sku-cap");
    catalog
        .store
        .delay_images_for("sku-tee", Duration::from_millis(200));

    let products = repository(&catalog).fetch_all().await.unwrap();

    let ids: Vec<&str> = products.iter().map(|p| p.id().as_str()).collect();
    assert_eq!(ids, ["d1", "d2", "d3"]);
    assert_eq!(products.first().unwrap().image_urls().len(), 2);
    assert!(products.get(1).unwrap().image_urls().is_empty());
}

#[tokio::test]
async fn test_image_fetches_run_concurrently() {
    let catalog = TestCatalog::with_sync(SyncConfig {
        image_concurrency: 4,
        ..SyncConfig::default()
    });
    for i in 0..4 {
        let key = format!("sku-{i}");
        catalog
            .store
            .upsert_document(format!("d{i}").as_str(), product_fields(&key, "Item", "$1", 0, &[]));
        catalog
            .store
            .delay_images_for(key.as_str(), Duration::from_millis(300));
    }

    let started = Instant::now();
    let products = repository(&catalog).fetch_all().await.unwrap();

    assert_eq!(products.len(), 4);
    assert!(started.elapsed() < Duration::from_millis(1100));
}

#[tokio::test]
async fn test_failed_blob_is_excluded() {
    let catalog = TestCatalog::seeded();
    catalog.store.fail_blob("images/sku-tee/back.jpg");

    let urls = repository(&catalog)
        .fetch_images(&ProductKey::new("sku-tee"))
        .await;

    assert_eq!(urls, ["https://cdn.test/tee-front.jpg"]);
}

#[tokio::test]
async fn test_fetch_failure_keeps_previous_list() {
    let catalog = TestCatalog::seeded();
    let repo = repository(&catalog);
    repo.fetch_all().await.unwrap();

    catalog.store.set_fail_queries(true);
    assert!(repo.fetch_all().await.is_err());

    let snapshot = repo.snapshot();
    assert_eq!(snapshot.products.len(), 3);
    assert_eq!(snapshot.revision, 1);
    assert!(snapshot.error.is_some());

    catalog.store.set_fail_queries(false);
    repo.fetch_all().await.unwrap();
    assert!(repo.snapshot().error.is_none());
}

#[tokio::test]
async fn test_documents_without_product_id_are_skipped() {
    let catalog = TestCatalog::seeded();
    let mut fields = product_fields("", "Ghost", "$1", 0, &[]);
    fields.remove("productID");
    catalog.store.upsert_document("d9", fields);

    let products = repository(&catalog).fetch_all().await.unwrap();

    assert_eq!(products.len(), 3);
    assert!(products.iter().all(|p| p.id().as_str() != "d9"));
}

#[tokio::test]
async fn test_fetch_tags() {
    let catalog = TestCatalog::seeded();
    let repo = repository(&catalog);
    assert_eq!(repo.fetch_tags(), ["All"]);

    repo.fetch_all().await.unwrap();

    assert_eq!(repo.fetch_tags(), ["All", "Hats", "Home", "Shirts", "Summer"]);
}

#[tokio::test]
async fn test_concurrent_votes_all_apply() {
    let catalog = TestCatalog::seeded();
    let repo = repository(&catalog).clone();
    repo.fetch_all().await.unwrap();
    let id = DocumentId::new("d3");

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let repo = repo.clone();
            let id = id.clone();
            tokio::spawn(async move { repo.update_votes(&id, 1).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(catalog.store.stored_votes(&id), Some(10));
    let mug = repo.products().iter().find(|p| p.id() == &id).cloned().unwrap();
    assert_eq!(mug.votes(), 10);
}

#[tokio::test]
async fn test_failed_vote_leaves_count_unchanged() {
    let catalog = TestCatalog::seeded();
    let repo = repository(&catalog);
    repo.fetch_all().await.unwrap();
    catalog.store.set_fail_votes(true);

    assert!(repo.update_votes(&DocumentId::new("d1"), 1).await.is_err());

    assert_eq!(catalog.store.stored_votes(&DocumentId::new("d1")), Some(4));
    let tee = repo.products().iter().find(|p| p.id().as_str() == "d1").cloned().unwrap();
    assert_eq!(tee.votes(), 4);
}

#[tokio::test]
async fn test_listener_republishes_changes() {
    let catalog = TestCatalog::seeded();
    let repo = repository(&catalog);
    let mut snapshots = repo.subscribe();
    let listener = repo.spawn_listener();

    let first = wait_until(&mut snapshots, |s| s.products.len() == 3).await;
    assert!(first.is_loaded());

    catalog
        .store
        .upsert_document("d4", product_fields("sku-bag", "Bag", "$40", 0, &["Bags"]));
    let second = wait_until(&mut snapshots, |s| s.products.len() == 4).await;
    assert!(second.revision > first.revision);

    catalog.store.remove_document(&DocumentId::new("d2"));
    let third = wait_until(&mut snapshots, |s| s.products.len() == 3 && s.revision > second.revision).await;
    assert!(third.products.iter().all(|p| p.id().as_str() != "d2"));

    listener.abort();
}

#[tokio::test]
async fn test_listener_reuses_cached_images() {
    let catalog = TestCatalog::seeded();
    let repo = repository(&catalog);
    let mut snapshots = repo.subscribe();
    let listener = repo.spawn_listener();

    wait_until(&mut snapshots, |s| s.products.len() == 3).await;
    let calls_after_first = catalog.store.image_list_calls();

    catalog
        .store
        .upsert_document("d1", product_fields("sku-tee", "Tee v2", "$26", 4, &["Shirts"]));
    let updated = wait_until(&mut snapshots, |s| {
        s.products.iter().any(|p| p.title == "Tee v2")
    })
    .await;

    let tee = updated.products.iter().find(|p| p.title == "Tee v2").unwrap();
    assert_eq!(tee.image_urls().len(), 2);
    // sku-mug has no objects, so its empty list is cached too
    assert_eq!(catalog.store.image_list_calls(), calls_after_first);

    listener.abort();
}

#[tokio::test]
async fn test_listener_retries_images_that_failed_to_list() {
    let catalog = TestCatalog::seeded();
    catalog.store.fail_images_for("sku-cap");
    let repo = repository(&catalog);
    let mut snapshots = repo.subscribe();
    let listener = repo.spawn_listener();

    let first = wait_until(&mut snapshots, |s| s.products.len() == 3).await;
    let images_of = |snapshot: &boutique_catalog::CatalogSnapshot, key: &str| {
        snapshot
            .products
            .iter()
            .find(|p| p.product_id().as_str() == key)
            .map(|p| p.image_urls().len())
            .unwrap()
    };
    assert_eq!(images_of(&first, "sku-tee"), 2);
    assert_eq!(images_of(&first, "sku-cap"), 0);
    assert_eq!(images_of(&first, "sku-mug"), 0);
    assert!(first.error.is_none());

    // Only sku-cap is uncached, so the next batch lists it and nothing else
    let calls_after_first = catalog.store.image_list_calls();
    catalog.store.heal_images_for("sku-cap");
    catalog
        .store
        .upsert_document("d1", product_fields("sku-tee", "Tee v2", "$26", 4, &["Shirts"]));
    let second = wait_until(&mut snapshots, |s| {
        s.products.iter().any(|p| p.title == "Tee v2")
    })
    .await;

    assert_eq!(catalog.store.image_list_calls(), calls_after_first + 1);
    assert_eq!(images_of(&second, "sku-cap"), 1);
    assert_eq!(images_of(&second, "sku-tee"), 2);

    listener.abort();
}

#[tokio::test]
async fn test_invalidate_images_forces_refetch() {
    let catalog = TestCatalog::seeded();
    let repo = repository(&catalog);
    let key = ProductKey::new("sku-cap");

    repo.fetch_images(&key).await;
    catalog
        .store
        .add_image("sku-cap", "images/sku-cap/top.jpg", "https://cdn.test/cap-top.jpg");
    repo.invalidate_images(&key).await;

    let urls = repo.fetch_images(&key).await;
    assert_eq!(urls.len(), 2);
}

#[tokio::test]
async fn test_repository_shared_across_clones() {
    let catalog = TestCatalog::seeded();
    let repo = repository(&catalog).clone();
    let other = repository(&catalog).clone();

    repo.fetch_all().await.unwrap();

    assert_eq!(other.products().len(), 3);
}
