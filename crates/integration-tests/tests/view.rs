//! View-state coordination in one-shot and live mode.

#![allow(clippy::unwrap_used)]

use boutique_catalog::{SyncMode, ViewPhase};
use boutique_core::DocumentId;
use boutique_integration_tests::{TestCatalog, product_fields, wait_until};

#[tokio::test]
async fn test_once_reaches_ready_with_tags() {
    let catalog = TestCatalog::seeded();
    let view = catalog.state.view();
    assert_eq!(view.state().phase, ViewPhase::Idle);

    let _sync = view.start(SyncMode::Once).await;

    let state = view.state();
    assert_eq!(state.phase, ViewPhase::Ready);
    assert_eq!(state.products.len(), 3);
    assert_eq!(state.visible.len(), 3);
    assert_eq!(state.tags, ["All", "Hats", "Home", "Shirts", "Summer"]);
    assert_eq!(state.selected_tag, "All");
    assert!(state.error.is_none());
}

#[tokio::test]
async fn test_empty_collection_is_ready_and_empty() {
    let catalog = TestCatalog::new();
    let view = catalog.state.view();

    let _sync = view.start(SyncMode::Once).await;

    let state = view.state();
    assert_eq!(state.phase, ViewPhase::Ready);
    assert!(state.products.is_empty());
    assert_eq!(state.tags, ["All"]);
    assert!(state.error.is_none());
}

#[tokio::test]
async fn test_live_start_is_loading_then_ready() {
    let catalog = TestCatalog::seeded();
    let view = catalog.state.view();
    let mut states = view.subscribe();

    let sync = view.start(SyncMode::Live).await;

    let ready = wait_until(&mut states, |s| s.phase == ViewPhase::Ready).await;
    assert_eq!(ready.products.len(), 3);
    sync.shutdown();
}

#[tokio::test]
async fn test_filter_is_reapplied_on_live_update() {
    let catalog = TestCatalog::seeded();
    let view = catalog.state.view();
    let mut states = view.subscribe();
    let sync = view.start(SyncMode::Live).await;
    wait_until(&mut states, |s| s.products.len() == 3).await;

    view.filter_products("Summer");
    let filtered = view.state();
    assert_eq!(filtered.visible.len(), 2);

    catalog
        .store
        .upsert_document("d4", product_fields("sku-hat", "Sun Hat", "$12", 0, &["Hats", "Summer"]));

    let updated = wait_until(&mut states, |s| s.products.len() == 4).await;
    assert_eq!(updated.selected_tag, "Summer");
    assert_eq!(updated.visible.len(), 3);
    assert!(updated.visible.iter().all(|p| p.has_tag("Summer")));
    assert_eq!(updated.tags, ["All", "Hats", "Home", "Shirts", "Summer"]);

    sync.shutdown();
}

#[tokio::test]
async fn test_unknown_tag_shows_nothing() {
    let catalog = TestCatalog::seeded();
    let view = catalog.state.view();
    let _sync = view.start(SyncMode::Once).await;

    view.filter_products("Shoes");

    let state = view.state();
    assert!(state.visible.is_empty());
    assert_eq!(state.products.len(), 3);
}

#[tokio::test]
async fn test_live_error_keeps_products() {
    let catalog = TestCatalog::seeded();
    let view = catalog.state.view();
    let mut states = view.subscribe();
    let sync = view.start(SyncMode::Live).await;
    wait_until(&mut states, |s| s.products.len() == 3).await;

    catalog.store.set_fail_queries(true);
    catalog
        .store
        .upsert_document("d4", product_fields("sku-bag", "Bag", "$40", 0, &[]));

    let failed = wait_until(&mut states, |s| s.error.is_some()).await;
    assert_eq!(failed.phase, ViewPhase::Ready);
    assert_eq!(failed.products.len(), 3);

    catalog.store.set_fail_queries(false);
    catalog.store.remove_document(&DocumentId::new("d4"));
    let recovered = wait_until(&mut states, |s| s.error.is_none()).await;
    assert_eq!(recovered.products.len(), 3);

    sync.shutdown();
}

#[tokio::test]
async fn test_vote_success_and_failure() {
    let catalog = TestCatalog::seeded();
    let view = catalog.state.view();
    let _sync = view.start(SyncMode::Once).await;
    let id = DocumentId::new("d2");

    view.update_votes(&id, 1).await.unwrap();
    let votes = |state: &boutique_catalog::ViewState| {
        state.products.iter().find(|p| p.id() == &id).map(boutique_core::Product::votes)
    };
    assert_eq!(votes(&view.state()), Some(2));

    catalog.store.set_fail_votes(true);
    assert!(view.update_votes(&id, 1).await.is_err());

    let state = view.state();
    assert_eq!(votes(&state), Some(2));
    assert!(!state.error.as_deref().unwrap().is_empty());

    view.clear_error();
    assert!(view.state().error.is_none());
}

#[tokio::test]
async fn test_negative_vote_delta() {
    let catalog = TestCatalog::seeded();
    let view = catalog.state.view();
    let _sync = view.start(SyncMode::Once).await;
    let id = DocumentId::new("d1");

    view.update_votes(&id, -3).await.unwrap();

    assert_eq!(catalog.store.stored_votes(&id), Some(1));
    let tee = view.state().products.iter().find(|p| p.id() == &id).cloned().unwrap();
    assert_eq!(tee.votes(), 1);
}

#[tokio::test]
async fn test_once_failure_lands_in_ready_with_error() {
    let catalog = TestCatalog::seeded();
    catalog.store.set_fail_queries(true);
    let view = catalog.state.view();

    let _sync = view.start(SyncMode::Once).await;

    let state = view.state();
    assert_eq!(state.phase, ViewPhase::Ready);
    assert!(state.error.is_some());
    assert!(state.products.is_empty());
}
