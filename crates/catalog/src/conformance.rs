//! Backend-agnostic conformance checks for `CatalogStore` implementations.
//!
//! Every property here must hold for any backend regardless of its matching
//! strategy, so the suite runs against both `MemoryCatalog` and
//! `TrigramCatalog`. Backend-specific behavior (top-K value, ranking) is
//! covered by each backend's own test module.

use rust_decimal::Decimal;

use crate::{CatalogError, CatalogStore, MemoryCatalog, NewProduct, ProductPatch, TrigramCatalog};

fn soda(name: &str) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        category: Some("Drinks".to_string()),
        description: Some(format!("{} carbonated soda", name)),
        price: Decimal::from(450),
        image_url: None,
        barcode: None,
        in_stock: true,
    }
}

async fn check_cross_query_dedup(store: &impl CatalogStore) {
    // One product both queries match: it must appear exactly once, at the
    // position of its first match.
    let coke = store.create(soda("Coca-Cola 1L")).await.unwrap();
    let hits = store
        .search(&["Coca-Cola".to_string(), "cola soda".to_string()])
        .await
        .unwrap();
    let matches: Vec<_> = hits.iter().filter(|p| p.id == coke.id).collect();
    assert_eq!(matches.len(), 1, "dedup must collapse cross-query repeats");
    assert_eq!(hits[0].id, coke.id, "first match keeps its position");
}

async fn check_out_of_stock_excluded(store: &impl CatalogStore) {
    let p = store.create(soda("Sprite 0.5L")).await.unwrap();
    store
        .update(
            p.id,
            ProductPatch {
                in_stock: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let hits = store.search(&["Sprite".to_string()]).await.unwrap();
    assert!(
        hits.iter().all(|h| h.id != p.id),
        "out-of-stock products must never be returned by search"
    );
    // Still readable by id.
    assert!(store.get(p.id).await.is_ok());
}

async fn check_patch_semantics(store: &impl CatalogStore) {
    let p = store.create(soda("Fanta 1L")).await.unwrap();

    // Empty patch: no-op success.
    let unchanged = store.update(p.id, ProductPatch::default()).await.unwrap();
    assert_eq!(unchanged.name, p.name);
    assert_eq!(unchanged.price, p.price);
    assert_eq!(unchanged.created_at, p.created_at);

    // Partial patch: only supplied fields change.
    let updated = store
        .update(
            p.id,
            ProductPatch {
                price: Some(Decimal::from(500)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.price, Decimal::from(500));
    assert_eq!(updated.name, p.name);
    assert_eq!(updated.created_at, p.created_at, "created_at is set once");
}

async fn check_not_found_signals(store: &impl CatalogStore) {
    assert!(matches!(
        store.get(9999).await,
        Err(CatalogError::NotFound { id: 9999 })
    ));
    assert!(matches!(
        store.update(9999, ProductPatch::default()).await,
        Err(CatalogError::NotFound { .. })
    ));
    assert!(matches!(
        store.delete(9999).await,
        Err(CatalogError::NotFound { .. })
    ));
}

async fn check_list_all_sorted_by_name(store: &impl CatalogStore) {
    store.create(soda("Zero Cola")).await.unwrap();
    store.create(soda("Aqua Minerale")).await.unwrap();
    let all = store.list_all().await.unwrap();
    let names: Vec<&str> = all.iter().map(|p| p.name.as_str()).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}

async fn run_suite(store: &impl CatalogStore) {
    check_cross_query_dedup(store).await;
    check_out_of_stock_excluded(store).await;
    check_patch_semantics(store).await;
    check_not_found_signals(store).await;
    check_list_all_sorted_by_name(store).await;
}

#[tokio::test]
async fn memory_backend_conformance() {
    run_suite(&MemoryCatalog::new()).await;
}

#[tokio::test]
async fn trigram_backend_conformance() {
    run_suite(&TrigramCatalog::new()).await;
}
