//! In-memory catalog backend with substring matching.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::CatalogError;
use crate::record::{NewProduct, Product, ProductPatch};
use crate::traits::CatalogStore;

/// Results returned per query before cross-query dedup.
const TOP_K: usize = 2;

/// In-memory backend: case-insensitive substring match over name and
/// description, top-2 per query, relevance = insertion order.
pub struct MemoryCatalog {
    inner: Mutex<Inner>,
}

struct Inner {
    next_id: i64,
    // Vec keeps insertion order, which doubles as match relevance.
    products: Vec<Product>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        MemoryCatalog {
            inner: Mutex::new(Inner {
                next_id: 1,
                products: Vec::new(),
            }),
        }
    }
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn search(&self, queries: &[String]) -> Result<Vec<Product>, CatalogError> {
        let inner = self.inner.lock().await;
        let mut results: Vec<Product> = Vec::new();
        let mut seen: std::collections::HashSet<i64> = std::collections::HashSet::new();

        for query in queries {
            let needle = query.to_lowercase();
            if needle.is_empty() {
                continue;
            }
            let hits = inner
                .products
                .iter()
                .filter(|p| p.in_stock && p.search_text().to_lowercase().contains(&needle))
                .take(TOP_K);
            for hit in hits {
                if seen.insert(hit.id) {
                    results.push(hit.clone());
                }
            }
        }

        Ok(results)
    }

    async fn get(&self, id: i64) -> Result<Product, CatalogError> {
        let inner = self.inner.lock().await;
        inner
            .products
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(CatalogError::NotFound { id })
    }

    async fn create(&self, new: NewProduct) -> Result<Product, CatalogError> {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id;
        inner.next_id += 1;
        let product = Product::from_new(id, new);
        inner.products.push(product.clone());
        Ok(product)
    }

    async fn update(&self, id: i64, patch: ProductPatch) -> Result<Product, CatalogError> {
        let mut inner = self.inner.lock().await;
        let product = inner
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(CatalogError::NotFound { id })?;
        patch.apply(product);
        Ok(product.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), CatalogError> {
        let mut inner = self.inner.lock().await;
        let before = inner.products.len();
        inner.products.retain(|p| p.id != id);
        if inner.products.len() == before {
            return Err(CatalogError::NotFound { id });
        }
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Product>, CatalogError> {
        let inner = self.inner.lock().await;
        let mut all: Vec<Product> = inner.products.clone();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn new_product(name: &str, description: &str, price: i64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            category: None,
            description: Some(description.to_string()),
            price: Decimal::from(price),
            image_url: None,
            barcode: None,
            in_stock: true,
        }
    }

    #[tokio::test]
    async fn ids_are_stable_after_delete() {
        let store = MemoryCatalog::new();
        let a = store.create(new_product("A", "", 1)).await.unwrap();
        let b = store.create(new_product("B", "", 2)).await.unwrap();
        store.delete(a.id).await.unwrap();
        let c = store.create(new_product("C", "", 3)).await.unwrap();
        assert_eq!(b.id, 2);
        assert_ne!(c.id, a.id, "deleted ids must never be reused");
    }

    #[tokio::test]
    async fn search_matches_description_too() {
        let store = MemoryCatalog::new();
        store
            .create(new_product("Lay's 150g", "sour cream potato chips", 350))
            .await
            .unwrap();
        let hits = store.search(&["potato chips".to_string()]).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Lay's 150g");
    }

    #[tokio::test]
    async fn search_caps_at_two_per_query() {
        let store = MemoryCatalog::new();
        for i in 0..5 {
            store
                .create(new_product(&format!("Cola variant {}", i), "", 100))
                .await
                .unwrap();
        }
        let hits = store.search(&["cola".to_string()]).await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn empty_query_matches_nothing() {
        let store = MemoryCatalog::new();
        store.create(new_product("Anything", "", 1)).await.unwrap();
        let hits = store.search(&[String::new()]).await.unwrap();
        assert!(hits.is_empty());
    }
}
