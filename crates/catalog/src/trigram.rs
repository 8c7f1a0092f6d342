//! Ranked catalog backend using trigram similarity.
//!
//! Matching follows the pg_trgm model: each word of the lowercased text is
//! padded with two leading and one trailing space, split into character
//! trigrams, and similarity is the Jaccard ratio of the two trigram sets.
//! This tolerates the spelling noise a vision model produces ("Lays" vs
//! "Lay's", "Coca Cola" vs "Coca-Cola") that substring matching misses.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::CatalogError;
use crate::record::{NewProduct, Product, ProductPatch};
use crate::traits::CatalogStore;

/// Results returned per query before cross-query dedup.
const TOP_K: usize = 3;

/// Minimum similarity for a product to count as a match.
const SIMILARITY_FLOOR: f64 = 0.1;

/// Split text into padded word trigrams, pg_trgm style.
fn trigrams(text: &str) -> HashSet<[char; 3]> {
    let mut set = HashSet::new();
    for word in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let padded: Vec<char> = std::iter::repeat(' ')
            .take(2)
            .chain(word.chars())
            .chain(std::iter::once(' '))
            .collect();
        for window in padded.windows(3) {
            set.insert([window[0], window[1], window[2]]);
        }
    }
    set
}

/// Jaccard similarity of the trigram sets of two strings.
fn similarity(a: &HashSet<[char; 3]>, b: &HashSet<[char; 3]>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    let union = a.len() + b.len() - shared;
    shared as f64 / union as f64
}

/// In-memory backend with trigram-similarity ranking, top-3 per query.
pub struct TrigramCatalog {
    inner: Mutex<Inner>,
}

struct Inner {
    next_id: i64,
    products: Vec<Product>,
}

impl TrigramCatalog {
    pub fn new() -> Self {
        TrigramCatalog {
            inner: Mutex::new(Inner {
                next_id: 1,
                products: Vec::new(),
            }),
        }
    }
}

impl Default for TrigramCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogStore for TrigramCatalog {
    async fn search(&self, queries: &[String]) -> Result<Vec<Product>, CatalogError> {
        let inner = self.inner.lock().await;
        let mut results: Vec<Product> = Vec::new();
        let mut seen: HashSet<i64> = HashSet::new();

        for query in queries {
            let query_grams = trigrams(query);
            if query_grams.is_empty() {
                continue;
            }

            let mut scored: Vec<(f64, &Product)> = inner
                .products
                .iter()
                .filter(|p| p.in_stock)
                .map(|p| (similarity(&query_grams, &trigrams(&p.search_text())), p))
                .filter(|(score, _)| *score >= SIMILARITY_FLOOR)
                .collect();
            // Stable sort keeps insertion order among equal scores.
            scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

            for (_, hit) in scored.into_iter().take(TOP_K) {
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
