use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CatalogError;
use crate::record::{NewProduct, Product, ProductPatch};

/// The storage trait for product catalog backends.
///
/// ## Search contract
///
/// `search` takes the full list of free-text queries from one recognition
/// pass, not a single query. For each query independently the backend finds
/// in-stock products whose name or description matches, capped to a
/// backend-chosen top-K per query. Deduplication is global across the whole
/// call: a product already returned for an earlier query is dropped from
/// later result sets, and insertion order across queries is preserved.
///
/// ## Thread safety
///
/// Implementations must be `Send + Sync + 'static` to be used in axum
/// application state and across async task boundaries.
#[async_trait]
pub trait CatalogStore: Send + Sync + 'static {
    /// Multi-query search with global cross-query dedup.
    async fn search(&self, queries: &[String]) -> Result<Vec<Product>, CatalogError>;

    /// Read a product by id. Returns `Err(CatalogError::NotFound)` if absent.
    async fn get(&self, id: i64) -> Result<Product, CatalogError>;

    /// Create a product; the store assigns the id and creation timestamp.
    async fn create(&self, new: NewProduct) -> Result<Product, CatalogError>;

    /// Apply a partial update. Unsupplied fields retain their prior value;
    /// an empty patch is a no-op success. Returns the updated record.
    async fn update(&self, id: i64, patch: ProductPatch) -> Result<Product, CatalogError>;

    /// Delete a product by id. Returns `Err(CatalogError::NotFound)` if absent.
    async fn delete(&self, id: i64) -> Result<(), CatalogError>;

    /// List every product, ordered by name.
    async fn list_all(&self) -> Result<Vec<Product>, CatalogError>;
}

// Shared handles (axum state) delegate to the inner store.
#[async_trait]
impl<T: CatalogStore + ?Sized> CatalogStore for Arc<T> {
    async fn search(&self, queries: &[String]) -> Result<Vec<Product>, CatalogError> {
        (**self).search(queries).await
    }

    async fn get(&self, id: i64) -> Result<Product, CatalogError> {
        (**self).get(id).await
    }

    async fn create(&self, new: NewProduct) -> Result<Product, CatalogError> {
        (**self).create(new).await
    }

    async fn update(&self, id: i64, patch: ProductPatch) -> Result<Product, CatalogError> {
        (**self).update(id, patch).await
    }

    async fn delete(&self, id: i64) -> Result<(), CatalogError> {
        (**self).delete(id).await
    }

    async fn list_all(&self) -> Result<Vec<Product>, CatalogError> {
        (**self).list_all().await
    }
}
