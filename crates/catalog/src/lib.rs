//! Product catalog store for the Snapcart backend.
//!
//! Exposes the [`CatalogStore`] trait plus two in-process backends:
//!
//! - [`MemoryCatalog`] -- case-insensitive substring search, top-2 per query
//! - [`TrigramCatalog`] -- trigram-similarity ranked search, top-3 per query
//!
//! Both backends share the same multi-query search contract: one `search`
//! call takes the full list of free-text queries from a recognition pass,
//! matches each query independently against in-stock products, and
//! deduplicates hits globally across queries (first match keeps its
//! position). Choosing one backend over the other never changes the CRUD
//! or dedup semantics, only per-query matching and ranking.

mod error;
mod memory;
mod record;
mod traits;
mod trigram;

pub use error::CatalogError;
pub use memory::MemoryCatalog;
pub use record::{NewProduct, Product, ProductPatch};
pub use traits::CatalogStore;
pub use trigram::TrigramCatalog;

#[cfg(test)]
mod conformance;
