/// All errors that can be returned by a catalog backend.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// No product with the given id exists.
    #[error("product not found: {id}")]
    NotFound { id: i64 },

    /// A backend-specific storage error (connection, serialization, etc.).
    #[error("catalog backend error: {0}")]
    Backend(String),
}
