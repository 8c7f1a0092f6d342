use snapcart_catalog::CatalogError;

/// All errors a recognition call can fail with. There is no partial or
/// cached success: every failure is explicit.
#[derive(Debug, thiserror::Error)]
pub enum RecognitionError {
    /// The vision capability is unreachable or answered non-2xx after
    /// retries.
    #[error("vision capability unavailable: {0}")]
    Upstream(String),

    /// The model broke the required interaction contract (e.g. skipped the
    /// mandatory tool call).
    #[error("vision protocol violation: {0}")]
    ProtocolViolation(String),

    /// The model's final output did not conform to the response schema.
    #[error("malformed vision output: {0}")]
    MalformedOutput(String),

    /// The catalog search inside the pipeline failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
