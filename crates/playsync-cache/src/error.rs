//! Error types for the cache layer.

/// Errors that can occur persisting the local cache.
///
/// Reads never fail — a missing or mistyped key degrades to the caller's
/// default. Only flushing to the backing store can go wrong.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Writing or renaming the cache file failed.
    #[error("cache io failed: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing the cache map failed.
    #[error("cache serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
