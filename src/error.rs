//! Error types for the cache store
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Store Error Enum ==
/// Unified error type for the cache store.
///
/// Only `InvalidName` ever escapes a public constructor. Every other variant
/// is recovered internally: the failure is published as an `Error` event and
/// surfaced through the operation's completion callback, while the in-memory
/// mutation (if any) stays applied.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Store name missing or empty at construction
    #[error("store name must be a non-empty string")]
    InvalidName,

    /// Malformed serialized payload behind the structured-value tag
    #[error("malformed serialized payload: {0}")]
    Codec(#[from] serde_json::Error),

    /// Duration string contained a unit outside the unit table
    #[error("unsupported duration unit: {0:?}")]
    UnsupportedUnit(String),

    /// Durable backend rejected or failed a write
    #[error("backend write failed: {0}")]
    BackendWrite(String),

    /// Durable backend rejected or failed a delete
    #[error("backend delete failed: {0}")]
    BackendDelete(String),

    /// Backend unavailable, or probe/prepare/enumeration failed
    #[error("backend error: {0}")]
    Backend(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache store.
pub type Result<T> = std::result::Result<T, StoreError>;
