//! Configuration Module
//!
//! Store construction options. A config is immutable once the store is
//! opened; the only fatal construction failure is a missing name.

use crate::error::{Result, StoreError};
use crate::expiry::DurationSpec;

/// Store configuration parameters.
///
/// The `name` acts as the store's unique namespace: every physical key
/// written to a durable backend is prefixed with it. Two stores sharing a
/// name share their entries by design; stores with different names never
/// observe each other's keys.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Unique namespace for this store (required, non-empty)
    pub name: String,
    /// Cookie domain; defaults to the platform hostname when unset
    pub domain: Option<String>,
    /// Default expiry applied to entries stored without an explicit one
    pub expires: DurationSpec,
    /// Durable-store size hint in megabytes
    pub size_mb: u64,
    /// Object-store schema version to negotiate at open
    pub version: u32,
}

impl StoreConfig {
    /// Creates a config with the given store name and default options.
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidName`] if the name is empty.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(StoreError::InvalidName);
        }
        Ok(Self {
            name,
            domain: None,
            expires: DurationSpec::from("1 year"),
            size_mb: 5,
            version: 1,
        })
    }

    /// Sets a custom cookie domain.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the default expiry for entries stored without an explicit one.
    pub fn with_expires(mut self, expires: impl Into<DurationSpec>) -> Self {
        self.expires = expires.into();
        self
    }

    /// Sets the durable-store size hint in megabytes.
    pub fn with_size_mb(mut self, size_mb: u64) -> Self {
        self.size_mb = size_mb;
        self
    }

    /// Sets the object-store schema version.
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }
}
