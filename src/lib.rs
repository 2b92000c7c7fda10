//! # durable-cache
//!
//! A namespaced key-value cache with layered durability. Every read and
//! write is served synchronously from an in-memory map; each write is
//! mirrored best-effort to the most capable durable medium the host
//! platform provides, probed in order: transactional object store,
//! transactional SQL database, structured local store, cookie jar. Opening
//! a store rehydrates its namespace from the durable medium and fires a
//! one-shot `ready` signal.
//!
//! Values are JSON ([`Value`]); the falsy family (null, false, zero, the
//! empty string) is not storable. Entries expire lazily under per-store or
//! per-write durations parsed from compact text like `"2 days"` or
//! `"1h 30m"`.
//!
//! ```no_run
//! use durable_cache::{Platform, Store, StoreConfig};
//!
//! # async fn demo() -> durable_cache::Result<()> {
//! let config = StoreConfig::new("session")?.with_expires("2 days");
//! let mut store = Store::open(config, Platform::new("example.org")).await?;
//!
//! store.set("user", "ada");
//! assert_eq!(store.get("user"), Some("ada".into()));
//! store.remove("user");
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod codec;
pub mod config;
pub mod error;
pub mod events;
pub mod expiry;
pub mod platform;
pub mod store;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use events::{Event, EventKind};
pub use expiry::DurationSpec;
pub use platform::Platform;
pub use store::{SetOptions, Store};

/// The JSON value type stored by every cache.
pub use serde_json::Value;
