//! Store Module
//!
//! The memory cache and the facade over it: namespaced set/get/remove with
//! durable mirroring, lazy expiry, rehydration, and the one-shot `ready`
//! signal.

mod entry;
mod facade;
mod ready;

#[cfg(test)]
mod property_tests;

pub use entry::CacheEntry;
pub use facade::{
    RemoveAllCallback, RemoveCallback, SetCallback, SetOptions, Store,
};
pub use ready::ReadyLatch;
