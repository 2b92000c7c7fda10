//! Backend Adapter Module
//!
//! Wraps each physical storage medium behind a uniform
//! probe/prepare/read/write/delete contract, and selects the single durable
//! backend a store mirrors to.
//!
//! Write and delete settle either synchronously (cookie jar, structured
//! local store) or through a pending completion future (the transactional
//! databases); [`Outcome`] carries both shapes so the store facade never
//! blocks on a transactional round trip.

mod cookie;
mod local;
mod object_store;
mod sql;

pub use cookie::{CookieBackend, COOKIE_VALUE_LIMIT};
pub use local::LocalBackend;
pub use object_store::ObjectStoreBackend;
pub use sql::SqlBackend;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::Result;
use crate::platform::Platform;

// == Backend Kind ==
/// The closed set of durable backend variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// HTTP-style cookie jar, last-resort durability
    Cookie,
    /// Synchronous structured key-value store
    StructuredLocal,
    /// Asynchronous transactional SQL-text database
    TransactionalSql,
    /// Asynchronous transactional object-store database
    TransactionalObjectStore,
}

impl BackendKind {
    /// Whether writes/deletes settle through a pending completion.
    pub fn is_transactional(self) -> bool {
        matches!(
            self,
            BackendKind::TransactionalSql | BackendKind::TransactionalObjectStore
        )
    }
}

// == Outcome ==
/// A boxed completion future for a pending transactional operation.
pub type Completion<T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'static>>;

/// The result shape of a backend operation: settled on the spot, or pending
/// on an asynchronous transactional completion.
pub enum Outcome<T = ()> {
    Done(Result<T>),
    Pending(Completion<T>),
}

impl<T> Outcome<T> {
    /// Resolves the outcome, awaiting the completion when pending.
    pub async fn settle(self) -> Result<T> {
        match self {
            Outcome::Done(result) => result,
            Outcome::Pending(completion) => completion.await,
        }
    }
}

// == Backend Adapter ==
/// Uniform contract over one physical medium.
pub trait BackendAdapter: Send + Sync {
    /// Which variant this adapter is.
    fn kind(&self) -> BackendKind;

    /// Support check. Media that can advertise support but throw on use
    /// probe defensively (write-then-delete canary); the rest answer by
    /// presence.
    fn probe(&self) -> bool;

    /// One-time schema/version setup before first use.
    fn prepare(&self) -> Outcome<()> {
        Outcome::Done(Ok(()))
    }

    /// Synchronous point read, used when `get` misses the memory cache.
    ///
    /// Only the synchronous media implement this; transactional adapters
    /// return `None` because their content was drained into memory at
    /// rehydration.
    fn read_sync(&self, _physical_key: &str) -> Option<String> {
        None
    }

    /// Enumerates every stored `(physicalKey, text)` pair. Used solely
    /// during rehydration; the cookie adapter never participates.
    fn read_all(&self) -> Outcome<Vec<(String, String)>>;

    /// Persists a serialized value under a physical key. `expires_at_ms` is
    /// carried for media with native expiry attributes (cookies); the rest
    /// ignore it.
    fn write(&self, physical_key: &str, text: &str, expires_at_ms: u64) -> Outcome<()>;

    /// Deletes a physical key.
    fn delete(&self, physical_key: &str) -> Outcome<()>;
}

// == Durable Backend Selection ==
/// Probes the platform's media in durability/capacity order and returns the
/// first supported adapter. Returns `None` when no durable medium is
/// available (the store then runs memory-only).
pub fn select_durable(
    platform: &Platform,
    config: &StoreConfig,
) -> Option<Arc<dyn BackendAdapter>> {
    if let Some(db) = &platform.object_db {
        let backend = ObjectStoreBackend::new(Arc::clone(db), config.version);
        if backend.probe() {
            info!(store = %config.name, "selected object-store backend");
            return Some(Arc::new(backend));
        }
    }

    if let Some(db) = &platform.sql_db {
        let backend = SqlBackend::new(Arc::clone(db), config.size_mb);
        if backend.probe() {
            info!(store = %config.name, "selected SQL backend");
            return Some(Arc::new(backend));
        }
    }

    if let Some(store) = &platform.local_store {
        let backend = LocalBackend::new(Arc::clone(store), format!("{}__probe", config.name));
        if backend.probe() {
            info!(store = %config.name, "selected structured local backend");
            return Some(Arc::new(backend));
        }
        debug!(store = %config.name, "local store advertised but failed canary probe");
    }

    if let Some(jar) = &platform.cookie_jar {
        let domain = config
            .domain
            .clone()
            .unwrap_or_else(|| platform.hostname.clone());
        let backend = CookieBackend::new(Arc::clone(jar), domain);
        if backend.probe() {
            info!(store = %config.name, "selected cookie backend");
            return Some(Arc::new(backend));
        }
    }

    debug!(store = %config.name, "no durable backend available");
    None
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{
        MemoryCookieJar, MemoryLocalStore, MemoryObjectDatabase, MemorySqlDatabase,
    };

    fn config() -> StoreConfig {
        StoreConfig::new("t").unwrap()
    }

    #[test]
    fn test_selection_prefers_object_store() {
        let platform = Platform::new("localhost")
            .with_object_db(Arc::new(MemoryObjectDatabase::new()))
            .with_sql_db(Arc::new(MemorySqlDatabase::new()))
            .with_local_store(Arc::new(MemoryLocalStore::new()))
            .with_cookie_jar(Arc::new(MemoryCookieJar::new()));

        let backend = select_durable(&platform, &config()).unwrap();
        assert_eq!(backend.kind(), BackendKind::TransactionalObjectStore);
    }

    #[test]
    fn test_selection_falls_back_to_sql() {
        let platform = Platform::new("localhost")
            .with_sql_db(Arc::new(MemorySqlDatabase::new()))
            .with_local_store(Arc::new(MemoryLocalStore::new()));

        let backend = select_durable(&platform, &config()).unwrap();
        assert_eq!(backend.kind(), BackendKind::TransactionalSql);
    }

    #[test]
    fn test_selection_skips_failing_local_store() {
        let local = Arc::new(MemoryLocalStore::new());
        local.set_fail_writes(true);
        let platform = Platform::new("localhost")
            .with_local_store(local)
            .with_cookie_jar(Arc::new(MemoryCookieJar::new()));

        let backend = select_durable(&platform, &config()).unwrap();
        assert_eq!(backend.kind(), BackendKind::Cookie);
    }

    #[test]
    fn test_selection_none_when_no_media() {
        let platform = Platform::new("localhost");
        assert!(select_durable(&platform, &config()).is_none());
    }

    #[tokio::test]
    async fn test_outcome_settle() {
        let done: Outcome<u32> = Outcome::Done(Ok(7));
        assert_eq!(done.settle().await.unwrap(), 7);

        let pending: Outcome<u32> = Outcome::Pending(Box::pin(async { Ok(9) }));
        assert_eq!(pending.settle().await.unwrap(), 9);
    }

    #[test]
    fn test_kind_transactionality() {
        assert!(BackendKind::TransactionalSql.is_transactional());
        assert!(BackendKind::TransactionalObjectStore.is_transactional());
        assert!(!BackendKind::Cookie.is_transactional());
        assert!(!BackendKind::StructuredLocal.is_transactional());
    }
}
