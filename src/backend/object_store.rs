//! Transactional Object-Store Backend
//!
//! IndexedDB-like medium holding one object store named `cache`. The schema
//! version is negotiated at prepare time: a stored version that differs from
//! the requested one triggers a migration (create the object store, record
//! the new version) before any use.

use std::sync::Arc;

use tracing::info;

use crate::backend::{BackendAdapter, BackendKind, Outcome};
use crate::error::StoreError;
use crate::platform::ObjectDatabase;

const OBJECT_STORE: &str = "cache";

// == Object-Store Backend ==
/// [`BackendAdapter`] over an asynchronous object-store database.
pub struct ObjectStoreBackend {
    db: Arc<dyn ObjectDatabase>,
    requested_version: u32,
}

impl ObjectStoreBackend {
    pub fn new(db: Arc<dyn ObjectDatabase>, requested_version: u32) -> Self {
        Self {
            db,
            requested_version,
        }
    }
}

impl BackendAdapter for ObjectStoreBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::TransactionalObjectStore
    }

    /// An injected database handle is already open; presence is support.
    fn probe(&self) -> bool {
        true
    }

    fn prepare(&self) -> Outcome<()> {
        let db = Arc::clone(&self.db);
        let requested = self.requested_version;
        Outcome::Pending(Box::pin(async move {
            let stored = db.version();
            if stored != requested {
                if !db.contains_store(OBJECT_STORE) {
                    db.create_store(OBJECT_STORE).await?;
                }
                db.set_version(requested).await?;
                info!(from = stored, to = requested, "migrated object-store schema");
            }
            Ok(())
        }))
    }

    fn read_all(&self) -> Outcome<Vec<(String, String)>> {
        let db = Arc::clone(&self.db);
        Outcome::Pending(Box::pin(async move { db.scan(OBJECT_STORE).await }))
    }

    fn write(&self, physical_key: &str, text: &str, _expires_at_ms: u64) -> Outcome<()> {
        let db = Arc::clone(&self.db);
        let key = physical_key.to_string();
        let data = text.to_string();
        Outcome::Pending(Box::pin(async move {
            db.put(OBJECT_STORE, &key, &data)
                .await
                .map_err(|err| StoreError::BackendWrite(err.to_string()))
        }))
    }

    fn delete(&self, physical_key: &str) -> Outcome<()> {
        let db = Arc::clone(&self.db);
        let key = physical_key.to_string();
        Outcome::Pending(Box::pin(async move {
            db.delete(OBJECT_STORE, &key)
                .await
                .map_err(|err| StoreError::BackendDelete(err.to_string()))
        }))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryObjectDatabase;

    #[tokio::test]
    async fn test_prepare_migrates_fresh_database() {
        let db = Arc::new(MemoryObjectDatabase::new());
        let backend = ObjectStoreBackend::new(db.clone(), 2);

        backend.prepare().settle().await.unwrap();
        assert_eq!(db.version(), 2);
        assert!(db.contains_store(OBJECT_STORE));
    }

    #[tokio::test]
    async fn test_prepare_skips_matching_version() {
        let db = Arc::new(MemoryObjectDatabase::new());
        db.create_store(OBJECT_STORE).await.unwrap();
        db.set_version(1).await.unwrap();
        db.put(OBJECT_STORE, "k", "v").await.unwrap();

        let backend = ObjectStoreBackend::new(db.clone(), 1);
        backend.prepare().settle().await.unwrap();

        // existing records survive a no-op prepare
        assert_eq!(db.records(OBJECT_STORE).len(), 1);
    }

    #[tokio::test]
    async fn test_write_scan_delete() {
        let db = Arc::new(MemoryObjectDatabase::new());
        let backend = ObjectStoreBackend::new(db.clone(), 1);
        backend.prepare().settle().await.unwrap();

        backend.write("k", "v", 0).settle().await.unwrap();
        assert_eq!(
            backend.read_all().settle().await.unwrap(),
            vec![("k".to_string(), "v".to_string())]
        );

        backend.delete("k").settle().await.unwrap();
        assert!(backend.read_all().settle().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_maps_to_backend_write() {
        let db = Arc::new(MemoryObjectDatabase::new());
        let backend = ObjectStoreBackend::new(db.clone(), 1);
        backend.prepare().settle().await.unwrap();

        db.set_fail_writes(true);
        let err = backend.write("k", "v", 0).settle().await.unwrap_err();
        assert!(matches!(err, StoreError::BackendWrite(_)));
    }
}
