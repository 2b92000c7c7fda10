//! Structured Local Backend
//!
//! Synchronous key-value medium (localStorage-like). Probed with a
//! write-then-delete canary because some environments advertise the API but
//! throw on use.

use std::sync::Arc;

use tracing::debug;

use crate::backend::{BackendAdapter, BackendKind, Outcome};
use crate::error::StoreError;
use crate::platform::LocalStore;

// == Local Backend ==
/// [`BackendAdapter`] over a synchronous structured store.
pub struct LocalBackend {
    store: Arc<dyn LocalStore>,
    probe_key: String,
}

impl LocalBackend {
    pub fn new(store: Arc<dyn LocalStore>, probe_key: String) -> Self {
        Self { store, probe_key }
    }
}

impl BackendAdapter for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::StructuredLocal
    }

    /// Write-then-delete canary.
    fn probe(&self) -> bool {
        match self.store.set_item(&self.probe_key, "test") {
            Ok(()) => {
                let _ = self.store.remove_item(&self.probe_key);
                true
            }
            Err(err) => {
                debug!(%err, "local store canary write failed");
                false
            }
        }
    }

    fn read_sync(&self, physical_key: &str) -> Option<String> {
        self.store.get_item(physical_key).ok().flatten()
    }

    fn read_all(&self) -> Outcome<Vec<(String, String)>> {
        let result = (|| {
            let mut entries = Vec::new();
            for key in self.store.keys()? {
                if let Some(text) = self.store.get_item(&key)? {
                    entries.push((key, text));
                }
            }
            Ok(entries)
        })();
        Outcome::Done(result)
    }

    fn write(&self, physical_key: &str, text: &str, _expires_at_ms: u64) -> Outcome<()> {
        Outcome::Done(
            self.store
                .set_item(physical_key, text)
                .map_err(|err| StoreError::BackendWrite(err.to_string())),
        )
    }

    fn delete(&self, physical_key: &str) -> Outcome<()> {
        Outcome::Done(
            self.store
                .remove_item(physical_key)
                .map_err(|err| StoreError::BackendDelete(err.to_string())),
        )
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryLocalStore;

    fn backend() -> (Arc<MemoryLocalStore>, LocalBackend) {
        let store = Arc::new(MemoryLocalStore::new());
        let backend = LocalBackend::new(store.clone(), "t__probe".to_string());
        (store, backend)
    }

    #[test]
    fn test_probe_success_leaves_no_canary() {
        let (store, backend) = backend();
        assert!(backend.probe());
        assert!(store.is_empty());
    }

    #[test]
    fn test_probe_fails_when_writes_throw() {
        let (store, backend) = backend();
        store.set_fail_writes(true);
        assert!(!backend.probe());
    }

    #[tokio::test]
    async fn test_write_read_delete() {
        let (_, backend) = backend();
        backend.write("tk", "v", 0).settle().await.unwrap();
        assert_eq!(backend.read_sync("tk").as_deref(), Some("v"));

        backend.delete("tk").settle().await.unwrap();
        assert_eq!(backend.read_sync("tk"), None);
    }

    #[tokio::test]
    async fn test_write_failure_maps_to_backend_write() {
        let (store, backend) = backend();
        store.set_fail_writes(true);
        let err = backend.write("tk", "v", 0).settle().await.unwrap_err();
        assert!(matches!(err, StoreError::BackendWrite(_)));
    }

    #[tokio::test]
    async fn test_read_all_enumerates_everything() {
        let (store, backend) = backend();
        store.set_item("a", "1").unwrap();
        store.set_item("b", "2").unwrap();

        let mut entries = backend.read_all().settle().await.unwrap();
        entries.sort();
        assert_eq!(
            entries,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string())
            ]
        );
    }
}
