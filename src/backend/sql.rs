//! Transactional SQL Backend
//!
//! WebSQL-like medium with one idempotently created `cache(key, data)`
//! table. Writes follow an update-then-insert-on-miss pattern so no prior
//! existence check is needed; every operation settles through a pending
//! completion.

use std::sync::Arc;

use tracing::debug;

use crate::backend::{BackendAdapter, BackendKind, Outcome};
use crate::error::StoreError;
use crate::platform::SqlDatabase;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS cache (key TEXT, data TEXT)";
const SELECT_ALL: &str = "SELECT * FROM cache";
const UPDATE_DATA: &str = "UPDATE cache SET data=? WHERE key=?";
const INSERT_ENTRY: &str = "INSERT INTO cache (key, data) VALUES (?, ?)";
const DELETE_ENTRY: &str = "DELETE FROM cache WHERE key=?";

// == SQL Backend ==
/// [`BackendAdapter`] over an asynchronous transactional SQL-text database.
pub struct SqlBackend {
    db: Arc<dyn SqlDatabase>,
    size_hint_mb: u64,
}

impl SqlBackend {
    pub fn new(db: Arc<dyn SqlDatabase>, size_hint_mb: u64) -> Self {
        Self { db, size_hint_mb }
    }
}

impl BackendAdapter for SqlBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::TransactionalSql
    }

    /// An injected database handle is already open; presence is support.
    fn probe(&self) -> bool {
        true
    }

    fn prepare(&self) -> Outcome<()> {
        debug!(size_hint_mb = self.size_hint_mb, "preparing SQL cache table");
        let db = Arc::clone(&self.db);
        Outcome::Pending(Box::pin(async move {
            db.execute(CREATE_TABLE, &[]).await?;
            Ok(())
        }))
    }

    fn read_all(&self) -> Outcome<Vec<(String, String)>> {
        let db = Arc::clone(&self.db);
        Outcome::Pending(Box::pin(async move { db.query(SELECT_ALL).await }))
    }

    fn write(&self, physical_key: &str, text: &str, _expires_at_ms: u64) -> Outcome<()> {
        let db = Arc::clone(&self.db);
        let key = physical_key.to_string();
        let data = text.to_string();
        Outcome::Pending(Box::pin(async move {
            let updated = db
                .execute(UPDATE_DATA, &[&data, &key])
                .await
                .map_err(|err| StoreError::BackendWrite(err.to_string()))?;
            if updated == 0 {
                let inserted = db
                    .execute(INSERT_ENTRY, &[&key, &data])
                    .await
                    .map_err(|err| StoreError::BackendWrite(err.to_string()))?;
                if inserted == 0 {
                    return Err(StoreError::BackendWrite(format!(
                        "insert affected no rows for key {key}"
                    )));
                }
            }
            Ok(())
        }))
    }

    fn delete(&self, physical_key: &str) -> Outcome<()> {
        let db = Arc::clone(&self.db);
        let key = physical_key.to_string();
        Outcome::Pending(Box::pin(async move {
            let deleted = db
                .execute(DELETE_ENTRY, &[&key])
                .await
                .map_err(|err| StoreError::BackendDelete(err.to_string()))?;
            if deleted == 0 {
                return Err(StoreError::BackendDelete(format!(
                    "no rows matched key {key}"
                )));
            }
            Ok(())
        }))
    }
}
