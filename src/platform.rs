//! Platform Adapter Module
//!
//! Explicit, injected handles to the physical storage media a store may
//! mirror to. Backends never touch ambient/global state; everything a store
//! can reach is handed to it here at construction, which keeps the core
//! logic testable without a real host environment.
//!
//! The in-memory implementations double as embeddable pure-memory media and
//! as test fixtures. They honor the same observable semantics as the real
//! media: the cookie jar evaluates `expires` attributes, the SQL database
//! only understands the statement set the backend issues, and the local
//! store can be toggled to fail writes the way quota-restricted
//! environments do.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::error::{Result, StoreError};

// == Cookie Jar ==
/// An HTTP-style cookie jar shared by everything on the platform.
pub trait CookieJar: Send + Sync {
    /// Returns the live cookies as a single `k=v; k2=v2` string.
    fn read(&self) -> String;

    /// Applies a `key=value; expires=<date>; path=/` attribute string.
    ///
    /// An already-expired date deletes the cookie; there is no dedicated
    /// delete primitive.
    fn write(&self, cookie: &str);
}

// == Local Store ==
/// A synchronous structured key-value store (localStorage-like).
///
/// Every method is fallible: some environments advertise the API but throw
/// on use (quota limits, private browsing modes), which is exactly why the
/// backend probes with a write-then-delete canary before trusting it.
pub trait LocalStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;

    /// Enumerates every stored key.
    fn keys(&self) -> Result<Vec<String>>;
}

// == SQL Database ==
/// An asynchronous transactional SQL-text database (WebSQL-like).
#[async_trait]
pub trait SqlDatabase: Send + Sync {
    /// Executes a statement, returning the number of rows affected.
    async fn execute(&self, statement: &str, params: &[&str]) -> Result<u64>;

    /// Runs a query, returning `(key, data)` rows.
    async fn query(&self, statement: &str) -> Result<Vec<(String, String)>>;
}

// == Object Database ==
/// An asynchronous transactional object-store database (IndexedDB-like).
///
/// Carries a schema version number negotiated at open: when the stored
/// version differs from the requested one, the caller migrates (creates its
/// object store) and bumps the version before use.
#[async_trait]
pub trait ObjectDatabase: Send + Sync {
    /// The currently stored schema version.
    fn version(&self) -> u32;

    /// Records a new schema version.
    async fn set_version(&self, version: u32) -> Result<()>;

    /// Whether an object store with this name exists.
    fn contains_store(&self, name: &str) -> bool;

    /// Creates an object store.
    async fn create_store(&self, name: &str) -> Result<()>;

    /// Inserts or replaces a record.
    async fn put(&self, store: &str, key: &str, data: &str) -> Result<()>;

    /// Deletes a record. Deleting an absent key succeeds silently.
    async fn delete(&self, store: &str, key: &str) -> Result<()>;

    /// Cursor-style full scan of `(key, data)` records.
    async fn scan(&self, store: &str) -> Result<Vec<(String, String)>>;
}

// == Platform ==
/// The bundle of media available to a store.
///
/// Any subset may be present; backend selection probes them in durability
/// order at open. Media are `Arc`-shared so multiple stores can sit on the
/// same physical jar or database, isolated only by their key prefixes.
#[derive(Clone, Default)]
pub struct Platform {
    /// Host name used as the default cookie domain
    pub hostname: String,
    pub cookie_jar: Option<Arc<dyn CookieJar>>,
    pub local_store: Option<Arc<dyn LocalStore>>,
    pub sql_db: Option<Arc<dyn SqlDatabase>>,
    pub object_db: Option<Arc<dyn ObjectDatabase>>,
}

impl Platform {
    /// Creates an empty platform (memory-only stores) for the given host.
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            ..Self::default()
        }
    }

    pub fn with_cookie_jar(mut self, jar: Arc<dyn CookieJar>) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    pub fn with_local_store(mut self, store: Arc<dyn LocalStore>) -> Self {
        self.local_store = Some(store);
        self
    }

    pub fn with_sql_db(mut self, db: Arc<dyn SqlDatabase>) -> Self {
        self.sql_db = Some(db);
        self
    }

    pub fn with_object_db(mut self, db: Arc<dyn ObjectDatabase>) -> Self {
        self.object_db = Some(db);
        self
    }
}

// == Cookie Dates ==
/// Formats a Unix-millisecond timestamp as an HTTP cookie date
/// (`Thu, 01 Jan 1970 00:00:00 GMT`).
pub fn http_date(unix_ms: u64) -> String {
    let date = Utc
        .timestamp_millis_opt(unix_ms as i64)
        .single()
        .unwrap_or_else(|| Utc.timestamp_millis_opt(0).unwrap());
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Parses an HTTP cookie date back to Unix milliseconds.
pub fn parse_http_date(text: &str) -> Option<i64> {
    DateTime::parse_from_rfc2822(text)
        .ok()
        .map(|date| date.timestamp_millis())
}

// == Memory Cookie Jar ==
/// In-memory [`CookieJar`] honoring the `expires` attribute.
#[derive(Default)]
pub struct MemoryCookieJar {
    cookies: Mutex<BTreeMap<String, String>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live cookies, for inspection in tests.
    pub fn len(&self) -> usize {
        self.cookies.lock().expect("cookie jar poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CookieJar for MemoryCookieJar {
    fn read(&self) -> String {
        let cookies = self.cookies.lock().expect("cookie jar poisoned");
        cookies
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn write(&self, cookie: &str) {
        let mut parts = cookie.split("; ");
        let Some(pair) = parts.next() else {
            return;
        };
        let Some((key, value)) = pair.split_once('=') else {
            return;
        };

        let mut expired = false;
        for attribute in parts {
            if let Some(date) = attribute.strip_prefix("expires=") {
                match parse_http_date(date) {
                    Some(at) => expired = at <= Utc::now().timestamp_millis(),
                    // Unparseable dates delete, same as "expires=-1"
                    None => expired = true,
                }
            }
        }

        let mut cookies = self.cookies.lock().expect("cookie jar poisoned");
        if expired {
            cookies.remove(key);
        } else {
            cookies.insert(key.to_string(), value.to_string());
        }
    }
}

// == Memory Local Store ==
/// In-memory [`LocalStore`] with a write-failure toggle for exercising the
/// canary probe and quota-style errors.
#[derive(Default)]
pub struct MemoryLocalStore {
    items: Mutex<BTreeMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, `set_item` fails the way a quota-exhausted store does.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.items.lock().expect("local store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LocalStore for MemoryLocalStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .items
            .lock()
            .expect("local store poisoned")
            .get(key)
            .cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("quota exceeded".to_string()));
        }
        self.items
            .lock()
            .expect("local store poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items.lock().expect("local store poisoned").remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self
            .items
            .lock()
            .expect("local store poisoned")
            .keys()
            .cloned()
            .collect())
    }
}

// == Memory SQL Database ==
/// In-memory [`SqlDatabase`] understanding exactly the statement set the
/// SQL backend issues, with a write-failure toggle for mirror-failure tests.
#[derive(Default)]
pub struct MemorySqlDatabase {
    rows: Mutex<Vec<(String, String)>>,
    table_created: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemorySqlDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every non-DDL statement fails.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of the `cache` table, for inspection in tests.
    pub fn rows(&self) -> Vec<(String, String)> {
        self.rows.lock().expect("sql rows poisoned").clone()
    }

    fn ensure_table(&self) -> Result<()> {
        if !self.table_created.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("no such table: cache".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SqlDatabase for MemorySqlDatabase {
    async fn execute(&self, statement: &str, params: &[&str]) -> Result<u64> {
        if statement.starts_with("CREATE TABLE IF NOT EXISTS cache") {
            self.table_created.store(true, Ordering::SeqCst);
            return Ok(0);
        }
        self.ensure_table()?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("database is locked".to_string()));
        }

        let mut rows = self.rows.lock().expect("sql rows poisoned");
        match statement {
            "UPDATE cache SET data=? WHERE key=?" => {
                let [data, key] = params else {
                    return Err(StoreError::Backend("bad parameter count".to_string()));
                };
                let mut affected = 0;
                for row in rows.iter_mut() {
                    if row.0 == *key {
                        row.1 = data.to_string();
                        affected += 1;
                    }
                }
                Ok(affected)
            }
            "INSERT INTO cache (key, data) VALUES (?, ?)" => {
                let [key, data] = params else {
                    return Err(StoreError::Backend("bad parameter count".to_string()));
                };
                rows.push((key.to_string(), data.to_string()));
                Ok(1)
            }
            "DELETE FROM cache WHERE key=?" => {
                let [key] = params else {
                    return Err(StoreError::Backend("bad parameter count".to_string()));
                };
                let before = rows.len();
                rows.retain(|(row_key, _)| row_key != key);
                Ok((before - rows.len()) as u64)
            }
            other => Err(StoreError::Backend(format!(
                "unsupported statement: {other}"
            ))),
        }
    }

    async fn query(&self, statement: &str) -> Result<Vec<(String, String)>> {
        self.ensure_table()?;
        if statement == "SELECT * FROM cache" {
            Ok(self.rows.lock().expect("sql rows poisoned").clone())
        } else {
            Err(StoreError::Backend(format!(
                "unsupported statement: {statement}"
            )))
        }
    }
}

// == Memory Object Database ==
/// In-memory [`ObjectDatabase`]. A fresh database reports version 0, so the
/// first open against it always goes through the migration step.
#[derive(Default)]
pub struct MemoryObjectDatabase {
    version: AtomicU32,
    stores: Mutex<HashMap<String, BTreeMap<String, String>>>,
    fail_writes: AtomicBool,
}

impl MemoryObjectDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, `put` and `delete` fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of one object store's records, for inspection in tests.
    pub fn records(&self, store: &str) -> Vec<(String, String)> {
        self.stores
            .lock()
            .expect("object stores poisoned")
            .get(store)
            .map(|records| {
                records
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl ObjectDatabase for MemoryObjectDatabase {
    fn version(&self) -> u32 {
        self.version.load(Ordering::SeqCst)
    }

    async fn set_version(&self, version: u32) -> Result<()> {
        self.version.store(version, Ordering::SeqCst);
        Ok(())
    }

    fn contains_store(&self, name: &str) -> bool {
        self.stores
            .lock()
            .expect("object stores poisoned")
            .contains_key(name)
    }

    async fn create_store(&self, name: &str) -> Result<()> {
        self.stores
            .lock()
            .expect("object stores poisoned")
            .entry(name.to_string())
            .or_default();
        Ok(())
    }

    async fn put(&self, store: &str, key: &str, data: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("transaction aborted".to_string()));
        }
        let mut stores = self.stores.lock().expect("object stores poisoned");
        let records = stores
            .get_mut(store)
            .ok_or_else(|| StoreError::Backend(format!("unknown object store: {store}")))?;
        records.insert(key.to_string(), data.to_string());
        Ok(())
    }

    async fn delete(&self, store: &str, key: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("transaction aborted".to_string()));
        }
        let mut stores = self.stores.lock().expect("object stores poisoned");
        let records = stores
            .get_mut(store)
            .ok_or_else(|| StoreError::Backend(format!("unknown object store: {store}")))?;
        records.remove(key);
        Ok(())
    }

    async fn scan(&self, store: &str) -> Result<Vec<(String, String)>> {
        let stores = self.stores.lock().expect("object stores poisoned");
        let records = stores
            .get(store)
            .ok_or_else(|| StoreError::Backend(format!("unknown object store: {store}")))?;
        Ok(records
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
