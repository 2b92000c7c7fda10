//! Store Facade Module
//!
//! The public cache interface. Reads are memory-first; writes land in the
//! memory cache synchronously and are mirrored best-effort to the cookie
//! jar and the selected durable backend. Opening a store rehydrates its
//! memory cache from whichever durable backend is available and fires the
//! one-shot `ready` signal.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::backend::{select_durable, BackendAdapter, BackendKind, CookieBackend, Outcome};
use crate::codec;
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::events::{Event, EventBus, EventKind};
use crate::expiry::{compute_expiry, current_timestamp_ms, DurationSpec, UnitTable};
use crate::platform::Platform;
use crate::store::entry::{is_falsy, CacheEntry};
use crate::store::ready::ReadyLatch;

/// One year under the default unit table; used when the configured default
/// expiry itself fails to parse.
const FALLBACK_EXPIRY_SECS: u64 = 12 * 4 * 7 * 24 * 3600;

// == Callbacks ==
/// Completion callback for `set_with`: receives the stored value once the
/// durable mirror settles, or `None` on mirror failure.
pub type SetCallback = Box<dyn FnOnce(Option<Value>) + Send + 'static>;

/// Completion callback for `remove_with`: `true` once the durable mirror
/// delete settles, `false` on mirror failure.
pub type RemoveCallback = Box<dyn FnOnce(bool) + Send + 'static>;

/// Completion callback for `remove_all`, fired once every individual
/// removal has signaled completion.
pub type RemoveAllCallback = Box<dyn FnOnce() + Send + 'static>;

/// One-shot hook fired when `ready` fires.
type ReadyHook = Box<dyn FnOnce() + Send + 'static>;

// == Set Options ==
/// Per-write options for [`Store::set_with`].
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// Expiry for this entry; the store default applies when unset
    pub expires: Option<DurationSpec>,
}

// == Store ==
/// A namespaced key-value cache mirrored to the most durable backend the
/// platform supports.
///
/// The memory cache is exclusively owned by this instance. Durable media
/// are external shared resources; the namespace prefix derived from the
/// store name is the only isolation mechanism between stores sharing one.
pub struct Store {
    config: StoreConfig,
    prefix: String,
    cache: HashMap<String, CacheEntry>,
    events: Arc<EventBus>,
    ready: Arc<ReadyLatch>,
    durable: Option<Arc<dyn BackendAdapter>>,
    cookie_mirror: Option<CookieBackend>,
    units: UnitTable,
    default_expiry_secs: u64,
}

impl Store {
    // == Open ==
    /// Opens a store: probes the platform's media for the durable backend,
    /// rehydrates the memory cache from it, and fires `ready` exactly once
    /// before returning.
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidName`] for an empty store name. Every
    /// backend failure during rehydration is recovered: it emits an `Error`
    /// event, and the store opens memory-consistent anyway.
    pub async fn open(config: StoreConfig, platform: Platform) -> Result<Self> {
        Self::open_inner(config, platform, None).await
    }

    /// Like [`Store::open`], additionally firing a one-shot hook when
    /// `ready` fires.
    pub async fn open_with_ready(
        config: StoreConfig,
        platform: Platform,
        ready: impl FnOnce() + Send + 'static,
    ) -> Result<Self> {
        Self::open_inner(config, platform, Some(Box::new(ready))).await
    }

    async fn open_inner(
        config: StoreConfig,
        platform: Platform,
        ready_hook: Option<ReadyHook>,
    ) -> Result<Self> {
        // Config fields are public; re-validate the invariant here.
        if config.name.is_empty() {
            return Err(StoreError::InvalidName);
        }

        let units = UnitTable::default();
        let events = Arc::new(EventBus::new());

        let default_expiry_secs = match config.expires.resolve(&units) {
            Ok(secs) => secs,
            Err(err) => {
                warn!(store = %config.name, %err, "default expiry unparseable, using one year");
                events.emit(&Event::error(err, None));
                FALLBACK_EXPIRY_SECS
            }
        };

        let durable = select_durable(&platform, &config);
        let domain = config
            .domain
            .clone()
            .unwrap_or_else(|| platform.hostname.clone());
        let cookie_mirror = platform
            .cookie_jar
            .as_ref()
            .map(|jar| CookieBackend::new(Arc::clone(jar), domain));

        let mut store = Self {
            prefix: sanitize(&config.name),
            config,
            cache: HashMap::new(),
            events,
            ready: Arc::new(ReadyLatch::new()),
            durable,
            cookie_mirror,
            units,
            default_expiry_secs,
        };
        store.rehydrate(ready_hook).await;
        Ok(store)
    }

    // == Rehydration ==
    /// Drains the durable backend into the memory cache, then fires `ready`
    /// exactly once, whichever path (success or failure) finishes first.
    async fn rehydrate(&mut self, mut ready_hook: Option<ReadyHook>) {
        self.ready.begin();

        if let Err(err) = self.drain_durable().await {
            warn!(store = %self.config.name, %err, "rehydration failed");
            self.events.emit(&Event::error(err, None));
        }

        if self.ready.fire() {
            info!(
                store = %self.config.name,
                entries = self.cache.len(),
                "store ready"
            );
            self.events.emit(&Event::Ready);
            if let Some(hook) = ready_hook.take() {
                hook();
            }
        }
    }

    async fn drain_durable(&mut self) -> Result<()> {
        let Some(backend) = self.durable.clone() else {
            return Ok(());
        };
        // Cookies have no enumerable listing usable here
        if backend.kind() == BackendKind::Cookie {
            return Ok(());
        }

        backend.prepare().settle().await?;
        let entries = backend.read_all().settle().await?;

        for (physical_key, text) in entries {
            let Some(logical) = physical_key.strip_prefix(&self.prefix) else {
                continue;
            };
            let logical = logical.to_string();
            match codec::decode(&text) {
                Ok(value) if !is_falsy(&value) => {
                    // Re-setting re-validates and re-persists the entry
                    self.set(&logical, value);
                }
                Ok(_) => {}
                Err(err) => {
                    self.events.emit(&Event::error(err, Some(text)));
                }
            }
        }
        Ok(())
    }

    // == Set ==
    /// Stores a value under a key with the store's default expiry.
    ///
    /// Returns the stored value immediately (the memory cache is updated
    /// before this returns), or `None` when the value is falsy — the falsy
    /// family (null, false, zero, empty string) cannot be stored; this is a
    /// deliberate restriction, not an error.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Option<Value> {
        self.set_with(key, value, SetOptions::default(), None)
    }

    /// Stores a value with per-write options and an optional completion
    /// callback.
    ///
    /// The durable mirror may still be in flight when this returns; the
    /// callback fires once it settles (immediately when there is no durable
    /// backend). A falsy value returns `None` without mutating anything and
    /// without invoking the callback.
    pub fn set_with(
        &mut self,
        key: &str,
        value: impl Into<Value>,
        options: SetOptions,
        callback: Option<SetCallback>,
    ) -> Option<Value> {
        let value = value.into();
        if is_falsy(&value) {
            debug!(key, "falsy value rejected");
            return None;
        }

        // A bad per-write duration falls back to the default expiry and
        // skips the durable mirror for this write.
        let mut mirror_durable = true;
        let expiry_secs = match options.expires {
            Some(spec) => match spec.resolve(&self.units) {
                Ok(secs) => secs,
                Err(err) => {
                    warn!(key, %err, "bad duration, entry kept under default expiry");
                    self.events.emit(&Event::error(err, Some(key.to_string())));
                    mirror_durable = false;
                    self.default_expiry_secs
                }
            },
            None => self.default_expiry_secs,
        };
        let expires_at = compute_expiry(current_timestamp_ms(), expiry_secs);

        let text = match codec::encode(&value) {
            Ok(text) => text,
            Err(err) => {
                self.events.emit(&Event::error(err, Some(key.to_string())));
                return None;
            }
        };

        let physical_key = self.physical_key(key);
        self.cache
            .insert(physical_key.clone(), CacheEntry::new(value.clone(), expires_at));

        self.mirror_cookie_write(&physical_key, &text, expires_at);
        if mirror_durable {
            self.mirror_durable_write(&physical_key, &text, expires_at, callback, value.clone());
        } else if let Some(cb) = callback {
            cb(None);
        }

        debug!(key, "set");
        self.events.emit(&Event::Set {
            key: key.to_string(),
            value: value.clone(),
        });
        Some(value)
    }

    /// Stores any serializable value through the JSON data model.
    ///
    /// # Errors
    /// Returns [`StoreError::Codec`] when the value cannot be represented
    /// as JSON.
    pub fn set_typed<T: Serialize>(&mut self, key: &str, value: &T) -> Result<Option<Value>> {
        Ok(self.set(key, serde_json::to_value(value)?))
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Memory-first; on a miss, falls back to a synchronous point read of
    /// the durable backend (or the cookie jar), caching what it finds under
    /// the default expiry. An expired entry is purged — including its
    /// durable mirrors — and read as absent.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        let physical_key = self.physical_key(key);

        match self.cache.get(&physical_key) {
            Some(entry) if entry.is_expired() => {
                debug!(key, "entry expired, purging");
                self.remove(key);
                None
            }
            Some(entry) => {
                let value = entry.value.clone();
                self.events.emit(&Event::Get {
                    key: key.to_string(),
                    value: Some(value.clone()),
                });
                Some(value)
            }
            None => {
                let value = self.fallback_read(&physical_key)?;
                let expires_at =
                    compute_expiry(current_timestamp_ms(), self.default_expiry_secs);
                self.cache
                    .insert(physical_key, CacheEntry::new(value.clone(), expires_at));
                self.events.emit(&Event::Get {
                    key: key.to_string(),
                    value: Some(value.clone()),
                });
                Some(value)
            }
        }
    }

    /// Retrieves a value, or the given default when the key is absent.
    pub fn get_or(&mut self, key: &str, default: impl Into<Value>) -> Value {
        match self.get(key) {
            Some(value) => value,
            None => {
                let default = default.into();
                self.events.emit(&Event::Get {
                    key: key.to_string(),
                    value: Some(default.clone()),
                });
                default
            }
        }
    }

    /// Retrieves a value and hands it to a completion callback as well as
    /// returning it.
    pub fn get_with(&mut self, key: &str, callback: impl FnOnce(Option<Value>)) -> Option<Value> {
        let value = self.get(key);
        callback(value.clone());
        value
    }

    /// Reads a value back as a concrete type. A value that does not convert
    /// emits an `Error` event and reads as absent.
    pub fn get_typed<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(err) => {
                self.events
                    .emit(&Event::error(StoreError::Codec(err), Some(key.to_string())));
                None
            }
        }
    }

    // == Remove ==
    /// Removes a key from the memory cache and issues mirrored deletes.
    ///
    /// Always returns `true`: local removal cannot fail, and a durable
    /// mirror failure is reported only through the `Error` event and the
    /// callback argument, never the return value.
    pub fn remove(&mut self, key: &str) -> bool {
        self.remove_with(key, None)
    }

    /// Like [`Store::remove`], with a completion callback fired once the
    /// durable mirror delete settles.
    pub fn remove_with(&mut self, key: &str, callback: Option<RemoveCallback>) -> bool {
        let physical_key = self.physical_key(key);
        self.cache.remove(&physical_key);

        self.mirror_cookie_delete(&physical_key);

        match &self.durable {
            Some(backend) => {
                let events = Arc::clone(&self.events);
                let context = physical_key.clone();
                match backend.delete(&physical_key) {
                    Outcome::Done(result) => settle_delete(result, &events, context, callback),
                    Outcome::Pending(completion) => {
                        tokio::spawn(async move {
                            settle_delete(completion.await, &events, context, callback);
                        });
                    }
                }
            }
            None => {
                if let Some(cb) = callback {
                    cb(true);
                }
            }
        }

        debug!(key, "remove");
        self.events.emit(&Event::Remove {
            key: key.to_string(),
        });
        true
    }

    /// Removes every cached key in this store's namespace.
    ///
    /// The callback fires exactly once, after each individual removal has
    /// signaled completion (the order of those completions is unspecified).
    /// There are no timeouts: a durable delete that never settles leaves
    /// the callback permanently pending.
    pub fn remove_all(&mut self, callback: Option<RemoveAllCallback>) {
        let keys: Vec<String> = self
            .cache
            .keys()
            .filter_map(|physical| physical.strip_prefix(&self.prefix))
            .map(str::to_string)
            .collect();

        if keys.is_empty() {
            if let Some(cb) = callback {
                cb();
            }
            return;
        }

        let latch = CompletionLatch::new(keys.len(), callback);
        for key in keys {
            let latch = latch.clone();
            self.remove_with(&key, Some(Box::new(move |_| latch.arrive())));
        }
    }

    // == Events ==
    /// Subscribes a handler to an event kind. Handlers run synchronously at
    /// emit time, in registration order.
    pub fn on(&self, kind: EventKind, handler: impl Fn(&Event) + Send + Sync + 'static) {
        self.events.on(kind, handler);
    }

    // == Accessors ==
    /// Whether the one-shot `ready` signal has fired.
    pub fn is_ready(&self) -> bool {
        self.ready.is_ready()
    }

    /// The store's namespace name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// The kind of durable backend selected at open, if any.
    pub fn durable_kind(&self) -> Option<BackendKind> {
        self.durable.as_ref().map(|backend| backend.kind())
    }

    /// Number of entries currently in the memory cache.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether the memory cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    // == Internals ==
    fn physical_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, sanitize(key))
    }

    /// Synchronous memory-miss fallback: durable point read first, then the
    /// cookie jar. Falsy or undecodable payloads read as absent.
    fn fallback_read(&self, physical_key: &str) -> Option<Value> {
        let text = self
            .durable
            .as_ref()
            .and_then(|backend| backend.read_sync(physical_key))
            .or_else(|| {
                self.cookie_mirror
                    .as_ref()
                    .and_then(|cookie| cookie.read_sync(physical_key))
            })?;

        match codec::decode(&text) {
            Ok(value) if !is_falsy(&value) => Some(value),
            Ok(_) => None,
            Err(err) => {
                self.events
                    .emit(&Event::error(err, Some(physical_key.to_string())));
                None
            }
        }
    }

    /// Whether the cookie jar needs a separate mirror write (it does not
    /// when the cookie backend is itself the selected durable backend).
    fn cookie_is_durable(&self) -> bool {
        matches!(self.durable_kind(), Some(BackendKind::Cookie))
    }

    fn mirror_cookie_write(&self, physical_key: &str, text: &str, expires_at: u64) {
        if self.cookie_is_durable() {
            return;
        }
        if let Some(cookie) = &self.cookie_mirror {
            if let Outcome::Done(Err(err)) = cookie.write(physical_key, text, expires_at) {
                self.events
                    .emit(&Event::error(err, Some(physical_key.to_string())));
            }
        }
    }

    fn mirror_cookie_delete(&self, physical_key: &str) {
        if self.cookie_is_durable() {
            return;
        }
        if let Some(cookie) = &self.cookie_mirror {
            if let Outcome::Done(Err(err)) = cookie.delete(physical_key) {
                self.events
                    .emit(&Event::error(err, Some(physical_key.to_string())));
            }
        }
    }

    fn mirror_durable_write(
        &self,
        physical_key: &str,
        text: &str,
        expires_at: u64,
        callback: Option<SetCallback>,
        value: Value,
    ) {
        let Some(backend) = &self.durable else {
            if let Some(cb) = callback {
                cb(Some(value));
            }
            return;
        };

        let events = Arc::clone(&self.events);
        let context = physical_key.to_string();
        match backend.write(physical_key, text, expires_at) {
            Outcome::Done(result) => settle_write(result, &events, context, callback, value),
            Outcome::Pending(completion) => {
                tokio::spawn(async move {
                    settle_write(completion.await, &events, context, callback, value);
                });
            }
        }
    }
}

// == Mirror Settlement ==
fn settle_write(
    result: Result<()>,
    events: &EventBus,
    context: String,
    callback: Option<SetCallback>,
    value: Value,
) {
    match result {
        Ok(()) => {
            if let Some(cb) = callback {
                cb(Some(value));
            }
        }
        Err(err) => {
            warn!(key = %context, %err, "durable mirror write failed");
            events.emit(&Event::error(err, Some(context)));
            if let Some(cb) = callback {
                cb(None);
            }
        }
    }
}

fn settle_delete(
    result: Result<()>,
    events: &EventBus,
    context: String,
    callback: Option<RemoveCallback>,
) {
    match result {
        Ok(()) => {
            if let Some(cb) = callback {
                cb(true);
            }
        }
        Err(err) => {
            warn!(key = %context, %err, "durable mirror delete failed");
            events.emit(&Event::error(err, Some(context)));
            if let Some(cb) = callback {
                cb(false);
            }
        }
    }
}

// == Completion Latch ==
/// Pending-count latch for `remove_all`: the final callback fires when the
/// last individual completion arrives.
#[derive(Clone)]
struct CompletionLatch {
    inner: Arc<LatchInner>,
}

struct LatchInner {
    remaining: AtomicUsize,
    callback: Mutex<Option<RemoveAllCallback>>,
}

impl CompletionLatch {
    fn new(count: usize, callback: Option<RemoveAllCallback>) -> Self {
        Self {
            inner: Arc::new(LatchInner {
                remaining: AtomicUsize::new(count),
                callback: Mutex::new(callback),
            }),
        }
    }

    fn arrive(&self) {
        if self.inner.remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
            let callback = self
                .inner
                .callback
                .lock()
                .expect("completion latch poisoned")
                .take();
            if let Some(cb) = callback {
                cb();
            }
        }
    }
}

// == Key Sanitization ==
/// Strips characters outside `[A-Za-z0-9_]` so physical keys survive
/// attribute-delimited wire formats. Applied to both the namespace prefix
/// and the logical key, which keeps prefix-stripping recovery exact for
/// word-character keys.
pub(crate) fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}
