//! Cookie Backend
//!
//! Last-resort durable medium. Each entry round-trips through a single
//! HTTP-style attribute string; deletion is a rewrite with an already
//! expired date, because the medium has no delete primitive.

use std::sync::Arc;

use tracing::debug;

use crate::backend::{BackendAdapter, BackendKind, Outcome};
use crate::platform::{http_date, CookieJar};

/// Serialized values at or above this length are not persisted to cookies.
///
/// Other backends still receive the full value; the gate exists because
/// whole-jar size limits are tiny and one oversized entry can evict
/// unrelated cookies.
pub const COOKIE_VALUE_LIMIT: usize = 128;

const PROBE_KEY: &str = "durablecacheprobe";
const EPOCH_DATE: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

// == Cookie Backend ==
/// [`BackendAdapter`] over an HTTP-style cookie jar.
pub struct CookieBackend {
    jar: Arc<dyn CookieJar>,
    domain: String,
}

impl CookieBackend {
    pub fn new(jar: Arc<dyn CookieJar>, domain: String) -> Self {
        Self { jar, domain }
    }

    fn attribute_string(&self, key: &str, value: &str, expires: &str) -> String {
        format!(
            "{key}={value}; expires={expires}; domain={domain}; path=/",
            domain = self.domain
        )
    }

    /// Scans the jar's cookie string for a key, tolerating the optional
    /// space after each separator.
    fn scan(&self, physical_key: &str) -> Option<String> {
        let cookies = self.jar.read();
        for cookie in cookies.split(';') {
            let cookie = cookie.trim_start();
            if let Some(value) = cookie.strip_prefix(physical_key) {
                if let Some(value) = value.strip_prefix('=') {
                    return Some(value.to_string());
                }
            }
        }
        None
    }
}

impl BackendAdapter for CookieBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Cookie
    }

    /// Round-trips a short-lived test cookie; some environments expose a
    /// jar that silently drops writes.
    fn probe(&self) -> bool {
        let expires = http_date(crate::expiry::current_timestamp_ms() + 60_000);
        self.jar
            .write(&self.attribute_string(PROBE_KEY, "1", &expires));
        let supported = self.scan(PROBE_KEY).is_some();
        self.jar
            .write(&self.attribute_string(PROBE_KEY, "", EPOCH_DATE));
        supported
    }

    fn read_sync(&self, physical_key: &str) -> Option<String> {
        self.scan(physical_key)
    }

    /// Cookies are never enumerated for rehydration.
    fn read_all(&self) -> Outcome<Vec<(String, String)>> {
        Outcome::Done(Ok(Vec::new()))
    }

    fn write(&self, physical_key: &str, text: &str, expires_at_ms: u64) -> Outcome<()> {
        if text.len() >= COOKIE_VALUE_LIMIT {
            debug!(key = physical_key, len = text.len(), "value too long for cookie, skipped");
            return Outcome::Done(Ok(()));
        }
        let expires = http_date(expires_at_ms);
        self.jar
            .write(&self.attribute_string(physical_key, text, &expires));
        Outcome::Done(Ok(()))
    }

    fn delete(&self, physical_key: &str) -> Outcome<()> {
        self.jar
            .write(&self.attribute_string(physical_key, "", EPOCH_DATE));
        Outcome::Done(Ok(()))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::expiry::current_timestamp_ms;
    use crate::platform::MemoryCookieJar;

    fn backend() -> (Arc<MemoryCookieJar>, CookieBackend) {
        let jar = Arc::new(MemoryCookieJar::new());
        let backend = CookieBackend::new(jar.clone(), "example.com".to_string());
        (jar, backend)
    }

    #[test]
    fn test_probe_cleans_up_after_itself() {
        let (jar, backend) = backend();
        assert!(backend.probe());
        assert!(jar.is_empty());
    }

    #[tokio::test]
    async fn test_write_and_read_sync() {
        let (_, backend) = backend();
        let expires = current_timestamp_ms() + 60_000;
        backend.write("sk", "hello", expires).settle().await.unwrap();

        assert_eq!(backend.read_sync("sk").as_deref(), Some("hello"));
        assert_eq!(backend.read_sync("missing"), None);
    }

    #[tokio::test]
    async fn test_long_values_are_skipped() {
        let (jar, backend) = backend();
        let long = "x".repeat(COOKIE_VALUE_LIMIT);
        let expires = current_timestamp_ms() + 60_000;
        backend.write("sk", &long, expires).settle().await.unwrap();

        assert!(jar.is_empty());
        assert_eq!(backend.read_sync("sk"), None);
    }

    #[tokio::test]
    async fn test_delete_rewrites_with_expired_date() {
        let (jar, backend) = backend();
        let expires = current_timestamp_ms() + 60_000;
        backend.write("sk", "v", expires).settle().await.unwrap();
        assert_eq!(jar.len(), 1);

        backend.delete("sk").settle().await.unwrap();
        assert!(jar.is_empty());
    }

    #[test]
    fn test_read_all_is_empty() {
        let (_, backend) = backend();
        match backend.read_all() {
            Outcome::Done(result) => assert!(result.unwrap().is_empty()),
            Outcome::Pending(_) => panic!("cookie read_all should settle synchronously"),
        }
    }
}
