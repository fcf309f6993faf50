//! Cache handler
//!
//! Key/value cache in front of two backends: an optional in-process object
//! cache and a file-backed transient store with explicit expiry. Backend
//! failures are logged and treated as misses; nothing here returns an error.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Namespace prepended to every transient name
pub const CACHE_PREFIX: &str = "wp_site_analyzer_";

/// Default lifetime of a cache entry in seconds
pub const DEFAULT_TTL: u64 = 3600;

/// Longest transient name the store accepts, prefix included
const MAX_KEY_LENGTH: usize = 172;

/// Length of a hashed key in hex characters
const HASHED_KEY_LENGTH: usize = 32;

const TRANSIENT_DIR: &str = "transients";

/// Normalize a cache key.
///
/// Empty keys become `default`, characters outside `[A-Za-z0-9_-]` become `_`,
/// and keys that would exceed the transient name limit once prefixed are
/// replaced by a 32 character hex digest. Applying it twice changes nothing.
pub fn sanitize_key(key: &str) -> String {
    let key = if key.is_empty() { "default" } else { key };

    let sanitized: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if CACHE_PREFIX.len() + sanitized.len() > MAX_KEY_LENGTH {
        let digest = hex::encode(Sha256::digest(sanitized.as_bytes()));
        digest[..HASHED_KEY_LENGTH].to_string()
    } else {
        sanitized
    }
}

/// In-process cache with per-entry expiry
#[derive(Debug, Default)]
pub struct ObjectCache {
    entries: Mutex<HashMap<String, (Value, Option<Instant>)>>,
}

impl ObjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let expired = matches!(
            entries.get(key),
            Some((_, Some(deadline))) if *deadline <= Instant::now()
        );
        if expired {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|(value, _)| value.clone())
    }

    fn set(&self, key: &str, value: Value, ttl: u64) -> bool {
        // A deadline past what Instant can represent never expires
        let deadline = (ttl > 0)
            .then(|| Instant::now().checked_add(Duration::from_secs(ttl)))
            .flatten();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), (value, deadline));
        true
    }

    fn delete(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key).is_some()
    }

    fn flush(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }
}

/// A stored transient; `expires_at` of 0 never expires
#[derive(Debug, Serialize, Deserialize)]
struct TransientRecord {
    expires_at: i64,
    value: Value,
}

/// Persistent transients, one JSON file per key
#[derive(Debug, Clone)]
pub struct TransientStore {
    dir: PathBuf,
}

impl TransientStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            dir: data_dir.join(TRANSIENT_DIR),
        }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        let path = self.path_for(name);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("failed to read transient {}: {}", name, e);
                }
                return None;
            }
        };

        let record: TransientRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("discarding corrupt transient {}: {}", name, e);
                return None;
            }
        };

        if record.expires_at != 0 && record.expires_at <= chrono::Utc::now().timestamp() {
            tracing::debug!(transient = name, "transient expired");
            let _ = std::fs::remove_file(&path);
            return None;
        }

        Some(record.value)
    }

    pub fn set(&self, name: &str, value: Value, ttl: u64) -> bool {
        // An expiry past i64 seconds is stored as 0, which never expires
        let expires_at = i64::try_from(ttl)
            .ok()
            .filter(|ttl| *ttl > 0)
            .and_then(|ttl| chrono::Utc::now().timestamp().checked_add(ttl))
            .unwrap_or(0);
        let record = TransientRecord { expires_at, value };

        let write = || -> std::io::Result<()> {
            std::fs::create_dir_all(&self.dir)?;
            let json = serde_json::to_vec(&record).map_err(std::io::Error::other)?;
            // Concurrent writers each rename a complete file; last rename wins
            let tmp = self.dir.join(format!(
                ".{}.{:?}.tmp",
                name,
                std::thread::current().id()
            ));
            std::fs::write(&tmp, json)?;
            std::fs::rename(&tmp, self.path_for(name))
        };

        match write() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("failed to write transient {}: {}", name, e);
                false
            }
        }
    }

    pub fn delete(&self, name: &str) -> bool {
        std::fs::remove_file(self.path_for(name)).is_ok()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Names of stored transients starting with `prefix`
    fn names_with_prefix(&self, prefix: &str) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                name.strip_suffix(".json").map(str::to_string)
            })
            .filter(|name| name.starts_with(prefix))
            .collect()
    }
}

/// Backend summary reported by cache diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub cache_type: String,
    pub cache_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transient_count: Option<usize>,
}

/// Cache handler choosing between the object cache and transients
#[derive(Debug)]
pub struct CacheHandler {
    object_cache: Option<ObjectCache>,
    transients: TransientStore,
    enabled: bool,
    default_ttl: u64,
}

impl CacheHandler {
    /// Create a handler storing transients under `data_dir`
    pub fn new(data_dir: &Path) -> Self {
        Self {
            object_cache: None,
            transients: TransientStore::new(data_dir),
            enabled: true,
            default_ttl: DEFAULT_TTL,
        }
    }

    /// Put an in-process object cache in front of the transient store
    pub fn with_object_cache(mut self, enabled: bool) -> Self {
        self.object_cache = enabled.then(ObjectCache::new);
        self
    }

    /// Record the `enable_caching` setting reported by [`CacheHandler::stats`]
    pub fn with_caching_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn uses_object_cache(&self) -> bool {
        self.object_cache.is_some()
    }

    /// Full transient name for a key
    pub fn transient_name(key: &str) -> String {
        format!("{}{}", CACHE_PREFIX, sanitize_key(key))
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let key = sanitize_key(key);

        if let Some(object_cache) = &self.object_cache
            && let Some(value) = object_cache.get(&key)
        {
            return Some(value);
        }

        let value = self.transients.get(&format!("{}{}", CACHE_PREFIX, key));
        if value.is_none() {
            tracing::debug!(key = %key, "cache miss");
        }
        value
    }

    /// Typed read; a value that does not deserialize counts as a miss
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                tracing::warn!("cached value for {} has unexpected shape: {}", key, e);
                None
            }
        }
    }

    /// Store a value; `ttl` of `None` uses the default lifetime
    pub fn set(&self, key: &str, value: Value, ttl: Option<u64>) -> bool {
        let key = sanitize_key(key);
        let ttl = ttl.unwrap_or(self.default_ttl);

        if let Some(object_cache) = &self.object_cache {
            let stored = object_cache.set(&key, value, ttl);
            tracing::debug!(key = %key, ttl, stored, "set in object cache");
            return stored;
        }

        let name = format!("{}{}", CACHE_PREFIX, key);
        let stored = self.transients.set(&name, value, ttl);
        tracing::debug!(transient = %name, ttl, stored, "set transient");
        stored
    }

    pub fn set_as<T: Serialize>(&self, key: &str, value: &T, ttl: Option<u64>) -> bool {
        match serde_json::to_value(value) {
            Ok(value) => self.set(key, value, ttl),
            Err(e) => {
                tracing::warn!("failed to serialize cache value for {}: {}", key, e);
                false
            }
        }
    }

    pub fn delete(&self, key: &str) -> bool {
        let key = sanitize_key(key);
        if let Some(object_cache) = &self.object_cache {
            object_cache.delete(&key);
        }
        self.transients.delete(&format!("{}{}", CACHE_PREFIX, key))
    }

    /// Return the cached value or compute, store and return it.
    ///
    /// Not atomic: concurrent callers that both miss will both compute, and
    /// the last write wins.
    pub fn remember<F>(&self, key: &str, compute: F, ttl: Option<u64>) -> Value
    where
        F: FnOnce() -> Value,
    {
        if let Some(value) = self.get(key) {
            return value;
        }
        let value = compute();
        self.set(key, value.clone(), ttl);
        value
    }

    /// Drop every entry in the analyzer namespace
    pub fn clear_all(&self) -> bool {
        if let Some(object_cache) = &self.object_cache {
            object_cache.flush();
        }
        for name in self.transients.names_with_prefix(CACHE_PREFIX) {
            self.transients.delete(&name);
        }
        true
    }

    pub fn stats(&self) -> CacheStats {
        let using_object_cache = self.uses_object_cache();
        CacheStats {
            cache_type: if using_object_cache {
                "object_cache"
            } else {
                "transients"
            }
            .to_string(),
            cache_enabled: self.enabled,
            transient_count: (!using_object_cache)
                .then(|| self.transients.names_with_prefix(CACHE_PREFIX).len()),
        }
    }

    /// Whether a transient exists for the key, ignoring the object cache
    pub fn transient_exists(&self, key: &str) -> bool {
        self.transients.exists(&Self::transient_name(key))
    }

    pub fn get_multiple(&self, keys: &[&str]) -> Vec<(String, Option<Value>)> {
        keys.iter()
            .map(|key| (key.to_string(), self.get(key)))
            .collect()
    }

    pub fn set_multiple(&self, entries: Vec<(String, Value)>, ttl: Option<u64>) -> Vec<(String, bool)> {
        entries
            .into_iter()
            .map(|(key, value)| {
                let stored = self.set(&key, value, ttl);
                (key, stored)
            })
            .collect()
    }

    pub fn delete_multiple(&self, keys: &[&str]) -> Vec<(String, bool)> {
        keys.iter()
            .map(|key| (key.to_string(), self.delete(key)))
            .collect()
    }

    /// Add `offset` to a numeric entry, treating a miss as 0.
    /// Returns `None` when the stored value is not numeric.
    pub fn increment(&self, key: &str, offset: i64) -> Option<i64> {
        let current = match self.get(key) {
            None => 0,
            Some(value) => numeric_value(&value)?,
        };
        let updated = current.saturating_add(offset);
        self.set(key, Value::from(updated), None);
        Some(updated)
    }

    pub fn decrement(&self, key: &str, offset: i64) -> Option<i64> {
        self.increment(key, offset.saturating_neg())
    }
}

fn numeric_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn handler() -> (tempfile::TempDir, CacheHandler) {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheHandler::new(dir.path());
        (dir, cache)
    }

    #[test]
    fn sanitize_replaces_disallowed_characters() {
        assert_eq!(sanitize_key("scan results/v2"), "scan_results_v2");
        assert_eq!(sanitize_key("post-types_1"), "post-types_1");
        assert_eq!(sanitize_key(""), "default");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let long = "x".repeat(400);
        for key in ["scan_results", "a b:c", "", long.as_str()] {
            let once = sanitize_key(key);
            assert_eq!(sanitize_key(&once), once);
        }
    }

    #[test]
    fn overlong_keys_hash_to_fixed_length() {
        let first = sanitize_key(&"a".repeat(200));
        let second = sanitize_key(&"b".repeat(200));
        assert_eq!(first.len(), 32);
        assert_eq!(second.len(), 32);
        assert_ne!(first, second);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn boundary_length_is_not_hashed() {
        let fits = "k".repeat(MAX_KEY_LENGTH - CACHE_PREFIX.len());
        assert_eq!(sanitize_key(&fits), fits);
        let over = "k".repeat(MAX_KEY_LENGTH - CACHE_PREFIX.len() + 1);
        assert_eq!(sanitize_key(&over).len(), 32);
    }

    #[test]
    fn set_get_delete_through_transients() {
        let (_dir, cache) = handler();
        assert!(cache.get("scan_results").is_none());
        assert!(cache.set("scan_results", json!({"a": 1}), Some(60)));
        assert_eq!(cache.get("scan_results"), Some(json!({"a": 1})));
        assert!(cache.transient_exists("scan_results"));
        assert!(cache.delete("scan_results"));
        assert!(cache.get("scan_results").is_none());
    }

    #[test]
    fn expired_transient_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = TransientStore::new(dir.path());
        let record = TransientRecord {
            expires_at: chrono::Utc::now().timestamp() - 10,
            value: json!("stale"),
        };
        std::fs::create_dir_all(dir.path().join(TRANSIENT_DIR)).unwrap();
        std::fs::write(
            store.path_for("wp_site_analyzer_old"),
            serde_json::to_string(&record).unwrap(),
        )
        .unwrap();
        assert!(store.get("wp_site_analyzer_old").is_none());
        assert!(!store.path_for("wp_site_analyzer_old").exists());
    }

    #[test]
    fn corrupt_transient_is_a_miss() {
        let (dir, cache) = handler();
        std::fs::create_dir_all(dir.path().join(TRANSIENT_DIR)).unwrap();
        std::fs::write(
            dir.path().join(TRANSIENT_DIR).join("wp_site_analyzer_bad.json"),
            "{not json",
        )
        .unwrap();
        assert!(cache.get("bad").is_none());
    }

    #[test]
    fn unwritable_store_degrades_to_false() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, "file, not a directory").unwrap();
        let cache = CacheHandler::new(&blocker);
        assert!(!cache.set("key", json!(1), None));
        assert!(cache.get("key").is_none());
    }

    #[test]
    fn object_cache_takes_precedence() {
        let (_dir, cache) = handler();
        assert!(!cache.uses_object_cache());
        let cache = cache.with_object_cache(true);
        assert!(cache.uses_object_cache());
        assert!(cache.set("k", json!("fast"), None));
        assert_eq!(cache.get("k"), Some(json!("fast")));
        // object cache writes never reach the transient store
        assert!(!cache.transient_exists("k"));
        assert_eq!(cache.stats().cache_type, "object_cache");
        assert_eq!(cache.stats().transient_count, None);
    }

    #[test]
    fn remember_computes_once_when_cached() {
        let (_dir, cache) = handler();
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            json!(42)
        };
        assert_eq!(cache.remember("answer", compute, None), json!(42));
        assert_eq!(cache.remember("answer", compute, None), json!(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_remember_both_compute() {
        let (_dir, cache) = handler();
        let barrier = Barrier::new(2);
        let calls = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for n in 0..2 {
                let cache = &cache;
                let barrier = &barrier;
                let calls = &calls;
                scope.spawn(move || {
                    cache.remember(
                        "race",
                        || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            // both callers have missed before either writes
                            barrier.wait();
                            json!(n)
                        },
                        None,
                    )
                });
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let winner = cache.get("race").unwrap();
        assert!(winner == json!(0) || winner == json!(1));
    }

    #[test]
    fn stats_and_clear_all() {
        let (_dir, cache) = handler();
        cache.set("one", json!(1), None);
        cache.set("two", json!(2), None);
        let stats = cache.stats();
        assert_eq!(stats.cache_type, "transients");
        assert!(stats.cache_enabled);
        assert_eq!(stats.transient_count, Some(2));

        assert!(cache.clear_all());
        assert_eq!(cache.stats().transient_count, Some(0));
    }

    #[test]
    fn multiple_operations_report_per_key() {
        let (_dir, cache) = handler();
        let stored = cache.set_multiple(
            vec![("a".to_string(), json!(1)), ("b".to_string(), json!(2))],
            None,
        );
        assert!(stored.iter().all(|(_, ok)| *ok));

        let values = cache.get_multiple(&["a", "missing"]);
        assert_eq!(values[0], ("a".to_string(), Some(json!(1))));
        assert_eq!(values[1], ("missing".to_string(), None));

        let deleted = cache.delete_multiple(&["a", "missing"]);
        assert_eq!(deleted, vec![("a".to_string(), true), ("missing".to_string(), false)]);
    }

    #[test]
    fn increment_and_decrement() {
        let (_dir, cache) = handler();
        assert_eq!(cache.increment("counter", 1), Some(1));
        assert_eq!(cache.increment("counter", 5), Some(6));
        assert_eq!(cache.decrement("counter", 2), Some(4));

        cache.set("numeric_text", json!("10"), None);
        assert_eq!(cache.increment("numeric_text", 1), Some(11));

        cache.set("word", json!("ten"), None);
        assert_eq!(cache.increment("word", 1), None);
    }

    #[test]
    fn huge_ttls_never_expire_in_transients() {
        let (dir, cache) = handler();
        for (key, ttl) in [("max_u64", u64::MAX), ("max_i64", i64::MAX as u64)] {
            assert!(cache.set(key, json!(key), Some(ttl)));
            assert_eq!(cache.get(key), Some(json!(key)));
            assert!(cache.transient_exists(key));
        }

        let store = TransientStore::new(dir.path());
        for key in ["max_u64", "max_i64"] {
            let raw =
                std::fs::read_to_string(store.path_for(&format!("{}{}", CACHE_PREFIX, key))).unwrap();
            let record: TransientRecord = serde_json::from_str(&raw).unwrap();
            assert_eq!(record.expires_at, 0);
        }
    }

    #[test]
    fn huge_ttls_never_expire_in_object_cache() {
        let (_dir, cache) = handler();
        let cache = cache.with_object_cache(true);
        for (key, ttl) in [("max_u64", u64::MAX), ("max_i64", i64::MAX as u64)] {
            assert!(cache.set(key, json!(key), Some(ttl)));
            assert_eq!(cache.get(key), Some(json!(key)));
        }
    }

    #[test]
    fn counters_saturate_instead_of_overflowing() {
        let (_dir, cache) = handler();
        cache.set("high", json!(i64::MAX), None);
        assert_eq!(cache.increment("high", 1), Some(i64::MAX));
        assert_eq!(cache.decrement("low", i64::MIN), Some(i64::MAX));
    }
}
