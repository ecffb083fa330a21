//! Short-lived read cache for the invoice list and the statistics.
//!
//! Entries are stored as `{t, v}` (`t` = write time in epoch millis) and are
//! considered fresh while `now - t <= ttl`. Every I/O or decode failure is
//! logged and treated as a miss: the cache never fails a caller.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use api_types::stats::Statistics;
use engine::Invoice;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::config::CacheConfig;

/// Key/value storage behind [`LocalCache`].
pub trait Cache: Send + Sync {
    /// Fresh value for `key`, if any.
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value);
    fn delete(&self, key: &str);
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Entry {
    t: i64,
    v: Value,
}

impl Entry {
    fn stamped(value: Value) -> Self {
        Self {
            t: now_ms(),
            v: value,
        }
    }

    fn is_fresh(&self, ttl: Duration) -> bool {
        let age = now_ms().saturating_sub(self.t);
        age <= i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Cache kept in process memory only.
#[derive(Debug)]
pub struct MemoryCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|entry| entry.is_fresh(self.ttl))
            .map(|entry| entry.v.clone())
    }

    fn set(&self, key: &str, value: Value) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), Entry::stamped(value));
    }

    fn delete(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
    }
}

/// Cache persisted as one JSON object on disk, keyed like the entries.
#[derive(Debug)]
pub struct FileCache {
    path: PathBuf,
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl FileCache {
    pub fn open(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        let path = path.into();
        let entries = read_json_file(&path).unwrap_or_default();
        Self {
            path,
            ttl,
            entries: Mutex::new(entries),
        }
    }

    fn persist(&self, entries: &HashMap<String, Entry>) {
        if let Err(err) = write_json_file(&self.path, entries) {
            tracing::debug!("cache write to {} failed: {err}", self.path.display());
        }
    }
}

impl Cache for FileCache {
    fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|entry| entry.is_fresh(self.ttl))
            .map(|entry| entry.v.clone())
    }

    fn set(&self, key: &str, value: Value) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), Entry::stamped(value));
        self.persist(&entries);
    }

    fn delete(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.remove(key).is_some() {
            self.persist(&entries);
        }
    }
}

fn read_json_file(path: &Path) -> Option<HashMap<String, Entry>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::debug!("cache file {} not loaded: {err}", path.display());
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(entries) => Some(entries),
        Err(err) => {
            tracing::debug!("cache file {} unreadable: {err}", path.display());
            None
        }
    }
}

fn write_json_file(path: &Path, entries: &HashMap<String, Entry>) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string(entries).map_err(std::io::Error::other)?;

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json)?;
    match fs::rename(&tmp, path) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(&tmp, path)?;
            let _ = fs::remove_file(&tmp);
            Ok(())
        }
    }
}

/// Typed front of a [`Cache`] that knows the two application keys.
#[derive(Clone)]
pub struct LocalCache {
    backend: Arc<dyn Cache>,
    enabled: bool,
    invoices_key: String,
    stats_key: String,
}

impl std::fmt::Debug for LocalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCache")
            .field("enabled", &self.enabled)
            .field("invoices_key", &self.invoices_key)
            .field("stats_key", &self.stats_key)
            .finish_non_exhaustive()
    }
}

impl LocalCache {
    pub fn new(backend: Arc<dyn Cache>, config: &CacheConfig) -> Self {
        Self {
            backend,
            enabled: config.enabled,
            invoices_key: config.invoices_key.clone(),
            stats_key: config.stats_key.clone(),
        }
    }

    /// File-backed cache as described by `config`.
    pub fn from_config(config: &CacheConfig) -> Self {
        let ttl = Duration::from_secs(config.ttl_secs);
        let backend: Arc<dyn Cache> = if config.enabled {
            Arc::new(FileCache::open(&config.path, ttl))
        } else {
            Arc::new(MemoryCache::new(ttl))
        };
        Self::new(backend, config)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        if !self.enabled {
            return None;
        }
        self.backend.get(key)
    }

    pub fn set(&self, key: &str, value: Value) {
        if self.enabled {
            self.backend.set(key, value);
        }
    }

    pub fn delete(&self, key: &str) {
        self.backend.delete(key);
    }

    /// Drops both application entries.
    pub fn clear_all(&self) {
        self.delete(&self.invoices_key);
        self.delete(&self.stats_key);
    }

    pub fn invoices(&self) -> Option<Vec<Invoice>> {
        self.get_typed(&self.invoices_key)
    }

    pub fn store_invoices(&self, invoices: &[Invoice]) {
        self.set_typed(&self.invoices_key, invoices);
    }

    pub fn forget_invoices(&self) {
        self.delete(&self.invoices_key);
    }

    pub fn stats(&self) -> Option<Statistics> {
        self.get_typed(&self.stats_key)
    }

    pub fn store_stats(&self, stats: &Statistics) {
        self.set_typed(&self.stats_key, stats);
    }

    fn get_typed<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(typed) => {
                tracing::debug!("cache hit {key}");
                Some(typed)
            }
            Err(err) => {
                tracing::debug!("cache entry {key} ignored: {err}");
                None
            }
        }
    }

    fn set_typed<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        if !self.enabled {
            return;
        }
        match serde_json::to_value(value) {
            Ok(value) => self.set(key, value),
            Err(err) => tracing::debug!("cache entry {key} not stored: {err}"),
        }
    }
}
