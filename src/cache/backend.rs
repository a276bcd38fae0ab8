use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Result, SearchError};

use super::CacheKey;

/// Key-value store behind the memoizer.
///
/// Values are opaque encoded bytes. `put` on an existing key must leave
/// the stored value untouched.
pub trait CacheBackend: Send + Sync {
    /// Stored bytes for a key, if any.
    fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>>;

    /// Store bytes unless the key already exists.
    fn put(&self, key: &CacheKey, value: &[u8]) -> Result<()>;

    /// Whether the key has been written.
    fn contains(&self, key: &CacheKey) -> Result<bool>;

    /// Backend type name, for logs.
    fn backend_type(&self) -> &'static str;
}

/// In-process cache; lives as long as the value.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<CacheKey, Vec<u8>>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    ///
    /// # Errors
    ///
    /// `Cache` if the lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(self.entries.read().map_err(poisoned)?.len())
    }

    /// # Errors
    ///
    /// `Cache` if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl CacheBackend for MemoryCache {
    fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().map_err(poisoned)?.get(key).cloned())
    }

    fn put(&self, key: &CacheKey, value: &[u8]) -> Result<()> {
        self.entries
            .write()
            .map_err(poisoned)?
            .entry(key.clone())
            .or_insert_with(|| value.to_vec());
        Ok(())
    }

    fn contains(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.entries.read().map_err(poisoned)?.contains_key(key))
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}

fn poisoned<T>(err: std::sync::PoisonError<T>) -> SearchError {
    SearchError::Cache {
        message: format!("cache lock poisoned: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::fingerprint;

    fn key(op: &str, n: u32) -> CacheKey {
        CacheKey::new(op, "cache-v1", fingerprint(&n).expect("encode"))
    }

    #[test]
    fn test_memory_cache_put_get() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get(&key("a", 1)).expect("get"), None);

        cache.put(&key("a", 1), b"one").expect("put");
        assert_eq!(cache.get(&key("a", 1)).expect("get"), Some(b"one".to_vec()));
        assert!(cache.contains(&key("a", 1)).expect("contains"));
        assert!(!cache.contains(&key("b", 1)).expect("contains"));
    }

    #[test]
    fn test_memory_cache_never_overwrites() {
        let cache = MemoryCache::new();
        cache.put(&key("a", 1), b"first").expect("put");
        cache.put(&key("a", 1), b"second").expect("put");
        assert_eq!(cache.get(&key("a", 1)).expect("get"), Some(b"first".to_vec()));
        assert_eq!(cache.len().expect("len"), 1);
    }

    #[test]
    fn test_memory_cache_version_is_part_of_key() {
        let cache = MemoryCache::new();
        let fp = fingerprint(&7u32).expect("encode");
        cache.put(&CacheKey::new("a", "cache-v1", fp.clone()), b"v1").expect("put");
        assert!(!cache.contains(&CacheKey::new("a", "cache-v2", fp)).expect("contains"));
    }
}
