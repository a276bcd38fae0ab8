use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

use super::{CacheBackend, CacheConfig, CacheKey, Fingerprint};

/// Hit and miss counters for one memoizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups answered from the backend
    pub hits: u64,
    /// Lookups that ran the computation
    pub misses: u64,
}

impl CacheStats {
    /// Get hit rate (0.0 - 1.0)
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Runs computations at most once per cache key.
///
/// A memoizer without a backend (or built from a disabled
/// [`CacheConfig`]) always computes and counts nothing. Backend failures
/// and undecodable entries degrade to recomputation; errors from the
/// computation itself are returned and never stored.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use hypergrid::cache::{fingerprint, MemoryCache, Memoizer};
///
/// let memo = Memoizer::new(Arc::new(MemoryCache::new()));
/// let fp = fingerprint(&[1u32, 2, 3]).expect("encodable");
///
/// let mut calls = 0;
/// for _ in 0..3 {
///     let sum: u32 = memo
///         .memoize("sum", "cache-v1", &fp, || {
///             calls += 1;
///             Ok(6)
///         })
///         .expect("computes");
///     assert_eq!(sum, 6);
/// }
/// assert_eq!(calls, 1);
/// assert_eq!(memo.stats().hits, 2);
/// ```
#[derive(Clone, Default)]
pub struct Memoizer {
    backend: Option<Arc<dyn CacheBackend>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl std::fmt::Debug for Memoizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memoizer")
            .field("backend", &self.backend.as_ref().map(|b| b.backend_type()))
            .field("stats", &self.stats())
            .finish()
    }
}

impl Memoizer {
    /// Memoize through `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend: Some(backend),
            ..Self::default()
        }
    }

    /// A memoizer that always computes.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Honour the config switch; `backend` is ignored when disabled.
    #[must_use]
    pub fn from_config(config: &CacheConfig, backend: Option<Arc<dyn CacheBackend>>) -> Self {
        match backend {
            Some(backend) if config.enabled => Self::new(backend),
            _ => Self::disabled(),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Return the stored result for `(operation, version, fingerprint)` or
    /// run `compute` and store its result.
    ///
    /// # Errors
    ///
    /// Whatever `compute` returns.
    pub fn memoize<T, F>(
        &self,
        operation: &str,
        version: &str,
        fingerprint: &Fingerprint,
        compute: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
    {
        let Some(backend) = &self.backend else {
            return compute();
        };
        let key = CacheKey::new(operation, version, fingerprint.clone());

        match backend.get(&key) {
            Ok(Some(bytes)) => match bincode::deserialize::<T>(&bytes) {
                Ok(value) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, "cache hit");
                    return Ok(value);
                }
                Err(err) => warn!(key = %key, error = %err, "undecodable cache entry, recomputing"),
            },
            Ok(None) => {}
            Err(err) => warn!(key = %key, error = %err, "cache lookup failed, recomputing"),
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, "cache miss");
        let value = compute()?;

        match bincode::serialize(&value) {
            Ok(bytes) => {
                if let Err(err) = backend.put(&key, &bytes) {
                    warn!(key = %key, error = %err, "cache write failed");
                }
            }
            Err(err) => warn!(key = %key, error = %err, "result not encodable, not cached"),
        }
        Ok(value)
    }
}
