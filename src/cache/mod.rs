//! Content-addressed memoization of pipeline steps.
//!
//! Every memoized step is keyed by `(operation, version, fingerprint)`:
//!
//! ```text
//! operation    create_search_grid | split_dataset | train_model/<backend> | compare_model_results
//! version      declared cache version, bumped to invalidate old entries
//! fingerprint  hex SHA-256 of the bincode encoding of every input
//! ```
//!
//! Entries are immutable once written. A second write to an existing key is
//! a no-op, so concurrent writers of the same result never conflict.
//! Retention and eviction belong to the storage behind a [`CacheBackend`].

mod backend;
mod disk;
mod key;
mod memoize;

pub use backend::{CacheBackend, MemoryCache};
pub use disk::DiskCache;
pub use key::{compute_hash, fingerprint, CacheKey, Fingerprint};
pub use memoize::{CacheStats, Memoizer};

use serde::{Deserialize, Serialize};

/// Operation id for grid generation.
pub const OP_CREATE_GRID: &str = "create_search_grid";
/// Operation id for the stratified split.
pub const OP_SPLIT: &str = "split_dataset";
/// Operation id prefix for training; the backend identity is appended.
pub const OP_TRAIN_PREFIX: &str = "train_model";
/// Operation id for validation scoring and selection.
pub const OP_COMPARE: &str = "compare_model_results";

/// Default cache version.
pub const DEFAULT_CACHE_VERSION: &str = "cache-v1";

/// Training operation id for a backend.
#[must_use]
pub fn train_operation(backend_identity: &str) -> String {
    format!("{OP_TRAIN_PREFIX}/{backend_identity}")
}

/// Cache switch and version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// When false every step recomputes and nothing is stored.
    pub enabled: bool,
    /// Version folded into every key.
    pub version: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            version: DEFAULT_CACHE_VERSION.to_string(),
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}
