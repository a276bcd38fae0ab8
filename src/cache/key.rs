use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Compute SHA-256 hash of data
#[must_use]
pub fn compute_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Content identity of a step's inputs: 64 hex chars of SHA-256.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint any serializable value.
///
/// The bincode encoding is the canonical form, so types hashed here must
/// serialize deterministically (ordered collections only, no `HashMap`).
/// Hash several inputs together by passing a tuple of references.
///
/// # Errors
///
/// `Serialization` if the value cannot be encoded.
///
/// # Examples
///
/// ```
/// use hypergrid::cache::fingerprint;
///
/// let a = fingerprint(&("split_dataset", 0.25_f64, 42_u64)).expect("encodable");
/// let b = fingerprint(&("split_dataset", 0.25_f64, 42_u64)).expect("encodable");
/// let c = fingerprint(&("split_dataset", 0.25_f64, 43_u64)).expect("encodable");
/// assert_eq!(a, b);
/// assert_ne!(a, c);
/// assert_eq!(a.as_str().len(), 64);
/// ```
pub fn fingerprint<T: Serialize + ?Sized>(value: &T) -> Result<Fingerprint> {
    let bytes = bincode::serialize(value)?;
    Ok(Fingerprint(compute_hash(&bytes)))
}

/// Full cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub operation: String,
    pub version: String,
    pub fingerprint: Fingerprint,
}

impl CacheKey {
    #[must_use]
    pub fn new(operation: impl Into<String>, version: impl Into<String>, fingerprint: Fingerprint) -> Self {
        Self {
            operation: operation.into(),
            version: version.into(),
            fingerprint,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = self.fingerprint.as_str().get(..12).unwrap_or(self.fingerprint.as_str());
        write!(f, "{}@{}:{short}", self.operation, self.version)
    }
}
