use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;

use super::{CacheBackend, CacheKey};

/// One file per entry at `root/<operation>/<version>/<fingerprint>.bin`.
///
/// Operation and version directories are named `<readable>-<hex>`, where
/// the hex suffix encodes the raw string, so distinct keys never share a
/// file. Writes go to a temporary file in the same directory and are renamed
/// into place, so readers never observe a partial entry.
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    /// Open a cache rooted at `root`, creating the directory.
    ///
    /// # Errors
    ///
    /// `Io` if the directory cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding `key`.
    #[must_use]
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root
            .join(path_segment(&key.operation))
            .join(path_segment(&key.version))
            .join(format!("{}.bin", key.fingerprint))
    }
}

impl CacheBackend for DiskCache {
    fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read(&path)?))
    }

    fn put(&self, key: &CacheKey, value: &[u8]) -> Result<()> {
        let path = self.entry_path(key);
        if path.exists() {
            return Ok(());
        }
        let Some(dir) = path.parent() else {
            return Ok(());
        };
        fs::create_dir_all(dir)?;

        let tmp = dir.join(format!(
            ".{}.{:016x}.tmp",
            key.fingerprint,
            rand::random::<u64>()
        ));
        fs::write(&tmp, value)?;
        if path.exists() {
            fs::remove_file(&tmp)?;
            return Ok(());
        }
        fs::rename(&tmp, &path)?;
        debug!(key = %key, path = %path.display(), "cache entry written");
        Ok(())
    }

    fn contains(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.entry_path(key).exists())
    }

    fn backend_type(&self) -> &'static str {
        "disk"
    }
}

/// Filesystem-safe directory name, injective over `raw`.
///
/// Separators and other unsafe characters become `_` in the readable
/// part; the hex-encoded raw bytes after the last `-` keep names apart.
fn path_segment(raw: &str) -> String {
    let readable: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{readable}-{}", hex::encode(raw.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::fingerprint;
    use tempfile::TempDir;

    fn key(op: &str, n: u32) -> CacheKey {
        CacheKey::new(op, "cache-v1", fingerprint(&n).expect("encode"))
    }

    #[test]
    fn test_disk_cache_put_get() {
        let tmp = TempDir::new().expect("tempdir");
        let cache = DiskCache::new(tmp.path()).expect("open");

        assert_eq!(cache.get(&key("split_dataset", 1)).expect("get"), None);
        cache.put(&key("split_dataset", 1), b"payload").expect("put");
        assert_eq!(
            cache.get(&key("split_dataset", 1)).expect("get"),
            Some(b"payload".to_vec())
        );
        assert!(cache.contains(&key("split_dataset", 1)).expect("contains"));
    }

    #[test]
    fn test_disk_cache_layout() {
        let tmp = TempDir::new().expect("tempdir");
        let cache = DiskCache::new(tmp.path()).expect("open");
        let k = key("train_model/random_forest", 3);

        let path = cache.entry_path(&k);
        assert!(path.starts_with(
            tmp.path()
                .join(path_segment("train_model/random_forest"))
                .join(path_segment("cache-v1"))
        ));
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some(format!("{}.bin", k.fingerprint).as_str())
        );
    }

    #[test]
    fn test_disk_cache_never_overwrites() {
        let tmp = TempDir::new().expect("tempdir");
        let cache = DiskCache::new(tmp.path()).expect("open");
        cache.put(&key("a", 1), b"first").expect("put");
        cache.put(&key("a", 1), b"second").expect("put");
        assert_eq!(cache.get(&key("a", 1)).expect("get"), Some(b"first".to_vec()));
    }

    #[test]
    fn test_disk_cache_survives_reopen() {
        let tmp = TempDir::new().expect("tempdir");
        DiskCache::new(tmp.path())
            .expect("open")
            .put(&key("a", 9), b"kept")
            .expect("put");

        let reopened = DiskCache::new(tmp.path()).expect("reopen");
        assert_eq!(reopened.get(&key("a", 9)).expect("get"), Some(b"kept".to_vec()));
    }

    #[test]
    fn test_disk_cache_leaves_no_temp_files() {
        let tmp = TempDir::new().expect("tempdir");
        let cache = DiskCache::new(tmp.path()).expect("open");
        let k = key("a", 2);
        cache.put(&k, b"x").expect("put");

        let dir = cache.entry_path(&k);
        let dir = dir.parent().expect("entry dir");
        let names: Vec<String> = fs::read_dir(dir)
            .expect("read_dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![format!("{}.bin", k.fingerprint)]);
    }

    #[test]
    fn test_path_segment() {
        assert_eq!(
            path_segment("train_model/rf"),
            "train_model_rf-747261696e5f6d6f64656c2f7266"
        );
        assert_eq!(path_segment(""), "-");
        assert_eq!(path_segment(".."), "..-2e2e");
        assert_ne!(path_segment("cache v2"), path_segment("cache/v2"));
    }

    #[test]
    fn test_disk_cache_keeps_similar_operations_apart() {
        let tmp = TempDir::new().expect("tempdir");
        let cache = DiskCache::new(tmp.path()).expect("open");
        let fp = fingerprint(&1u32).expect("encode");
        let spaced = CacheKey::new("train_model/my forest", "cache-v1", fp.clone());
        let underscored = CacheKey::new("train_model/my_forest", "cache-v1", fp);

        cache.put(&spaced, b"model-a").expect("put");
        assert_ne!(cache.entry_path(&spaced), cache.entry_path(&underscored));
        assert_eq!(cache.get(&underscored).expect("get"), None);
        assert!(!cache.contains(&underscored).expect("contains"));
    }

    #[test]
    fn test_disk_cache_keeps_similar_versions_apart() {
        let tmp = TempDir::new().expect("tempdir");
        let cache = DiskCache::new(tmp.path()).expect("open");
        let fp = fingerprint(&1u32).expect("encode");

        cache
            .put(&CacheKey::new("split_dataset", "cache v2", fp.clone()), b"old")
            .expect("put");
        let bumped = CacheKey::new("split_dataset", "cache/v2", fp);
        assert_eq!(cache.get(&bumped).expect("get"), None);

        cache.put(&bumped, b"new").expect("put");
        assert_eq!(cache.get(&bumped).expect("get"), Some(b"new".to_vec()));
    }
}
