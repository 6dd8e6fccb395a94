//! Result cache for expensive derived layers.
//!
//! Entries are keyed on the identity of every input (path + SHA-256 of the
//! file content) together with the serialized algorithm parameters, so a
//! changed file or a different parameter set can never be served a stale
//! result.

use crate::error::{Error, Result};
use lru::LruCache;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Identity of one input file: where it was read from and what it contained.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentId {
    pub path: PathBuf,
    pub sha256: [u8; 32],
}

impl ContentId {
    /// Identify an in-memory copy of the file at `path`
    pub fn of_bytes(path: impl AsRef<Path>, bytes: &[u8]) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            sha256: Sha256::digest(bytes).into(),
        }
    }

    /// Read and identify the file at `path`
    pub fn of_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Ok(Self::of_bytes(path, &bytes))
    }

    /// Hex digest, for logging
    pub fn short_hash(&self) -> String {
        self.sha256[..6].iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// Cache key: all inputs plus the parameter set that produced the value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    inputs: Vec<ContentId>,
    params: String,
}

impl CacheKey {
    /// Build a key from input identities and any serializable parameter set.
    ///
    /// `operation` names the computation, so two algorithms sharing a
    /// parameter type never collide.
    pub fn new<S: Serialize>(operation: &str, inputs: Vec<ContentId>, params: &S) -> Result<Self> {
        let params = serde_json::to_string(params)
            .map_err(|e| Error::Other(format!("Cannot serialize cache parameters: {}", e)))?;
        Ok(Self {
            inputs,
            params: format!("{}:{}", operation, params),
        })
    }
}

/// Bounded LRU cache shared across worker threads.
pub struct ResultCache<V: Clone> {
    inner: Mutex<LruCache<CacheKey, V>>,
}

impl<V: Clone> ResultCache<V> {
    /// Create a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(cap)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<CacheKey, V>> {
        // A panic in another worker cannot leave an entry half-written
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get a cached value, if present.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        self.lock().get(key).cloned()
    }

    /// Insert a value.
    pub fn insert(&self, key: CacheKey, value: V) {
        self.lock().put(key, value);
    }

    /// Return the cached value for `key`, computing and storing it on a miss.
    ///
    /// The lock is not held while `compute` runs; two workers missing on the
    /// same key both compute, and the later insert wins with an equal value.
    pub fn get_or_try_insert_with<F>(&self, key: CacheKey, compute: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        if let Some(hit) = self.get(&key) {
            let hashes: Vec<String> = key.inputs.iter().map(ContentId::short_hash).collect();
            tracing::debug!("cache hit for {}", hashes.join(","));
            return Ok(hit);
        }
        let value = compute()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    /// Number of entries currently cached.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
