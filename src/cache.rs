//! Memoizes pipeline results by the SHA-256 of the input bytes.

use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::debug;

/// Hex SHA-256 of `bytes`, used as the cache key and the report id.
pub fn content_key(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Bounded map from input-content hash to a shared result.
///
/// When full, the oldest insertion is evicted. Lookups and inserts are
/// separate so callers can compute a missing value without holding a lock
/// around the cache.
#[derive(Debug)]
pub struct PipelineCache<T> {
    capacity: usize,
    entries: HashMap<String, Arc<T>>,
    order: VecDeque<String>,
}

impl<T> PipelineCache<T> {
    pub fn new(capacity: usize) -> Self {
        PipelineCache {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<T>> {
        self.entries.get(key).cloned()
    }

    /// Stores `value` under `key`, evicting the oldest entries beyond capacity.
    ///
    /// If `key` is already present the stored value is kept and `value` is
    /// discarded. Returns the stored value and the evicted entries, which the
    /// caller may need to clean up after.
    pub fn insert(&mut self, key: String, value: T) -> (Arc<T>, Vec<(String, Arc<T>)>) {
        if let Some(existing) = self.get(&key) {
            return (existing, Vec::new());
        }

        let value = Arc::new(value);
        self.entries.insert(key.clone(), value.clone());
        self.order.push_back(key);

        let mut evicted = Vec::new();
        while self.entries.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if let Some(old) = self.entries.remove(&oldest) {
                debug!(key = %oldest, "Evicted cached report");
                evicted.push((oldest, old));
            }
        }

        (value, evicted)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
