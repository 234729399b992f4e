use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

use crate::parser::{normalize_text, DiffInput};
use crate::{compare, DiffComparison};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to (de)serialize cached comparison: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache backend error: {0}")]
    Backend(String),
}

/// Identifies a comparison by the normalized text of both diffs
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub target: String,
    pub predicted: String,
}

impl CacheKey {
    pub fn new(target: &DiffInput, predicted: &DiffInput) -> Self {
        Self {
            target: digest(&normalize_text(target)),
            predicted: digest(&normalize_text(predicted)),
        }
    }

    /// Single-string form used as a storage key
    pub fn as_string(&self) -> String {
        format!("{}:{}", self.target, self.predicted)
    }
}

fn digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Storage for previously computed comparisons
pub trait ComparisonCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Result<Option<DiffComparison>, CacheError>;

    fn put(&self, key: &CacheKey, comparison: &DiffComparison) -> Result<(), CacheError>;
}

/// Process-local cache, mostly useful for batch runs and tests
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<CacheKey, DiffComparison>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ComparisonCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Result<Option<DiffComparison>, CacheError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| CacheError::Backend("Memory cache lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &CacheKey, comparison: &DiffComparison) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CacheError::Backend("Memory cache lock poisoned".into()))?;
        entries.insert(key.clone(), comparison.clone());
        Ok(())
    }
}

/// Whether a comparison came from the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

/// Runs [`compare`] through an injected cache.
///
/// Cache failures are logged and never fail the comparison.
#[derive(Clone)]
pub struct CachedComparator {
    cache: Arc<dyn ComparisonCache>,
}

impl CachedComparator {
    pub fn new(cache: Arc<dyn ComparisonCache>) -> Self {
        Self { cache }
    }

    pub fn compare(
        &self,
        diff1: impl Into<DiffInput>,
        diff2: impl Into<DiffInput>,
    ) -> (DiffComparison, CacheStatus) {
        let diff1 = diff1.into();
        let diff2 = diff2.into();
        let key = CacheKey::new(&diff1, &diff2);

        match self.cache.get(&key) {
            Ok(Some(comparison)) => {
                debug!(key = %key.as_string(), "Comparison cache hit");
                return (comparison, CacheStatus::Hit);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Comparison cache lookup failed"),
        }

        let comparison = compare(diff1, diff2);

        if let Err(e) = self.cache.put(&key, &comparison) {
            warn!(error = %e, "Failed to store comparison in cache");
        }

        (comparison, CacheStatus::Miss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenCache;

    impl ComparisonCache for BrokenCache {
        fn get(&self, _key: &CacheKey) -> Result<Option<DiffComparison>, CacheError> {
            Err(CacheError::Backend("offline".into()))
        }

        fn put(&self, _key: &CacheKey, _comparison: &DiffComparison) -> Result<(), CacheError> {
            Err(CacheError::Backend("offline".into()))
        }
    }

    #[test]
    fn test_key_ignores_representation_and_trailing_whitespace() {
        let a = CacheKey::new(&DiffInput::from("+a \n+b\n"), &DiffInput::from("+c"));
        let b = CacheKey::new(&DiffInput::from(vec!["+a", "+b"]), &DiffInput::from("+c\n"));
        assert_eq!(a, b);
        assert_eq!(a.target.len(), 64);
    }

    #[test]
    fn test_key_is_ordered() {
        let a = CacheKey::new(&DiffInput::from("+a"), &DiffInput::from("+b"));
        let b = CacheKey::new(&DiffInput::from("+b"), &DiffInput::from("+a"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_second_compare_hits_cache() {
        let cache = Arc::new(MemoryCache::new());
        let comparator = CachedComparator::new(cache.clone());

        let (first, status) = comparator.compare("+a\n+b\n", "+a\n");
        assert_eq!(status, CacheStatus::Miss);
        assert_eq!(cache.len(), 1);

        let (second, status) = comparator.compare("+a\n+b\n", "+a\n");
        assert_eq!(status, CacheStatus::Hit);
        assert_eq!(first, second);
    }

    #[test]
    fn test_cached_value_is_returned_verbatim() {
        let cache = Arc::new(MemoryCache::new());
        let key = CacheKey::new(&DiffInput::from("+a"), &DiffInput::from("+b"));
        let mut stored = compare("+a", "+b");
        stored.similarity = 0.42;
        cache.put(&key, &stored).unwrap();

        let (comparison, status) = CachedComparator::new(cache).compare("+a", "+b");
        assert_eq!(status, CacheStatus::Hit);
        assert_eq!(comparison.similarity, 0.42);
    }

    #[test]
    fn test_broken_cache_falls_back_to_compare() {
        let comparator = CachedComparator::new(Arc::new(BrokenCache));
        let (comparison, status) = comparator.compare("+a", "+a");
        assert_eq!(status, CacheStatus::Miss);
        assert!(comparison.identical);
    }
}
