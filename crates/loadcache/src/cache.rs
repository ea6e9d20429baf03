//! LoadingCache: LRU store of self-refreshing entries

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::config::CacheConfig;
use crate::entry::{Entry, Loader};
use crate::error::{LoadError, Result};
use crate::key::{CacheKey, KeyParams};
use crate::lru::LruCache;

/// Bounded memoization cache around a loader function
///
/// Results are keyed by the loader's parameter tuple. The store keeps at most
/// `capacity` entries, evicting the least recently used one on overflow.
/// Cloning the cache yields another handle to the same store.
///
/// Every refresh runs on its own short-lived OS thread and the number of
/// concurrent refreshes is not bounded: when many keys go stale at once,
/// expect up to one thread per stale key until their loads finish.
pub struct LoadingCache<P, V, E> {
    /// Key -> entry, ordered by recency
    entries: Arc<RwLock<LruCache<CacheKey, Arc<Entry<P, V, E>>>>>,

    /// Loader handed to every new entry
    loader: Loader<P, V, E>,

    config: CacheConfig,
}

impl<P, V, E> Clone for LoadingCache<P, V, E> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            loader: Arc::clone(&self.loader),
            config: self.config,
        }
    }
}

impl<P, V, E> LoadingCache<P, V, E>
where
    P: KeyParams + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create a cache with [`DEFAULT_CAPACITY`](crate::DEFAULT_CAPACITY)
    pub fn new<F>(loader: F, ttl: Duration) -> Result<Self>
    where
        F: Fn(&P) -> std::result::Result<V, LoadError<E>> + Send + Sync + 'static,
    {
        Self::from_config(CacheConfig::new(ttl), loader)
    }

    /// Create a cache holding at most `capacity` entries
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of entries, must be positive
    /// * `loader` - Function producing the result for a parameter tuple
    /// * `ttl` - How long a loaded result is served without refreshing
    ///
    /// # Returns
    /// * `Result<LoadingCache>` - `Error::InvalidCapacity` if `capacity` is 0
    pub fn with_capacity<F>(capacity: usize, loader: F, ttl: Duration) -> Result<Self>
    where
        F: Fn(&P) -> std::result::Result<V, LoadError<E>> + Send + Sync + 'static,
    {
        Self::from_config(CacheConfig::new(ttl).with_capacity(capacity), loader)
    }

    /// Create a cache from a prepared config
    pub fn from_config<F>(config: CacheConfig, loader: F) -> Result<Self>
    where
        F: Fn(&P) -> std::result::Result<V, LoadError<E>> + Send + Sync + 'static,
    {
        config.validate()?;
        debug!(
            capacity = config.capacity,
            ttl = ?config.ttl,
            "Creating loading cache"
        );

        Ok(Self {
            entries: Arc::new(RwLock::new(LruCache::new(config.capacity))),
            loader: Arc::new(loader),
            config,
        })
    }

    /// Get the result for `params`, loading it on first use
    ///
    /// A hit promotes the entry to most recently used. A miss inserts a new
    /// entry and evicts the least recently used one if the store is full.
    /// The store lock is released before any loading happens.
    ///
    /// # Returns
    /// * `Ok(V)` - Loaded (possibly stale) value
    /// * `Err(LoadError)` - Cached loader error, or a load that produced nothing
    pub fn get(&self, params: P) -> std::result::Result<V, LoadError<E>> {
        let key = params.cache_key();

        let entry = {
            let mut entries = self.entries.write();
            let hit = entries.get(&key).cloned();
            match hit {
                Some(entry) => {
                    trace!(key = %key, "Cache hit");
                    entry
                }
                None => {
                    trace!(key = %key, "Cache miss");
                    let entry = Arc::new(Entry::new(
                        key.clone(),
                        params,
                        self.config.ttl,
                        Arc::clone(&self.loader),
                    ));
                    if let Some((evicted, _)) = entries.insert(key, Arc::clone(&entry)) {
                        debug!(key = %evicted, "Evicted least recently used entry");
                    }
                    entry
                }
            }
        };

        entry.value()
    }

    /// Remove the entry for `params`
    ///
    /// # Returns
    /// * `bool` - Whether an entry was present
    pub fn remove(&self, params: &P) -> bool {
        let key = params.cache_key();
        let removed = self.entries.write().remove(&key);
        match removed {
            Some(entry) => {
                debug!(key = %entry.key(), "Removed entry");
                true
            }
            None => false,
        }
    }

    /// Drop every entry. Loads already running finish on their own.
    pub fn purge(&self) {
        let mut entries = self.entries.write();
        let purged = entries.len();
        entries.clear();
        debug!(purged, "Purged cache");
    }

    /// Number of resident entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Maximum number of resident entries
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Freshness window applied to every entry
    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    /// Keys from most to least recently used
    #[cfg(test)]
    fn keys(&self) -> Vec<CacheKey> {
        self.entries.read().keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Doubler = LoadingCache<(i32,), i32, String>;

    fn doubler(capacity: usize, loads: &Arc<AtomicUsize>) -> Doubler {
        let loads = Arc::clone(loads);
        LoadingCache::with_capacity(
            capacity,
            move |&(x,): &(i32,)| {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok(x * 2)
            },
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[test]
    fn test_cache_basic() {
        let loads = Arc::new(AtomicUsize::new(0));
        let cache = doubler(10, &loads);

        assert_eq!(cache.get((21,)), Ok(42));
        assert_eq!(cache.get((21,)), Ok(42));
        assert_eq!(cache.len(), 1);
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cache_zero_capacity() {
        let result = LoadingCache::<(i32,), i32, String>::with_capacity(
            0,
            |&(x,): &(i32,)| Ok(x),
            Duration::from_secs(1),
        );
        assert_eq!(result.err(), Some(Error::InvalidCapacity(0)));
    }

    #[test]
    fn test_cache_default_capacity() {
        let cache: LoadingCache<(), u8, String> =
            LoadingCache::new(|_: &()| Ok(1), Duration::from_secs(1)).unwrap();
        assert_eq!(cache.capacity(), crate::DEFAULT_CAPACITY);
        assert_eq!(cache.ttl(), Duration::from_secs(1));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_huge_capacity() {
        let cache: LoadingCache<(u64,), u64, String> = LoadingCache::with_capacity(
            usize::MAX,
            |&(x,): &(u64,)| Ok(x),
            Duration::MAX,
        )
        .unwrap();

        assert_eq!(cache.capacity(), usize::MAX);
        assert_eq!(cache.ttl(), Duration::MAX);
        assert_eq!(cache.get((3,)), Ok(3));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_eviction() {
        let loads = Arc::new(AtomicUsize::new(0));
        let cache = doubler(2, &loads);

        assert_eq!(cache.get((1,)), Ok(2));
        assert_eq!(cache.get((2,)), Ok(4));
        assert_eq!(cache.get((3,)), Ok(6)); // evicts 1
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.keys(), vec![(3,).cache_key(), (2,).cache_key()]);

        // 1 reloads and pushes out 2, the least recently used
        assert_eq!(cache.get((1,)), Ok(2));
        assert_eq!(loads.load(Ordering::SeqCst), 4);
        assert_eq!(cache.keys(), vec![(1,).cache_key(), (3,).cache_key()]);

        assert_eq!(cache.get((3,)), Ok(6));
        assert_eq!(loads.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_cache_hit_promotes() {
        let loads = Arc::new(AtomicUsize::new(0));
        let cache = doubler(2, &loads);

        cache.get((1,)).unwrap();
        cache.get((2,)).unwrap();
        cache.get((1,)).unwrap();
        cache.get((3,)).unwrap(); // evicts 2

        assert_eq!(cache.keys(), vec![(3,).cache_key(), (1,).cache_key()]);
    }

    #[test]
    fn test_cache_remove() {
        let loads = Arc::new(AtomicUsize::new(0));
        let cache = doubler(10, &loads);

        cache.get((5,)).unwrap();
        assert!(cache.remove(&(5,)));
        assert!(!cache.remove(&(5,)));
        assert_eq!(cache.len(), 0);

        assert_eq!(cache.get((5,)), Ok(10));
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cache_purge() {
        let loads = Arc::new(AtomicUsize::new(0));
        let cache = doubler(10, &loads);

        cache.get((1,)).unwrap();
        cache.get((2,)).unwrap();
        assert_eq!(cache.len(), 2);

        cache.purge();
        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());

        cache.get((1,)).unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_cache_clone_shares_store() {
        let loads = Arc::new(AtomicUsize::new(0));
        let cache = doubler(10, &loads);
        let other = cache.clone();

        cache.get((4,)).unwrap();
        assert_eq!(other.len(), 1);
        assert_eq!(other.get((4,)), Ok(8));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }
}
