//! Cache configuration and builder

use std::time::Duration;

use crate::cache::LoadingCache;
use crate::error::{Error, LoadError, Result};
use crate::key::KeyParams;

/// Capacity used when none is given
pub const DEFAULT_CAPACITY: usize = 512;

/// Settings fixed for the lifetime of a cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of resident entries
    pub capacity: usize,

    /// How long a loaded result stays fresh
    pub ttl: Duration,
}

impl CacheConfig {
    /// Config with the given TTL and [`DEFAULT_CAPACITY`]
    pub fn new(ttl: Duration) -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            ttl,
        }
    }

    /// Override the capacity
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Check the config can back a cache
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::InvalidCapacity(self.capacity));
        }
        Ok(())
    }
}

/// Builder for [`LoadingCache`]
///
/// ```
/// use std::time::Duration;
/// use loadcache::CacheBuilder;
///
/// let cache = CacheBuilder::new(Duration::from_secs(30))
///     .capacity(128)
///     .build(|&(id,): &(u64,)| Ok::<_, loadcache::LoadError<String>>(id * 2))
///     .unwrap();
/// assert_eq!(cache.get((21,)), Ok(42));
/// ```
#[derive(Debug, Clone)]
pub struct CacheBuilder {
    config: CacheConfig,
}

impl CacheBuilder {
    /// Start from the given TTL and [`DEFAULT_CAPACITY`]
    pub fn new(ttl: Duration) -> Self {
        Self {
            config: CacheConfig::new(ttl),
        }
    }

    /// Maximum number of resident entries
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// Freshness window for loaded results
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.config.ttl = ttl;
        self
    }

    /// Validate the settings and create the cache around `loader`
    pub fn build<P, V, E, F>(self, loader: F) -> Result<LoadingCache<P, V, E>>
    where
        P: KeyParams + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
        F: Fn(&P) -> std::result::Result<V, LoadError<E>> + Send + Sync + 'static,
    {
        LoadingCache::from_config(self.config, loader)
    }
}
