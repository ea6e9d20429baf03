//! # loadcache
//!
//! Bounded memoization cache around a loader function.
//!
//! ## Architecture
//! - **Store**: AHash map + doubly-linked recency list, LRU eviction in O(1)
//! - **Entry**: per-key TTL with stale-while-revalidate refresh
//! - **Loader**: strongly typed `Fn(&P) -> Result<V, LoadError<E>>`, keyed by the parameter tuple
//!
//! At most one load runs per key at a time. Only callers of a key that has
//! never finished loading wait; everyone else gets the current result, fresh
//! or stale, while a refresh runs in the background.
//!
//! ```
//! use std::time::Duration;
//! use loadcache::{LoadError, LoadingCache};
//!
//! let cache = LoadingCache::with_capacity(
//!     2,
//!     |&(x,): &(i64,)| Ok::<_, LoadError<String>>(x * 2),
//!     Duration::from_secs(1),
//! )
//! .unwrap();
//!
//! assert_eq!(cache.get((1,)), Ok(2));
//! assert_eq!(cache.get((2,)), Ok(4));
//! assert_eq!(cache.get((3,)), Ok(6));
//! assert_eq!(cache.len(), 2);
//! ```

#![warn(missing_docs)]

mod cache;
mod config;
mod entry;
mod error;
mod key;
mod lru;

pub use cache::LoadingCache;
pub use config::{CacheBuilder, CacheConfig, DEFAULT_CAPACITY};
pub use error::{Error, LoadError, Result};
pub use key::{CacheKey, KeyBuf, KeyParams};
