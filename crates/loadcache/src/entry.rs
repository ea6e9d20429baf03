//! Cached entry with TTL and background refresh
//!
//! An entry moves through `Unloaded -> Loading -> Fresh -> Stale -> Refreshing`
//! and loops between the last three until it is dropped by the store. At most
//! one load runs per entry at a time. Callers block only until the first load
//! completes; afterwards a stale read returns the previous result while the
//! refresh runs on its own thread.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::LoadError;
use crate::key::CacheKey;

/// Loader shared by the store and all of its entries
pub(crate) type Loader<P, V, E> = Arc<dyn Fn(&P) -> Result<V, LoadError<E>> + Send + Sync>;

const REFRESH_THREAD_NAME: &str = "loadcache-refresh";

/// Last cached outcome and when it goes stale (`None` = never)
struct Loaded<V, E> {
    outcome: Result<V, LoadError<E>>,
    expires_at: Option<Instant>,
}

impl<V, E> Loaded<V, E> {
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Why a finished load left nothing behind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Discarded {
    Exhausted,
    Panicked,
}

#[derive(Debug, Default)]
struct LoadState {
    initialized: bool,
    refreshing: bool,
    discarded: Option<Discarded>,
}

pub(crate) struct Entry<P, V, E> {
    key: CacheKey,
    params: P,
    ttl: Duration,
    loader: Loader<P, V, E>,
    loaded: RwLock<Option<Loaded<V, E>>>,
    state: Mutex<LoadState>,
    ready: Condvar,
}

impl<P, V, E> Entry<P, V, E>
where
    P: Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(key: CacheKey, params: P, ttl: Duration, loader: Loader<P, V, E>) -> Self {
        Self {
            key,
            params,
            ttl,
            loader,
            loaded: RwLock::new(None),
            state: Mutex::new(LoadState::default()),
            ready: Condvar::new(),
        }
    }

    pub(crate) fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Current result, loading or refreshing as needed.
    ///
    /// Fresh results return straight away. Stale results trigger a refresh
    /// and are returned as-is. Before the first load completes, the caller
    /// waits for it.
    pub(crate) fn value(self: &Arc<Self>) -> Result<V, LoadError<E>> {
        if let Some(loaded) = self.loaded.read().as_ref() {
            if loaded.is_fresh(Instant::now()) {
                return loaded.outcome.clone();
            }
        }

        self.refresh();

        if let Some(loaded) = self.loaded.read().as_ref() {
            return loaded.outcome.clone();
        }
        self.wait_ready()
    }

    /// Start a background load unless one is already running
    pub(crate) fn refresh(self: &Arc<Self>) {
        {
            let mut state = self.state.lock();
            if state.refreshing {
                return;
            }
            state.refreshing = true;
            state.discarded = None;
        }

        let entry = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(REFRESH_THREAD_NAME.to_string())
            .spawn(move || entry.load());
        if let Err(err) = spawned {
            warn!(key = %self.key, error = %err, "Failed to spawn refresh thread, loading inline");
            self.load();
        }
    }

    #[cfg(test)]
    pub(crate) fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    #[cfg(test)]
    pub(crate) fn is_refreshing(&self) -> bool {
        self.state.lock().refreshing
    }

    fn wait_ready(&self) -> Result<V, LoadError<E>> {
        let discarded = {
            let mut state = self.state.lock();
            while state.refreshing && !state.initialized {
                self.ready.wait(&mut state);
            }
            state.discarded
        };

        if let Some(loaded) = self.loaded.read().as_ref() {
            return loaded.outcome.clone();
        }
        match discarded {
            Some(Discarded::Panicked) => Err(LoadError::LoaderPanicked),
            _ => Err(LoadError::ResourceExhausted),
        }
    }

    fn load(&self) {
        debug!(key = %self.key, "Loading entry");
        let result = panic::catch_unwind(AssertUnwindSafe(|| (self.loader)(&self.params)));

        let discarded = match result {
            Ok(Err(LoadError::ResourceExhausted)) => {
                debug!(key = %self.key, "Resource exhausted, keeping previous result");
                Some(Discarded::Exhausted)
            }
            Ok(outcome) => {
                let expires_at = Instant::now().checked_add(self.ttl);
                *self.loaded.write() = Some(Loaded { outcome, expires_at });
                None
            }
            Err(_) => {
                warn!(key = %self.key, "Loader panicked, keeping previous result");
                Some(Discarded::Panicked)
            }
        };

        let mut state = self.state.lock();
        state.refreshing = false;
        state.discarded = discarded;
        if discarded.is_none() && !state.initialized {
            state.initialized = true;
            debug!(key = %self.key, "Entry initialized");
        }
        self.ready.notify_all();
    }
}
