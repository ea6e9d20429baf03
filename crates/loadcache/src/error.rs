//! Error types for loadcache

use thiserror::Error;

/// Result type alias for cache construction
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building a cache
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Capacity must be at least one entry
    #[error("Invalid capacity: {0} (must be greater than 0)")]
    InvalidCapacity(usize),
}

/// Outcome of a failed load, as returned by the loader and by `get`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError<E> {
    /// Upstream resource exhausted. Returned to the caller but never cached.
    #[error("Resource exhausted")]
    ResourceExhausted,

    /// The loader panicked before producing a result
    #[error("Loader panicked")]
    LoaderPanicked,

    /// Loader error, cached like a value until the entry expires
    #[error("Load failed: {0}")]
    Failed(E),
}

impl<E> LoadError<E> {
    /// Wrap a loader error
    pub fn failed(err: E) -> Self {
        LoadError::Failed(err)
    }

    /// Whether this is the resource-exhausted sentinel
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(self, LoadError::ResourceExhausted)
    }

    /// The loader error, if any
    pub fn as_failed(&self) -> Option<&E> {
        match self {
            LoadError::Failed(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::InvalidCapacity(0).to_string(),
            "Invalid capacity: 0 (must be greater than 0)"
        );
        assert_eq!(
            LoadError::failed("boom").to_string(),
            "Load failed: boom"
        );
        assert_eq!(
            LoadError::<String>::ResourceExhausted.to_string(),
            "Resource exhausted"
        );
    }

    #[test]
    fn test_load_error_helpers() {
        let exhausted: LoadError<&str> = LoadError::ResourceExhausted;
        assert!(exhausted.is_resource_exhausted());
        assert_eq!(exhausted.as_failed(), None);

        let failed = LoadError::failed("boom");
        assert!(!failed.is_resource_exhausted());
        assert_eq!(failed.as_failed(), Some(&"boom"));
    }
}
