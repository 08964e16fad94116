//! Error types for termcache operations

use thiserror::Error;

/// Error returned by a cached lookup.
///
/// The cache adds no failure modes of its own: a failed backing query reaches
/// every caller that depended on it as `Query`, carrying the source's error
/// value unchanged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError<E> {
    #[error("Backing query failed: {0}")]
    Query(E),

    /// The task running the backing query was dropped before it reported an
    /// outcome, e.g. because the runtime shut down.
    #[error("In-flight query was abandoned before completing")]
    Abandoned,
}

impl<E> CacheError<E> {
    /// The backing source's error, if this is a query failure.
    pub fn query_error(&self) -> Option<&E> {
        match self {
            Self::Query(err) => Some(err),
            Self::Abandoned => None,
        }
    }

    pub fn into_query_error(self) -> Option<E> {
        match self {
            Self::Query(err) => Some(err),
            Self::Abandoned => None,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Result type alias for cached lookups over a source with error type `E`.
pub type CacheResult<T, E> = Result<T, CacheError<E>>;

// =============================================================================
// TESTS
// =============================================================================
