use thiserror::Error;

use crate::caches::CacheStoreError;
use crate::identifier::IdentifierError;

/// Errors returned by [`Resolver`](super::Resolver) operations.
///
/// Only `NotFound` is ever cached. Everything else leaves the cache slot
/// stale, so resolving again retries the load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The loader reported the item as absent, now or on an earlier call.
    #[error("cannot find binary for {key}")]
    NotFound { key: String },

    /// An identifier string does not decompose into collection and item ids.
    #[error("malformed identifier: {0}")]
    MalformedIdentifier(#[from] IdentifierError),

    /// The loader returned an item whose own identifier does not parse.
    #[error("loaded item for {key} has a malformed identifier '{id}': {source}")]
    Integrity {
        key: String,
        id: String,
        #[source]
        source: IdentifierError,
    },

    /// Any other loader failure.
    #[error("failed to load {key}: {message}")]
    Loader { key: String, message: String },

    #[error("cache store error: {0}")]
    Store(#[from] CacheStoreError),
}

impl ResolveError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::NotFound { .. })
    }
}

/// Result type for resolver operations.
pub type Result<T> = std::result::Result<T, ResolveError>;
