use async_trait::async_trait;
use thiserror::Error;

use crate::identifier::IdentifierError;
use crate::item::ResolvedItem;

/// Error type for item loader operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoaderError {
    /// The item does not exist at the source.
    #[error("not found")]
    NotFound,

    /// The identifier could not be decomposed into collection and item ids.
    #[error(transparent)]
    MalformedIdentifier(#[from] IdentifierError),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for LoaderError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            LoaderError::NotFound
        } else {
            LoaderError::Io(e.to_string())
        }
    }
}

/// Result type for item loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Fetches items from a backing source.
///
/// Loaders are expected to be slow relative to the cache and are invoked at
/// most once per cache slot by the resolver.
#[async_trait]
pub trait ItemLoader: Send + Sync {
    /// Load an item by its identifier string.
    async fn load_by_identifier(&self, identifier: &str) -> Result<ResolvedItem>;

    /// Load the item published at `path` within a collection.
    async fn load_by_path(&self, path: &str, collection_id: u32) -> Result<ResolvedItem>;
}
