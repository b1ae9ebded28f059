//! Cache store trait and the no-op implementation.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::cache_element::CacheElement;
use super::cache_key::CacheKey;

/// Error type for cache store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheStoreError {
    /// The store could not be reached or refused the operation.
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for cache store operations.
pub type Result<T> = std::result::Result<T, CacheStoreError>;

/// The collection/item pair that owns a committed cache entry.
///
/// Entries committed with an owner can be dropped in bulk with
/// [`CacheStore::evict_scope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeOwner {
    pub collection_id: u32,
    pub item_id: u32,
}

impl ScopeOwner {
    pub fn new(collection_id: u32, item_id: u32) -> Self {
        Self {
            collection_id,
            item_id,
        }
    }
}

/// A key/value store of cache elements.
///
/// Implementations must be safe for concurrent use and must make
/// `fetch_or_create` atomic per key.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Return the element for `key`, inserting a new stale element if there
    /// is none.
    ///
    /// Stores that report [`CacheStore::guarantees_identity`] return the same
    /// element instance to every caller for as long as the element is held.
    async fn fetch_or_create(&self, key: &CacheKey) -> Result<Arc<CacheElement>>;

    /// Persist an element under `key`.
    ///
    /// The resolver commits while it still holds the element's token, before
    /// publishing the payload.
    ///
    /// With an `owner`, the key is also recorded under that scope; without
    /// one, any previous scope for the key is forgotten. Committing the same
    /// element with the same owner again leaves the store unchanged.
    async fn commit(
        &self,
        key: &CacheKey,
        element: Arc<CacheElement>,
        owner: Option<ScopeOwner>,
    ) -> Result<()>;

    /// Drop every entry committed under `(collection_id, item_id)`.
    ///
    /// Returns the number of entries removed.
    async fn evict_scope(&self, collection_id: u32, item_id: u32) -> Result<usize>;

    /// Number of elements currently held.
    async fn len(&self) -> Result<usize>;

    /// Whether `fetch_or_create` hands every concurrent caller the same
    /// element instance. When false, callers that need single-flight loading
    /// must deduplicate in front of the store.
    fn guarantees_identity(&self) -> bool;
}

// =============================================================================
// NoopCacheStore
// =============================================================================

/// A store that never caches anything.
///
/// Every lookup returns a new stale element and commits are discarded. Use
/// this when caching is disabled via configuration.
pub struct NoopCacheStore;

#[async_trait]
impl CacheStore for NoopCacheStore {
    async fn fetch_or_create(&self, _key: &CacheKey) -> Result<Arc<CacheElement>> {
        Ok(Arc::new(CacheElement::new()))
    }

    async fn commit(
        &self,
        _key: &CacheKey,
        _element: Arc<CacheElement>,
        _owner: Option<ScopeOwner>,
    ) -> Result<()> {
        Ok(())
    }

    async fn evict_scope(&self, _collection_id: u32, _item_id: u32) -> Result<usize> {
        Ok(0)
    }

    async fn len(&self) -> Result<usize> {
        Ok(0)
    }

    fn guarantees_identity(&self) -> bool {
        false
    }
}
