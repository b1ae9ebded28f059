//! In-process LRU cache store with scoped invalidation.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::Mutex;
use tracing::trace;

use super::cache_element::CacheElement;
use super::cache_key::CacheKey;
use super::cache_store::{CacheStore, Result, ScopeOwner};

/// Default maximum number of elements held by a [`MemoryCacheStore`].
pub const DEFAULT_CAPACITY: usize = 10_000;

/// An in-memory [`CacheStore`] bounded by element count.
///
/// Elements are held behind `Arc`, so every caller of `fetch_or_create` gets
/// the same instance for as long as the element stays resident. Least
/// recently used elements are dropped once `capacity` is reached.
pub struct MemoryCacheStore {
    state: Mutex<StoreState>,
}

struct StoreState {
    entries: LruCache<CacheKey, Arc<CacheElement>>,
    /// Keys committed under each owner.
    scopes: HashMap<ScopeOwner, HashSet<CacheKey>>,
    /// Reverse index of `scopes`.
    key_scopes: HashMap<CacheKey, ScopeOwner>,
}

impl MemoryCacheStore {
    /// Create a store holding at most `capacity` elements.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            state: Mutex::new(StoreState {
                entries: LruCache::new(capacity),
                scopes: HashMap::new(),
                key_scopes: HashMap::new(),
            }),
        }
    }

    /// Create a store with [`DEFAULT_CAPACITY`].
    pub fn with_default_capacity() -> Self {
        Self::new(NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN))
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl StoreState {
    /// Insert an element, unindexing whatever the LRU pushes out.
    fn insert(&mut self, key: CacheKey, element: Arc<CacheElement>) {
        if let Some((evicted, _)) = self.entries.push(key.clone(), element) {
            if evicted != key {
                trace!(key = %evicted, "evicted least recently used element");
                self.unscope(&evicted);
            }
        }
    }

    fn unscope(&mut self, key: &CacheKey) {
        if let Some(owner) = self.key_scopes.remove(key) {
            if let Some(keys) = self.scopes.get_mut(&owner) {
                keys.remove(key);
                if keys.is_empty() {
                    self.scopes.remove(&owner);
                }
            }
        }
    }

    fn scope(&mut self, key: &CacheKey, owner: Option<ScopeOwner>) {
        if self.key_scopes.get(key).copied() == owner {
            return;
        }
        self.unscope(key);
        if let Some(owner) = owner {
            self.key_scopes.insert(key.clone(), owner);
            self.scopes.entry(owner).or_default().insert(key.clone());
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn fetch_or_create(&self, key: &CacheKey) -> Result<Arc<CacheElement>> {
        let mut state = self.state.lock().await;
        if let Some(element) = state.entries.get(key) {
            return Ok(Arc::clone(element));
        }

        let element = Arc::new(CacheElement::new());
        state.insert(key.clone(), Arc::clone(&element));
        Ok(element)
    }

    async fn commit(
        &self,
        key: &CacheKey,
        element: Arc<CacheElement>,
        owner: Option<ScopeOwner>,
    ) -> Result<()> {
        let mut state = self.state.lock().await;

        let resident = state
            .entries
            .get(key)
            .is_some_and(|existing| Arc::ptr_eq(existing, &element));
        if !resident {
            // Evicted while loading, or replaced: the committed element wins.
            state.insert(key.clone(), element);
        }

        state.scope(key, owner);
        Ok(())
    }

    async fn evict_scope(&self, collection_id: u32, item_id: u32) -> Result<usize> {
        let owner = ScopeOwner::new(collection_id, item_id);
        let mut state = self.state.lock().await;

        let Some(keys) = state.scopes.remove(&owner) else {
            return Ok(0);
        };

        let mut removed = 0;
        for key in keys {
            state.key_scopes.remove(&key);
            if state.entries.pop(&key).is_some() {
                removed += 1;
            }
        }

        trace!(collection_id, item_id, removed, "evicted scope");
        Ok(removed)
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.state.lock().await.entries.len())
    }

    fn guarantees_identity(&self) -> bool {
        true
    }
}
