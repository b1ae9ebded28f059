use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace, warn};

use super::error::{ResolveError, Result};
use crate::caches::{CacheKey, CacheStore, ElementState, Payload, ScopeOwner};
use crate::identifier::ItemUri;
use crate::item::ResolvedItem;
use crate::loader::{ItemLoader, LoaderError};
use crate::util::Dedup;

// =============================================================================
// Statistics
// =============================================================================

/// A snapshot of resolver activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolverStats {
    /// Resolutions served from a fresh cache element.
    pub hits: u64,
    /// Resolutions that had to load.
    pub misses: u64,
    /// Loads that reported the item as not found.
    pub negative_loads: u64,
    /// Loads that failed and left the slot stale.
    pub failed_loads: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    negative_loads: AtomicU64,
    failed_loads: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ResolverStats {
        ResolverStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            negative_loads: self.negative_loads.load(Ordering::Relaxed),
            failed_loads: self.failed_loads.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// LoadRequest
// =============================================================================

/// What to ask the loader for on a miss.
#[derive(Debug, Clone, Copy)]
enum LoadRequest<'a> {
    Identifier(&'a str),
    Path { path: &'a str, collection_id: u32 },
}

impl LoadRequest<'_> {
    /// Derive the scope owner for a successfully loaded item.
    ///
    /// Identifier requests parse the requested identifier. Path requests
    /// parse the loaded item's own identifier, since a path has no
    /// structure; a failure there means the loader broke its contract.
    fn owner_of(&self, key: &CacheKey, item: &ResolvedItem) -> Result<ScopeOwner> {
        let uri = match self {
            LoadRequest::Identifier(identifier) => ItemUri::parse(identifier)?,
            LoadRequest::Path { .. } => {
                ItemUri::parse(item.id()).map_err(|source| ResolveError::Integrity {
                    key: key.to_string(),
                    id: item.id().to_string(),
                    source,
                })?
            }
        };
        Ok(ScopeOwner::new(uri.collection_id(), uri.item_id()))
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Resolves binary items through a cache.
///
/// See the [module documentation](super) for the protocol.
pub struct Resolver {
    store: Arc<dyn CacheStore>,
    loader: Arc<dyn ItemLoader>,
    /// Single-flight layer for stores without element identity.
    in_flight: Dedup<CacheKey, Payload, ResolveError>,
    counters: Counters,
}

impl Resolver {
    /// Create a resolver over the given store and loader.
    pub fn new(store: Arc<dyn CacheStore>, loader: Arc<dyn ItemLoader>) -> Self {
        Self {
            store,
            loader,
            in_flight: Dedup::new(),
            counters: Counters::default(),
        }
    }

    /// Resolve an item by its identifier string.
    ///
    /// The identifier itself is the cache key. Fails with
    /// [`ResolveError::NotFound`] if the item is known to be absent and with
    /// [`ResolveError::MalformedIdentifier`] if the identifier does not
    /// parse.
    pub async fn resolve_by_identifier(&self, identifier: &str) -> Result<Arc<ResolvedItem>> {
        debug!(identifier, "resolving binary by identifier");
        let key = CacheKey::identifier(identifier);
        let payload = self
            .resolve(&key, LoadRequest::Identifier(identifier))
            .await?;
        into_item(&key, payload)
    }

    /// Resolve the item published at `path` within a collection.
    ///
    /// Path lookups have their own cache slot, separate from the slot of the
    /// same item resolved by identifier.
    pub async fn resolve_by_path(&self, path: &str, collection_id: u32) -> Result<Arc<ResolvedItem>> {
        debug!(path, collection_id, "resolving binary by path");
        let key = CacheKey::path(path, collection_id);
        let payload = self
            .resolve(
                &key,
                LoadRequest::Path {
                    path,
                    collection_id,
                },
            )
            .await?;
        into_item(&key, payload)
    }

    /// Drop every cached slot owned by `(collection_id, item_id)`.
    pub async fn evict_scope(&self, collection_id: u32, item_id: u32) -> Result<usize> {
        let removed = self.store.evict_scope(collection_id, item_id).await?;
        debug!(collection_id, item_id, removed, "evicted cached binaries");
        Ok(removed)
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn stats(&self) -> ResolverStats {
        self.counters.snapshot()
    }

    async fn resolve(&self, key: &CacheKey, request: LoadRequest<'_>) -> Result<Payload> {
        if self.store.guarantees_identity() {
            self.resolve_element(key, request).await
        } else {
            self.in_flight
                .call(key.clone(), || self.resolve_element(key, request))
                .await
        }
    }

    async fn resolve_element(&self, key: &CacheKey, request: LoadRequest<'_>) -> Result<Payload> {
        let element = self.store.fetch_or_create(key).await?;

        if let Some(payload) = element.peek() {
            trace!(%key, "cache hit");
            Counters::bump(&self.counters.hits);
            return Ok(payload);
        }

        let mut guard = element.lock().await;

        if let Some(payload) = guard.payload() {
            // Loaded by another resolver while this one waited.
            trace!(%key, "cache hit after wait");
            Counters::bump(&self.counters.hits);
            return Ok(payload.clone());
        }

        if guard.state() == &ElementState::Claimed {
            warn!(%key, "previous load was abandoned, loading again");
        }
        guard.claim();
        Counters::bump(&self.counters.misses);

        let loaded = match request {
            LoadRequest::Identifier(identifier) => self.loader.load_by_identifier(identifier).await,
            LoadRequest::Path {
                path,
                collection_id,
            } => self.loader.load_by_path(path, collection_id).await,
        };

        let (payload, owner) = match loaded {
            Ok(item) => match request.owner_of(key, &item) {
                Ok(owner) => (Payload::Present(Arc::new(item)), Some(owner)),
                Err(e) => {
                    guard.reset();
                    Counters::bump(&self.counters.failed_loads);
                    return Err(e);
                }
            },
            Err(LoaderError::NotFound) => {
                Counters::bump(&self.counters.negative_loads);
                (Payload::Absent, None)
            }
            Err(e) => {
                guard.reset();
                Counters::bump(&self.counters.failed_loads);
                warn!(%key, error = %e, "load failed");
                return Err(match e {
                    LoaderError::MalformedIdentifier(source) => {
                        ResolveError::MalformedIdentifier(source)
                    }
                    other => ResolveError::Loader {
                        key: key.to_string(),
                        message: other.to_string(),
                    },
                });
            }
        };

        // Still claimed while committing: a cancelled commit leaves the slot
        // to be reloaded rather than fresh but outside its scope.
        if let Err(e) = self.store.commit(key, Arc::clone(&element), owner).await {
            guard.reset();
            warn!(%key, error = %e, "failed to commit cache element");
            return Err(e.into());
        }
        guard.fill(payload.clone());

        match &owner {
            Some(owner) => debug!(
                %key,
                collection_id = owner.collection_id,
                item_id = owner.item_id,
                "added binary to cache"
            ),
            None => debug!(%key, "cached binary as not found"),
        }
        Ok(payload)
    }
}

fn into_item(key: &CacheKey, payload: Payload) -> Result<Arc<ResolvedItem>> {
    match payload {
        Payload::Present(item) => Ok(item),
        Payload::Absent => Err(ResolveError::NotFound {
            key: key.to_string(),
        }),
    }
}
