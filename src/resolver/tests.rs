use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use super::*;
use crate::caches::{
    CacheElement, CacheKey, CacheStore, CacheStoreError, MemoryCacheStore, NoopCacheStore,
    ScopeOwner,
};
use crate::item::{ItemMetadata, ResolvedItem};
use crate::loader::{LoaderError, MemoryItemLoader};

fn png(id: &str, path: &str) -> ResolvedItem {
    ResolvedItem::new(
        id,
        format!("content of {}", id).into_bytes(),
        ItemMetadata::for_path(path).with_mime_type("image/png"),
    )
}

fn memory_store() -> Arc<MemoryCacheStore> {
    Arc::new(MemoryCacheStore::new(NonZeroUsize::new(100).unwrap()))
}

fn setup() -> (Arc<MemoryCacheStore>, Arc<MemoryItemLoader>, Resolver) {
    let store = memory_store();
    let loader = Arc::new(MemoryItemLoader::new());
    loader.insert(png("tcm:7-42", "/images/a.png"));
    let resolver = Resolver::new(store.clone(), loader.clone());
    (store, loader, resolver)
}

#[tokio::test]
async fn test_hit_after_first_load_and_reload_after_scope_eviction() {
    let (_store, loader, resolver) = setup();

    let first = resolver.resolve_by_identifier("tcm:7-42").await.unwrap();
    assert_eq!(first.id(), "tcm:7-42");
    assert_eq!(loader.load_counts().by_identifier, 1);

    let second = resolver.resolve_by_identifier("tcm:7-42").await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(loader.load_counts().by_identifier, 1);

    assert_eq!(resolver.evict_scope(7, 42).await.unwrap(), 1);

    let third = resolver.resolve_by_identifier("tcm:7-42").await.unwrap();
    assert_eq!(*third, *first);
    assert_eq!(loader.load_counts().by_identifier, 2);
}

#[tokio::test]
async fn test_not_found_is_cached() {
    let (_store, loader, resolver) = setup();

    let err = resolver.resolve_by_identifier("tcm:7-99").await.unwrap_err();
    assert_eq!(
        err,
        ResolveError::NotFound {
            key: "tcm:7-99".to_string()
        }
    );
    assert_eq!(loader.load_counts().by_identifier, 1);

    // The item appearing at the source does not matter until the negative
    // entry leaves the cache.
    loader.insert(png("tcm:7-99", "/images/late.png"));
    let err = resolver.resolve_by_identifier("tcm:7-99").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(loader.load_counts().by_identifier, 1);
}

#[tokio::test]
async fn test_not_found_is_not_scoped() {
    let (store, _loader, resolver) = setup();

    assert!(resolver.resolve_by_identifier("tcm:7-99").await.is_err());
    assert_eq!(store.evict_scope(7, 99).await.unwrap(), 0);
    assert_eq!(store.len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_path_and_identifier_use_separate_slots() {
    let (store, loader, resolver) = setup();

    let by_path = resolver.resolve_by_path("/images/a.png", 7).await.unwrap();
    let by_id = resolver.resolve_by_identifier("tcm:7-42").await.unwrap();

    assert_eq!(*by_path, *by_id);
    assert_eq!(
        loader.load_counts(),
        crate::loader::LoadCounts {
            by_identifier: 1,
            by_path: 1
        }
    );
    assert_eq!(store.len().await.unwrap(), 2);

    // Both slots are owned by the item the path resolved to.
    assert_eq!(store.evict_scope(7, 42).await.unwrap(), 2);
}

#[tokio::test]
async fn test_path_hit_and_not_found() {
    let (_store, loader, resolver) = setup();

    resolver.resolve_by_path("/images/a.png", 7).await.unwrap();
    resolver.resolve_by_path("/images/a.png", 7).await.unwrap();
    assert_eq!(loader.load_counts().by_path, 1);

    // Same path, different collection: its own slot.
    let err = resolver.resolve_by_path("/images/a.png", 8).await.unwrap_err();
    assert_eq!(
        err,
        ResolveError::NotFound {
            key: "B-/images/a.png-8".to_string()
        }
    );
    assert!(resolver.resolve_by_path("/images/a.png", 8).await.is_err());
    assert_eq!(loader.load_counts().by_path, 2);
}

#[tokio::test]
async fn test_concurrent_resolutions_load_once() {
    let store = memory_store();
    let loader = Arc::new(MemoryItemLoader::new().with_delay(Duration::from_millis(50)));
    loader.insert(png("tcm:7-42", "/images/a.png"));
    let resolver = Arc::new(Resolver::new(store, loader.clone()));

    let mut handles = vec![];
    for _ in 0..16 {
        let resolver = Arc::clone(&resolver);
        handles.push(tokio::spawn(async move {
            resolver.resolve_by_identifier("tcm:7-42").await
        }));
    }

    for handle in handles {
        let item = handle.await.unwrap().unwrap();
        assert_eq!(item.id(), "tcm:7-42");
    }

    assert_eq!(loader.load_counts().by_identifier, 1);
    let stats = resolver.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 15);
}

#[tokio::test]
async fn test_concurrent_not_found_loads_once() {
    let store = memory_store();
    let loader = Arc::new(MemoryItemLoader::new().with_delay(Duration::from_millis(50)));
    let resolver = Arc::new(Resolver::new(store, loader.clone()));

    let mut handles = vec![];
    for _ in 0..8 {
        let resolver = Arc::clone(&resolver);
        handles.push(tokio::spawn(async move {
            resolver.resolve_by_path("/missing.png", 7).await
        }));
    }

    for handle in handles {
        assert!(handle.await.unwrap().unwrap_err().is_not_found());
    }
    assert_eq!(loader.load_counts().by_path, 1);
}

#[tokio::test]
async fn test_concurrent_resolutions_without_store_identity_load_once() {
    let loader = Arc::new(MemoryItemLoader::new().with_delay(Duration::from_millis(50)));
    loader.insert(png("tcm:7-42", "/images/a.png"));
    let resolver = Arc::new(Resolver::new(Arc::new(NoopCacheStore), loader.clone()));

    let mut handles = vec![];
    for _ in 0..8 {
        let resolver = Arc::clone(&resolver);
        handles.push(tokio::spawn(async move {
            resolver.resolve_by_identifier("tcm:7-42").await
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().id(), "tcm:7-42");
    }
    assert_eq!(loader.load_counts().by_identifier, 1);

    // Nothing is retained once the flight lands.
    resolver.resolve_by_identifier("tcm:7-42").await.unwrap();
    assert_eq!(loader.load_counts().by_identifier, 2);
}

#[tokio::test]
async fn test_different_keys_do_not_contend() {
    let store = memory_store();
    let loader = Arc::new(MemoryItemLoader::new().with_delay(Duration::from_millis(20)));
    for i in 0..4 {
        loader.insert(png(&format!("tcm:7-{}", i), &format!("/{}.png", i)));
    }
    let resolver = Arc::new(Resolver::new(store.clone(), loader.clone()));

    let mut handles = vec![];
    for i in 0..4 {
        let resolver = Arc::clone(&resolver);
        handles.push(tokio::spawn(async move {
            resolver.resolve_by_identifier(&format!("tcm:7-{}", i)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(loader.load_counts().by_identifier, 4);
    assert_eq!(store.len().await.unwrap(), 4);
}

#[tokio::test]
async fn test_loader_failure_leaves_slot_stale() {
    let (_store, loader, resolver) = setup();
    loader.fail_with("tcm:7-42", LoaderError::Io("connection reset".to_string()));

    let err = resolver.resolve_by_identifier("tcm:7-42").await.unwrap_err();
    assert_eq!(
        err,
        ResolveError::Loader {
            key: "tcm:7-42".to_string(),
            message: "I/O error: connection reset".to_string(),
        }
    );

    loader.clear_failure("tcm:7-42");
    resolver.resolve_by_identifier("tcm:7-42").await.unwrap();
    assert_eq!(loader.load_counts().by_identifier, 2);
    assert_eq!(resolver.stats().failed_loads, 1);
}

#[tokio::test]
async fn test_malformed_identifier_is_not_cached() {
    let (_store, loader, resolver) = setup();

    for _ in 0..2 {
        let err = resolver.resolve_by_identifier("not-an-id").await.unwrap_err();
        assert!(matches!(err, ResolveError::MalformedIdentifier(_)));
    }
    assert_eq!(loader.load_counts().by_identifier, 2);
}

#[tokio::test]
async fn test_identifier_that_loads_but_does_not_parse() {
    let (_store, loader, resolver) = setup();
    loader.insert(png("legacy-42", "/legacy.png"));

    let err = resolver.resolve_by_identifier("legacy-42").await.unwrap_err();
    assert!(matches!(err, ResolveError::MalformedIdentifier(_)));
    assert!(!err.is_not_found());

    // Not cached: the next call loads again.
    assert!(resolver.resolve_by_identifier("legacy-42").await.is_err());
    assert_eq!(loader.load_counts().by_identifier, 2);
}

#[tokio::test]
async fn test_path_load_with_malformed_item_identifier_is_integrity_failure() {
    let (_store, loader, resolver) = setup();
    loader.insert_at_path("/broken.png", 7, png("broken", "/broken.png"));

    let err = resolver.resolve_by_path("/broken.png", 7).await.unwrap_err();
    match err {
        ResolveError::Integrity { key, id, .. } => {
            assert_eq!(key, "B-/broken.png-7");
            assert_eq!(id, "broken");
        }
        other => panic!("expected integrity failure, got {:?}", other),
    }

    assert!(resolver.resolve_by_path("/broken.png", 7).await.is_err());
    assert_eq!(loader.load_counts().by_path, 2);
}

#[tokio::test]
async fn test_cancelled_load_is_retried() {
    let store = memory_store();
    let loader = Arc::new(MemoryItemLoader::new().with_delay(Duration::from_millis(100)));
    loader.insert(png("tcm:7-42", "/images/a.png"));
    let resolver = Arc::new(Resolver::new(store.clone(), loader.clone()));

    let abandoned = {
        let resolver = Arc::clone(&resolver);
        tokio::spawn(async move { resolver.resolve_by_identifier("tcm:7-42").await })
    };
    sleep(Duration::from_millis(20)).await;
    abandoned.abort();
    let _ = abandoned.await;

    let item = resolver.resolve_by_identifier("tcm:7-42").await.unwrap();
    assert_eq!(item.id(), "tcm:7-42");
    assert_eq!(loader.load_counts().by_identifier, 2);
}

#[tokio::test]
async fn test_noop_store_loads_every_time() {
    let loader = Arc::new(MemoryItemLoader::new());
    loader.insert(png("tcm:7-42", "/images/a.png"));
    let resolver = Resolver::new(Arc::new(NoopCacheStore), loader.clone());

    for _ in 0..3 {
        resolver.resolve_by_identifier("tcm:7-42").await.unwrap();
        assert!(resolver.resolve_by_identifier("tcm:7-99").await.is_err());
    }
    assert_eq!(loader.load_counts().by_identifier, 6);
    assert_eq!(resolver.evict_scope(7, 42).await.unwrap(), 0);
}

/// A store whose commits always fail.
struct RejectingStore {
    inner: MemoryCacheStore,
}

#[async_trait]
impl CacheStore for RejectingStore {
    async fn fetch_or_create(&self, key: &CacheKey) -> crate::caches::Result<Arc<CacheElement>> {
        self.inner.fetch_or_create(key).await
    }

    async fn commit(
        &self,
        _key: &CacheKey,
        _element: Arc<CacheElement>,
        _owner: Option<ScopeOwner>,
    ) -> crate::caches::Result<()> {
        Err(CacheStoreError::Unavailable("read-only".to_string()))
    }

    async fn evict_scope(&self, collection_id: u32, item_id: u32) -> crate::caches::Result<usize> {
        self.inner.evict_scope(collection_id, item_id).await
    }

    async fn len(&self) -> crate::caches::Result<usize> {
        self.inner.len().await
    }

    fn guarantees_identity(&self) -> bool {
        true
    }
}

#[tokio::test]
async fn test_commit_failure_propagates_and_leaves_slot_stale() {
    let loader = Arc::new(MemoryItemLoader::new());
    loader.insert(png("tcm:7-42", "/images/a.png"));
    let store = Arc::new(RejectingStore {
        inner: MemoryCacheStore::default(),
    });
    let resolver = Resolver::new(store, loader.clone());

    for _ in 0..2 {
        let err = resolver.resolve_by_identifier("tcm:7-42").await.unwrap_err();
        assert_eq!(
            err,
            ResolveError::Store(CacheStoreError::Unavailable("read-only".to_string()))
        );
    }
    assert_eq!(loader.load_counts().by_identifier, 2);
}

/// A store whose commits take a while to land.
struct SlowCommitStore {
    inner: MemoryCacheStore,
    delay: Duration,
}

#[async_trait]
impl CacheStore for SlowCommitStore {
    async fn fetch_or_create(&self, key: &CacheKey) -> crate::caches::Result<Arc<CacheElement>> {
        self.inner.fetch_or_create(key).await
    }

    async fn commit(
        &self,
        key: &CacheKey,
        element: Arc<CacheElement>,
        owner: Option<ScopeOwner>,
    ) -> crate::caches::Result<()> {
        sleep(self.delay).await;
        self.inner.commit(key, element, owner).await
    }

    async fn evict_scope(&self, collection_id: u32, item_id: u32) -> crate::caches::Result<usize> {
        self.inner.evict_scope(collection_id, item_id).await
    }

    async fn len(&self) -> crate::caches::Result<usize> {
        self.inner.len().await
    }

    fn guarantees_identity(&self) -> bool {
        true
    }
}

#[tokio::test]
async fn test_cancelled_commit_does_not_publish_unscoped_entry() {
    let loader = Arc::new(MemoryItemLoader::new());
    loader.insert(png("tcm:7-42", "/images/a.png"));
    let store = Arc::new(SlowCommitStore {
        inner: MemoryCacheStore::default(),
        delay: Duration::from_millis(100),
    });
    let resolver = Arc::new(Resolver::new(store, loader.clone()));

    let abandoned = {
        let resolver = Arc::clone(&resolver);
        tokio::spawn(async move { resolver.resolve_by_identifier("tcm:7-42").await })
    };
    sleep(Duration::from_millis(30)).await;
    abandoned.abort();
    let _ = abandoned.await;
    assert_eq!(loader.load_counts().by_identifier, 1);

    // The abandoned commit never landed, so the slot must not be served.
    resolver.resolve_by_identifier("tcm:7-42").await.unwrap();
    assert_eq!(loader.load_counts().by_identifier, 2);

    // Once committed, the entry is reachable through its scope.
    assert_eq!(resolver.evict_scope(7, 42).await.unwrap(), 1);
    resolver.resolve_by_identifier("tcm:7-42").await.unwrap();
    assert_eq!(loader.load_counts().by_identifier, 3);
}

#[tokio::test]
async fn test_stats() {
    let (_store, _loader, resolver) = setup();

    resolver.resolve_by_identifier("tcm:7-42").await.unwrap();
    resolver.resolve_by_identifier("tcm:7-42").await.unwrap();
    let _ = resolver.resolve_by_identifier("tcm:7-99").await;
    let _ = resolver.resolve_by_identifier("tcm:7-99").await;

    assert_eq!(
        resolver.stats(),
        ResolverStats {
            hits: 2,
            misses: 2,
            negative_loads: 1,
            failed_loads: 0,
        }
    );
}
