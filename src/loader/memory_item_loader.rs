use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::item_loader::{ItemLoader, LoaderError, Result};
use crate::identifier::ItemUri;
use crate::item::ResolvedItem;

/// Number of loads served by a [`MemoryItemLoader`], per addressing mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadCounts {
    pub by_identifier: usize,
    pub by_path: usize,
}

impl LoadCounts {
    pub fn total(&self) -> usize {
        self.by_identifier + self.by_path
    }
}

#[derive(Default)]
struct Items {
    by_id: HashMap<String, ResolvedItem>,
    by_path: HashMap<(u32, String), ResolvedItem>,
    /// Failures returned instead of a lookup, keyed by identifier or path.
    failures: HashMap<String, LoaderError>,
}

/// An in-memory implementation of [`ItemLoader`], intended primarily for
/// testing.
///
/// Every load is counted, and an optional delay makes loads slow enough for
/// concurrent callers to pile up behind them.
#[derive(Default)]
pub struct MemoryItemLoader {
    items: RwLock<Items>,
    delay: Option<Duration>,
    identifier_loads: AtomicUsize,
    path_loads: AtomicUsize,
}

impl MemoryItemLoader {
    /// Create a new empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `delay` at the start of every load.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Add an item, reachable by its identifier and, if the identifier
    /// parses, by its metadata path within the identifier's collection.
    pub fn insert(&self, item: ResolvedItem) {
        let mut items = self.write();
        if let Ok(uri) = ItemUri::parse(item.id()) {
            items.by_path.insert(
                (uri.collection_id(), item.metadata().path.clone()),
                item.clone(),
            );
        }
        items.by_id.insert(item.id().to_string(), item);
    }

    /// Add an item reachable only by `path` within `collection_id`.
    pub fn insert_at_path(&self, path: impl Into<String>, collection_id: u32, item: ResolvedItem) {
        self.write()
            .by_path
            .insert((collection_id, path.into()), item);
    }

    /// Remove an item from both lookups.
    pub fn remove(&self, identifier: &str) -> Option<ResolvedItem> {
        let mut items = self.write();
        let removed = items.by_id.remove(identifier)?;
        items.by_path.retain(|_, item| item.id() != identifier);
        Some(removed)
    }

    /// Make loads of `key` (an identifier or a path) fail with `error`.
    pub fn fail_with(&self, key: impl Into<String>, error: LoaderError) {
        self.write().failures.insert(key.into(), error);
    }

    /// Stop failing loads of `key`.
    pub fn clear_failure(&self, key: &str) {
        self.write().failures.remove(key);
    }

    pub fn load_counts(&self) -> LoadCounts {
        LoadCounts {
            by_identifier: self.identifier_loads.load(Ordering::SeqCst),
            by_path: self.path_loads.load(Ordering::SeqCst),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Items> {
        self.items.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Items> {
        self.items.write().unwrap_or_else(PoisonError::into_inner)
    }

    async fn simulate_latency(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ItemLoader for MemoryItemLoader {
    async fn load_by_identifier(&self, identifier: &str) -> Result<ResolvedItem> {
        self.identifier_loads.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        let items = self.read();
        if let Some(error) = items.failures.get(identifier) {
            return Err(error.clone());
        }
        if let Some(item) = items.by_id.get(identifier) {
            return Ok(item.clone());
        }

        ItemUri::parse(identifier)?;
        Err(LoaderError::NotFound)
    }

    async fn load_by_path(&self, path: &str, collection_id: u32) -> Result<ResolvedItem> {
        self.path_loads.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        let items = self.read();
        if let Some(error) = items.failures.get(path) {
            return Err(error.clone());
        }
        items
            .by_path
            .get(&(collection_id, path.to_string()))
            .cloned()
            .ok_or(LoaderError::NotFound)
    }
}
