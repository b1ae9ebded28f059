//! Single-flight deduplication for concurrent async operations.
//!
//! The [`Dedup`] utility combines concurrent calls with the same key into a
//! single operation. The first caller for a key (the leader) runs the
//! operation; callers arriving while it is in flight (followers) wait for and
//! receive a clone of the leader's result.
//!
//! The resolver puts a `Dedup` in front of cache stores that cannot hand the
//! same element to every concurrent caller, so loads stay single-flight even
//! when the store cannot serve as the lock.
//!
//! # Cancellation
//!
//! If the leader is dropped before finishing, its followers are woken and the
//! first of them to get back to the map becomes the new leader.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Notify, OnceCell};

/// Shared state for one in-flight call.
struct Waiter<V, E> {
    /// Holds the result once the leader completes.
    result: OnceCell<Result<V, E>>,
    /// Set when the leader is gone, with or without a result.
    closed: AtomicBool,
    /// Wakes followers when `closed` is set.
    notify: Notify,
}

impl<V, E> Waiter<V, E> {
    fn new() -> Self {
        Self {
            result: OnceCell::new(),
            closed: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }
}

enum Role<V, E> {
    Leader(Arc<Waiter<V, E>>),
    Follower(Arc<Waiter<V, E>>),
}

/// Single-flight deduplication keyed by `K`.
pub struct Dedup<K, V, E> {
    in_flight: Mutex<HashMap<K, Arc<Waiter<V, E>>>>,
}

impl<K, V, E> Dedup<K, V, E>
where
    K: Hash + Eq + Clone + Send,
    V: Clone + Send,
    E: Clone + Send,
{
    pub fn new() -> Self {
        Self {
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Run `f` unless a call with an equal key is already in flight, in
    /// which case wait for that call and return a clone of its result.
    pub async fn call<F, Fut>(&self, key: K, f: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        loop {
            let waiter = match self.join(&key) {
                Role::Leader(waiter) => return self.lead(key, waiter, f).await,
                Role::Follower(waiter) => waiter,
            };

            if let Some(result) = Self::follow(&waiter).await {
                return result;
            }
            // The leader was cancelled; race to take over.
        }
    }

    /// Returns the number of calls currently in flight.
    pub fn in_flight_count(&self) -> usize {
        self.map().len()
    }

    fn map(&self) -> MutexGuard<'_, HashMap<K, Arc<Waiter<V, E>>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn join(&self, key: &K) -> Role<V, E> {
        let mut map = self.map();
        if let Some(waiter) = map.get(key) {
            return Role::Follower(Arc::clone(waiter));
        }
        let waiter = Arc::new(Waiter::new());
        map.insert(key.clone(), Arc::clone(&waiter));
        Role::Leader(waiter)
    }

    async fn lead<F, Fut>(&self, key: K, waiter: Arc<Waiter<V, E>>, f: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let _release = Release {
            dedup: self,
            key,
            waiter: Arc::clone(&waiter),
        };

        let result = f().await;
        // Only the leader sets the cell.
        let _ = waiter.result.set(result.clone());
        result
    }

    async fn follow(waiter: &Waiter<V, E>) -> Option<Result<V, E>> {
        loop {
            // Register before checking so a wakeup between check and await
            // is not lost.
            let notified = waiter.notify.notified();

            if let Some(result) = waiter.result.get() {
                return Some(result.clone());
            }
            if waiter.closed.load(Ordering::Acquire) {
                return None;
            }

            notified.await;
        }
    }
}

impl<K, V, E> Default for Dedup<K, V, E>
where
    K: Hash + Eq + Clone + Send,
    V: Clone + Send,
    E: Clone + Send,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Removes the leader's map entry and wakes followers, on completion or
/// cancellation alike.
struct Release<'a, K, V, E>
where
    K: Hash + Eq,
{
    dedup: &'a Dedup<K, V, E>,
    key: K,
    waiter: Arc<Waiter<V, E>>,
}

impl<K, V, E> Drop for Release<'_, K, V, E>
where
    K: Hash + Eq,
{
    fn drop(&mut self) {
        {
            let mut map = self
                .dedup
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if map
                .get(&self.key)
                .is_some_and(|current| Arc::ptr_eq(current, &self.waiter))
            {
                map.remove(&self.key);
            }
        }
        self.waiter.closed.store(true, Ordering::Release);
        self.waiter.notify.notify_waiters();
    }
}
