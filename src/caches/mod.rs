//! Cache elements and the stores that hold them.
//!
//! ## Architecture
//!
//! 1. **CacheElement** - holder for one key's payload, and the lock that
//!    serializes loading it
//!    - [`Payload`] - `Present(item)` or `Absent` for cached "not found"
//!
//! 2. **CacheStore** - key/value store of elements with scoped invalidation
//!    - [`MemoryCacheStore`] - in-process, LRU-bounded
//!    - [`NoopCacheStore`] - caching disabled
//!
//! Keys are [`CacheKey`]s; the identifier and path addressing modes occupy
//! separate key spaces.

mod cache_element;
mod cache_key;
mod cache_store;
mod memory_cache_store;

pub use cache_element::{CacheElement, ElementGuard, ElementState, Payload};
pub use cache_key::CacheKey;
pub use cache_store::{CacheStore, CacheStoreError, NoopCacheStore, Result, ScopeOwner};
pub use memory_cache_store::{MemoryCacheStore, DEFAULT_CAPACITY};
