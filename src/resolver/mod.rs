//! Read-through resolution of binary items.
//!
//! The [`Resolver`] sits between callers and an [`ItemLoader`], caching every
//! outcome in a [`CacheStore`]:
//!
//! - **Single-flight**: concurrent resolutions of one key perform one load.
//!   The cache element returned by the store is the lock; stores that cannot
//!   hand out the same element to every caller get a [`Dedup`] in front.
//! - **Negative caching**: a "not found" from the loader is committed as an
//!   absent entry and served from the cache afterwards.
//! - **Scoped invalidation**: successful loads are committed under the
//!   owning collection/item pair, so [`CacheStore::evict_scope`] can drop
//!   every slot of an item at once.
//!
//! [`ItemLoader`]: crate::loader::ItemLoader
//! [`CacheStore`]: crate::caches::CacheStore
//! [`CacheStore::evict_scope`]: crate::caches::CacheStore::evict_scope
//! [`Dedup`]: crate::util::Dedup

mod error;
mod resolver;
#[cfg(test)]
mod tests;

pub use error::{ResolveError, Result};
pub use resolver::{Resolver, ResolverStats};
