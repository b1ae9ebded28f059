//! bincache-rs - A read-through cache for binary items.

pub mod app;
pub mod caches;
pub mod cli;
pub mod config;
pub mod identifier;
pub mod item;
pub mod loader;
pub mod resolver;
pub mod util;

pub use caches::{CacheKey, CacheStore, MemoryCacheStore, NoopCacheStore, ScopeOwner};
pub use identifier::{IdentifierError, ItemUri};
pub use item::{ItemMetadata, ResolvedItem};
pub use loader::{FsItemLoader, ItemLoader, LoaderError, MemoryItemLoader};
pub use resolver::{ResolveError, Resolver, ResolverStats};
