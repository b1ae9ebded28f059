//! Configuration types for bincache.
//!
//! This module defines the structures used to represent application configuration
//! as parsed from an INI-format config file.

use std::path::PathBuf;

/// [cache] section - in-process item cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of cache slots held at once.
    pub capacity: usize,
    /// Disable caching entirely; every resolution loads.
    pub no_cache: bool,
}

/// [loader] section - where items are loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Root directory of the filesystem item source.
    pub root: PathBuf,
    /// Namespace for identifiers of loaded items.
    pub namespace: String,
}

/// The complete application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub cache: CacheConfig,
    pub loader: LoaderConfig,
}
