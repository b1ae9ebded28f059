//! Top-level application component.
//!
//! The [`App`] owns the configured resolver and is the root for the application's functionality.

use std::num::NonZeroUsize;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::caches::{CacheStore, MemoryCacheStore, NoopCacheStore};
use crate::config::{read_config, Config, ConfigSource};
use crate::loader::{FsItemLoader, ItemLoader};
use crate::resolver::Resolver;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during App operations.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for App operations.
pub type Result<T> = std::result::Result<T, AppError>;

// =============================================================================
// Context Types
// =============================================================================

/// Context for creating an App.
#[derive(Default)]
pub struct AppContext {
    /// Source for configuration files.
    pub config_source: ConfigSource,
}

// =============================================================================
// App
// =============================================================================

/// The top-level application component.
///
/// Owns the configuration and the resolver built from it.
pub struct App {
    config: Config,
    resolver: Arc<Resolver>,
}

impl App {
    /// Create a new App with the given context.
    pub fn new(ctx: AppContext) -> Result<Self> {
        let config_result =
            read_config(&ctx.config_source).map_err(|e| AppError::Config(e.to_string()))?;
        for warning in &config_result.warnings {
            warn!("{}", warning);
        }

        let config = config_result.config;
        let loader: Arc<dyn ItemLoader> = Arc::new(
            FsItemLoader::new(&config.loader.root).with_namespace(config.loader.namespace.clone()),
        );
        Self::with_loader(config, loader)
    }

    /// Create an App over a caller-supplied loader.
    pub fn with_loader(config: Config, loader: Arc<dyn ItemLoader>) -> Result<Self> {
        let store = create_store(&config)?;
        let resolver = Arc::new(Resolver::new(store, loader));
        Ok(Self { config, resolver })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }
}

fn create_store(config: &Config) -> Result<Arc<dyn CacheStore>> {
    if config.cache.no_cache {
        debug!("caching disabled");
        return Ok(Arc::new(NoopCacheStore));
    }

    let capacity = NonZeroUsize::new(config.cache.capacity)
        .ok_or_else(|| AppError::Config("cache capacity must be greater than zero".to_string()))?;
    debug!(capacity, "using in-memory cache store");
    Ok(Arc::new(MemoryCacheStore::new(capacity)))
}
