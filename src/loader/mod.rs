//! Item loaders: the slow backing sources the resolver reads through to.

mod fs_item_loader;
mod item_loader;
mod memory_item_loader;

pub use fs_item_loader::{FsItemLoader, ManifestEntry, DEFAULT_NAMESPACE, MANIFEST_FILE_NAME};
pub use item_loader::{ItemLoader, LoaderError, Result};
pub use memory_item_loader::{LoadCounts, MemoryItemLoader};
