use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use super::item_loader::{ItemLoader, LoaderError, Result};
use crate::identifier::ItemUri;
use crate::item::{ItemMetadata, ResolvedItem};

/// Name of the per-collection manifest file.
pub const MANIFEST_FILE_NAME: &str = "index.json";

/// Namespace used for identifiers of items served by an [`FsItemLoader`]
/// unless configured otherwise.
pub const DEFAULT_NAMESPACE: &str = "tcm";

/// One item listed in a collection manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub item_id: u32,
    /// URL path of the item; also its location relative to the collection
    /// directory.
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

/// A filesystem-based implementation of [`ItemLoader`].
///
/// Layout, relative to the root directory:
///
/// ```text
/// <collection_id>/index.json      manifest: a JSON array of ManifestEntry
/// <collection_id>/<path>          item content
/// ```
pub struct FsItemLoader {
    root: PathBuf,
    namespace: String,
}

impl FsItemLoader {
    /// Create a loader rooted at the given directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    /// Use a different identifier namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    fn collection_dir(&self, collection_id: u32) -> PathBuf {
        self.root.join(collection_id.to_string())
    }

    async fn read_manifest(&self, collection_id: u32) -> Result<Vec<ManifestEntry>> {
        let path = self.collection_dir(collection_id).join(MANIFEST_FILE_NAME);
        let data = fs::read(&path).await?;
        serde_json::from_slice(&data).map_err(|e| {
            LoaderError::Other(format!("invalid manifest {}: {}", path.display(), e))
        })
    }

    async fn load_entry(&self, collection_id: u32, entry: ManifestEntry) -> Result<ResolvedItem> {
        let relative = content_path(&entry.path)?;
        let full_path = self.collection_dir(collection_id).join(relative);
        debug!(path = %full_path.display(), "reading item content");

        let content = fs::read(&full_path).await?;
        let last_modified = fs::metadata(&full_path)
            .await
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        let mut uri = ItemUri::new(self.namespace.clone(), collection_id, entry.item_id);
        if let Some(variant) = entry.variant {
            uri = uri.with_variant(variant);
        }

        let metadata = ItemMetadata {
            path: entry.path,
            mime_type: entry.mime_type,
            last_modified,
        };
        Ok(ResolvedItem::new(uri.to_string(), content, metadata))
    }
}

/// Turn a URL path into a relative filesystem path, refusing anything that
/// would escape the collection directory.
fn content_path(url_path: &str) -> Result<PathBuf> {
    let relative = Path::new(url_path.trim_start_matches('/'));
    let mut clean = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => {
                return Err(LoaderError::Other(format!(
                    "invalid item path: {}",
                    url_path
                )))
            }
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(LoaderError::Other(format!("invalid item path: {}", url_path)));
    }
    Ok(clean)
}

#[async_trait]
impl ItemLoader for FsItemLoader {
    async fn load_by_identifier(&self, identifier: &str) -> Result<ResolvedItem> {
        let uri = ItemUri::parse(identifier)?;
        let entry = self
            .read_manifest(uri.collection_id())
            .await?
            .into_iter()
            .find(|e| e.item_id == uri.item_id())
            .ok_or(LoaderError::NotFound)?;
        self.load_entry(uri.collection_id(), entry).await
    }

    async fn load_by_path(&self, path: &str, collection_id: u32) -> Result<ResolvedItem> {
        let entry = self
            .read_manifest(collection_id)
            .await?
            .into_iter()
            .find(|e| e.path == path)
            .ok_or(LoaderError::NotFound)?;
        self.load_entry(collection_id, entry).await
    }
}
