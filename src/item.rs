//! Resolved binary items.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Descriptive metadata for a binary item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMetadata {
    /// The URL path the item is published under, e.g. `/images/a.png`.
    pub path: String,
    /// MIME type, if known.
    pub mime_type: Option<String>,
    /// When the item was last modified at the source, if known.
    pub last_modified: Option<DateTime<Utc>>,
}

/// A binary item as returned by an item loader.
///
/// Items are immutable once loaded; the cache shares them behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedItem {
    id: String,
    content: Bytes,
    metadata: ItemMetadata,
}

impl ResolvedItem {
    pub fn new(id: impl Into<String>, content: impl Into<Bytes>, metadata: ItemMetadata) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata,
        }
    }

    /// The item's own identifier string.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The raw content bytes.
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn metadata(&self) -> &ItemMetadata {
        &self.metadata
    }

    /// Size of the content in bytes.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl ItemMetadata {
    /// Metadata with only a path set.
    pub fn for_path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mime_type: None,
            last_modified: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}
