//! Cache keys for the two item addressing modes.

use std::fmt;

/// Identifies one cache slot.
///
/// An item reachable both by identifier and by path occupies two independent
/// slots, one per addressing mode. The variants never compare equal to each
/// other, so the two key spaces cannot collide whatever the input strings are.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// An item addressed by its raw identifier string.
    Identifier(String),
    /// An item addressed by URL path within a collection.
    Path { path: String, collection_id: u32 },
}

impl CacheKey {
    pub fn identifier(raw: impl Into<String>) -> Self {
        CacheKey::Identifier(raw.into())
    }

    pub fn path(path: impl Into<String>, collection_id: u32) -> Self {
        CacheKey::Path {
            path: path.into(),
            collection_id,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Identifier(raw) => f.write_str(raw),
            CacheKey::Path {
                path,
                collection_id,
            } => write!(f, "B-{}-{}", path, collection_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(CacheKey::identifier("tcm:7-42").to_string(), "tcm:7-42");
        assert_eq!(
            CacheKey::path("/images/a.png", 7).to_string(),
            "B-/images/a.png-7"
        );
    }

    #[test]
    fn test_modes_do_not_collide() {
        // Same rendering, different slots.
        let by_id = CacheKey::identifier("B-/images/a.png-7");
        let by_path = CacheKey::path("/images/a.png", 7);
        assert_eq!(by_id.to_string(), by_path.to_string());
        assert_ne!(by_id, by_path);
    }

    #[test]
    fn test_collection_is_part_of_path_key() {
        assert_ne!(CacheKey::path("/a.png", 7), CacheKey::path("/a.png", 8));
    }
}
