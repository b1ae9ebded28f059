//! Structured item identifiers of the form `<namespace>:<collection>-<item>[-<variant>]`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Errors produced when an identifier string does not decompose into
/// collection and item ids.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("identifier '{0}' has no namespace separator ':'")]
    MissingNamespace(String),

    #[error("identifier '{0}' has an invalid namespace")]
    InvalidNamespace(String),

    #[error("identifier '{0}' has no item id")]
    MissingItemId(String),

    #[error("identifier '{identifier}' has a non-numeric {field} '{value}'")]
    InvalidNumber {
        identifier: String,
        field: &'static str,
        value: String,
    },

    #[error("identifier '{0}' has an empty variant")]
    EmptyVariant(String),
}

/// Result type for identifier parsing.
pub type Result<T> = std::result::Result<T, IdentifierError>;

// =============================================================================
// ItemUri
// =============================================================================

/// A parsed item identifier.
///
/// `tcm:7-42` names item 42 in collection 7; `tcm:7-42-16` additionally
/// carries the variant `16`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemUri {
    namespace: String,
    collection_id: u32,
    item_id: u32,
    variant: Option<String>,
}

impl ItemUri {
    /// Create an identifier from its parts.
    pub fn new(namespace: impl Into<String>, collection_id: u32, item_id: u32) -> Self {
        Self {
            namespace: namespace.into(),
            collection_id,
            item_id,
            variant: None,
        }
    }

    /// Attach a variant marker.
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    /// Parse an identifier string.
    pub fn parse(s: &str) -> Result<Self> {
        let (namespace, rest) = s
            .split_once(':')
            .ok_or_else(|| IdentifierError::MissingNamespace(s.to_string()))?;

        if namespace.is_empty() || !namespace.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(IdentifierError::InvalidNamespace(s.to_string()));
        }

        let mut parts = rest.splitn(3, '-');
        let collection = parts.next().unwrap_or_default();
        let item = parts
            .next()
            .ok_or_else(|| IdentifierError::MissingItemId(s.to_string()))?;
        let variant = parts.next();

        let collection_id = parse_id(s, "collection id", collection)?;
        let item_id = parse_id(s, "item id", item)?;

        let variant = match variant {
            Some("") => return Err(IdentifierError::EmptyVariant(s.to_string())),
            Some(v) => Some(v.to_string()),
            None => None,
        };

        Ok(Self {
            namespace: namespace.to_string(),
            collection_id,
            item_id,
            variant,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The id of the collection that owns this item.
    pub fn collection_id(&self) -> u32 {
        self.collection_id
    }

    /// The id of the item within its collection.
    pub fn item_id(&self) -> u32 {
        self.item_id
    }

    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }
}

fn parse_id(identifier: &str, field: &'static str, value: &str) -> Result<u32> {
    // u32::from_str accepts a leading '+', which is not part of the format.
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(IdentifierError::InvalidNumber {
            identifier: identifier.to_string(),
            field,
            value: value.to_string(),
        });
    }
    value.parse().map_err(|_| IdentifierError::InvalidNumber {
        identifier: identifier.to_string(),
        field,
        value: value.to_string(),
    })
}

impl FromStr for ItemUri {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ItemUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}",
            self.namespace, self.collection_id, self.item_id
        )?;
        if let Some(variant) = &self.variant {
            write!(f, "-{}", variant)?;
        }
        Ok(())
    }
}
