//! Structured item identifiers.
//!
//! Items are addressed by opaque strings of the form
//! `<namespace>:<collection>-<item>[-<variant>]`. Parsing one yields an
//! [`ItemUri`] carrying the owning collection and item ids, which the cache
//! uses to scope invalidation.

mod item_uri;

pub use item_uri::{IdentifierError, ItemUri, Result};
