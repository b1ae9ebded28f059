//! Utility modules for bincache-rs.

pub mod dedup;

pub use dedup::Dedup;
