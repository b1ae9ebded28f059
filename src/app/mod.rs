//! Application wiring.

#[allow(clippy::module_inception)]
mod app;

pub use app::{App, AppContext, AppError, Result};
