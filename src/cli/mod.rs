//! Command-line interface for bincache.

pub mod args;
mod commands;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::app::{App, AppError};
use crate::resolver::ResolveError;

pub use args::{GlobalArgs, OutputSink};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during CLI execution.
#[derive(Debug, Error)]
pub enum CliError {
    /// Argument processing error.
    #[error("{0}")]
    Args(#[from] args::ArgsError),

    /// App error.
    #[error("{0}")]
    App(#[from] AppError),

    /// Resolution error.
    #[error("{0}")]
    Resolve(#[from] ResolveError),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

// =============================================================================
// CLI Definition
// =============================================================================

/// bincache - resolve binary items through a read-through cache.
#[derive(Parser, Debug)]
#[command(name = "bincache", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve items by identifier and report the outcome.
    #[command(name = "resolve-id")]
    ResolveId(commands::resolve::ResolveIdArgs),

    /// Resolve an item by path within a collection and report the outcome.
    #[command(name = "resolve-path")]
    ResolvePath(commands::resolve::ResolvePathArgs),

    /// Write an item's content to stdout or a file.
    Fetch(commands::fetch::FetchArgs),
}

// =============================================================================
// CLI Execution
// =============================================================================

impl Cli {
    /// Parse command-line arguments and return the CLI instance.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        let app = App::new(self.global.to_app_context())?;

        match self.command {
            Command::ResolveId(args) => args.run(&app, &self.global).await,
            Command::ResolvePath(args) => args.run(&app, &self.global).await,
            Command::Fetch(args) => args.run(&app).await,
        }
    }
}

/// Main entry point for the CLI.
pub async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    cli.run().await
}
