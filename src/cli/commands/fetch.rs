//! The fetch subcommand.

use clap::Args;

use crate::app::App;
use crate::cli::{CliError, OutputSink, Result};

/// Arguments for the fetch command.
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Identifier of the item, e.g. tcm:7-42.
    #[arg(required_unless_present = "path", conflicts_with = "path")]
    pub identifier: Option<String>,

    /// URL path of the item, used with --collection.
    #[arg(long, requires = "collection")]
    pub path: Option<String>,

    /// Collection the path belongs to.
    #[arg(long)]
    pub collection: Option<u32>,

    #[command(flatten)]
    pub output: OutputSink,
}

impl FetchArgs {
    pub async fn run(self, app: &App) -> Result<()> {
        let resolver = app.resolver();

        let item = match (&self.identifier, &self.path, self.collection) {
            (Some(identifier), _, _) => resolver.resolve_by_identifier(identifier).await?,
            (None, Some(path), Some(collection)) => {
                resolver.resolve_by_path(path, collection).await?
            }
            _ => {
                return Err(CliError::Other(
                    "specify an identifier, or --path with --collection".to_string(),
                ))
            }
        };

        self.output.write_bytes(item.content()).await?;
        Ok(())
    }
}
