//! Resolution subcommands.
//!
//! Each request can be repeated within the one process, which shows the cache
//! at work: the first attempt loads, later attempts are served from the cache
//! (including cached "not found" results).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;

use crate::app::App;
use crate::cli::{GlobalArgs, OutputSink, Result};
use crate::item::ResolvedItem;
use crate::resolver::{ResolveError, Resolver, ResolverStats};

// =============================================================================
// Reports
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Found,
    NotFound,
    Error,
}

/// Summary of a resolved item.
#[derive(Debug, Clone, Serialize)]
pub struct ItemSummary {
    pub id: String,
    pub path: String,
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl From<&ResolvedItem> for ItemSummary {
    fn from(item: &ResolvedItem) -> Self {
        Self {
            id: item.id().to_string(),
            path: item.metadata().path.clone(),
            size: item.len(),
            mime_type: item.metadata().mime_type.clone(),
            last_modified: item.metadata().last_modified,
        }
    }
}

/// The outcome of one resolution attempt.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveReport {
    pub request: String,
    pub attempt: usize,
    pub outcome: Outcome,
    /// Whether the attempt was answered without invoking the loader.
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<ItemSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResolveReport {
    fn new(
        request: String,
        attempt: usize,
        cached: bool,
        result: std::result::Result<Arc<ResolvedItem>, ResolveError>,
    ) -> Self {
        let (outcome, item, error) = match result {
            Ok(item) => (Outcome::Found, Some(ItemSummary::from(item.as_ref())), None),
            Err(e) if e.is_not_found() => (Outcome::NotFound, None, None),
            Err(e) => (Outcome::Error, None, Some(e.to_string())),
        };
        Self {
            request,
            attempt,
            outcome,
            cached,
            item,
            error,
        }
    }

    fn to_line(&self) -> String {
        let source = if self.cached { "cache" } else { "loader" };
        match (&self.outcome, &self.item, &self.error) {
            (Outcome::Found, Some(item), _) => format!(
                "{}\t#{}\tfound\t{}\t{} bytes\t{}\t{}",
                self.request,
                self.attempt,
                item.id,
                item.size,
                item.mime_type.as_deref().unwrap_or("-"),
                source
            ),
            (Outcome::Error, _, Some(error)) => {
                format!("{}\t#{}\terror\t{}", self.request, self.attempt, error)
            }
            _ => format!("{}\t#{}\tnot found\t{}", self.request, self.attempt, source),
        }
    }
}

#[derive(Debug, Serialize)]
struct RunReport {
    results: Vec<ResolveReport>,
    stats: ResolverStats,
}

impl RunReport {
    async fn write(self, output: &OutputSink, json: bool) -> Result<()> {
        if json {
            output.write_json(&self).await?;
            return Ok(());
        }

        let mut lines: Vec<String> = self.results.iter().map(ResolveReport::to_line).collect();
        lines.push(format!(
            "hits: {}, misses: {}, not found loads: {}, failed loads: {}",
            self.stats.hits, self.stats.misses, self.stats.negative_loads, self.stats.failed_loads
        ));
        output.write_str(&lines.join("\n")).await?;
        Ok(())
    }
}

/// Run one resolution, noting whether it reached the loader.
async fn attempt<F, Fut>(resolver: &Resolver, request: String, n: usize, f: F) -> ResolveReport
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = std::result::Result<Arc<ResolvedItem>, ResolveError>>,
{
    let before = resolver.stats().misses;
    let result = f().await;
    let cached = resolver.stats().misses == before;
    ResolveReport::new(request, n, cached, result)
}

// =============================================================================
// ResolveId
// =============================================================================

/// Arguments for the resolve-id command.
#[derive(Args, Debug)]
pub struct ResolveIdArgs {
    /// Identifiers to resolve, e.g. tcm:7-42.
    #[arg(required = true)]
    pub identifiers: Vec<String>,

    /// Resolve each identifier this many times.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub repeat: u32,

    #[command(flatten)]
    pub output: OutputSink,
}

impl ResolveIdArgs {
    pub async fn run(self, app: &App, global: &GlobalArgs) -> Result<()> {
        let resolver = app.resolver();
        let mut results = Vec::new();

        for n in 1..=self.repeat as usize {
            for identifier in &self.identifiers {
                results.push(
                    attempt(resolver, identifier.clone(), n, || {
                        resolver.resolve_by_identifier(identifier)
                    })
                    .await,
                );
            }
        }

        RunReport {
            results,
            stats: resolver.stats(),
        }
        .write(&self.output, global.json)
        .await
    }
}

// =============================================================================
// ResolvePath
// =============================================================================

/// Arguments for the resolve-path command.
#[derive(Args, Debug)]
pub struct ResolvePathArgs {
    /// URL path of the item, e.g. /images/a.png.
    pub path: String,

    /// Collection the path belongs to.
    #[arg(long)]
    pub collection: u32,

    /// Resolve the path this many times.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub repeat: u32,

    #[command(flatten)]
    pub output: OutputSink,
}

impl ResolvePathArgs {
    pub async fn run(self, app: &App, global: &GlobalArgs) -> Result<()> {
        let resolver = app.resolver();
        let request = format!("{} (collection {})", self.path, self.collection);
        let mut results = Vec::new();

        for n in 1..=self.repeat as usize {
            results.push(
                attempt(resolver, request.clone(), n, || {
                    resolver.resolve_by_path(&self.path, self.collection)
                })
                .await,
            );
        }

        RunReport {
            results,
            stats: resolver.stats(),
        }
        .write(&self.output, global.json)
        .await
    }
}
