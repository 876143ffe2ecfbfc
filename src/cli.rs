//! CLI struct definitions for the bi-temporal store command-line interface.
//!
//! All clap-derived types live here. Dispatch logic lives in `lib.rs::run`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "bitemporal",
    version = env!("CARGO_PKG_VERSION"),
    about = "Bi-temporal reference-data store: an SCD2 merge engine over a valid timeline and a knowledge timeline."
)]
pub(crate) struct Cli {
    /// Path to the SQLite database file.
    #[clap(long, global = true, default_value = "bitemporal.sqlite")]
    pub db: PathBuf,
    /// Name of the watermark pipeline row.
    #[clap(long, global = true, default_value = "event_time")]
    pub watermark_name: String,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Create the database and its schema if they do not already exist.
    Init,
    /// Merge a batch of facts (one JSON object per line) into the store.
    Merge(MergeCli),
    /// Project the timeline as of a knowledge time (and optionally a
    /// separate effective time).
    QueryAsOf(QueryAsOfCli),
    /// Inspect or advance the event-time watermark.
    Watermark(WatermarkCli),
}

#[derive(clap::Args, Debug)]
pub(crate) struct MergeCli {
    /// Path to a file of newline-delimited JSON facts.
    pub input: PathBuf,
    /// Knowledge time to stamp onto every fact in this batch (RFC3339).
    /// Defaults to the current time.
    #[clap(long)]
    pub knowledge_time: Option<String>,
    /// Admit facts at or before the current watermark instead of skipping
    /// them (explicit backfill).
    #[clap(long)]
    pub allow_late: bool,
    /// Output format: 'text' or 'json'.
    #[clap(long, default_value = "text")]
    pub format: String,
}

#[derive(clap::Args, Debug)]
pub(crate) struct QueryAsOfCli {
    /// Knowledge time to query as of (RFC3339).
    pub knowledge_time: String,
    /// Effective (valid) time to view at. Defaults to `knowledge_time`.
    #[clap(long)]
    pub effective_time: Option<String>,
    /// Restrict the projection to these entity ids. Defaults to all entities.
    #[clap(long)]
    pub entity: Vec<String>,
    /// Output format: 'text' or 'json'.
    #[clap(long, default_value = "text")]
    pub format: String,
}

#[derive(clap::Args, Debug)]
pub(crate) struct WatermarkCli {
    #[clap(subcommand)]
    pub command: WatermarkCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum WatermarkCommand {
    /// Print the current watermark, if any.
    Get,
    /// Explicitly set the watermark (bypasses the batch driver's
    /// advance-only guard; fails if `value` regresses the watermark).
    Set {
        /// New watermark value (RFC3339).
        value: String,
    },
}
