//! A bi-temporal reference-data store.
//!
//! Maintains two independent timelines per entity: a **valid timeline**
//! (when a fact was true in the world) and a **knowledge timeline** (when
//! the store learned about it). Facts are merged into an entity's current
//! segments under SCD2 discipline, an event-time watermark guards against
//! silently re-processing stale batches, and an as-of query projects the
//! timeline as it was known at any point in the knowledge axis.
//!
//! # Architecture
//!
//! - [`core::time`] — canonical UTC instant handling
//! - [`core::attributes`] — attribute extraction and canonical encoding
//! - [`core::store`] — the `TimelineStore` trait and its row types
//! - [`core::sqlite_store`] — the SQLite-backed implementation
//! - [`core::merge`] — the merge engine (one fact at a time)
//! - [`core::batch`] — the watermark-gated batch driver
//! - [`core::query`] — the as-of projector
//!
//! # Public API
//!
//! [`initialize`], [`merge_records`], [`query_as_of`], [`get_watermark`] and
//! [`set_watermark`] are the surface most callers need; everything else in
//! `core` is exposed for callers that want to drive the transaction
//! boundary themselves.

pub mod cli;
pub mod core;

use crate::core::batch::{merge_batch, parse_fact};
use crate::core::config::EngineConfig;
use crate::core::error::Error;
use crate::core::sqlite_store::SqliteStore;
use crate::core::store::{MergeSummary, Segment};
use crate::core::time::Instant;
use clap::Parser;
use colored::Colorize;
use std::io::{BufRead, Write};
use std::path::Path;

/// Opens (creating if needed) the store at `db_path`, running schema setup.
pub fn initialize(
    db_path: impl AsRef<Path>,
    watermark_name: impl Into<String>,
) -> Result<SqliteStore, Error> {
    SqliteStore::open(db_path, watermark_name)
}

/// Merges a batch of facts into the store in one transaction (spec §4.4,
/// §6.1). Returns summary statistics; never panics on a late or duplicate
/// fact, only on malformed input (caught earlier, by [`parse_fact`]).
pub fn merge_records(
    store: &mut SqliteStore,
    facts: Vec<crate::core::store::Fact>,
    knowledge_time: Instant,
    allow_late: bool,
) -> Result<MergeSummary, Error> {
    merge_batch(store, facts, knowledge_time, allow_late)
}

/// Projects the timeline as of `knowledge_time` (spec §4.5).
pub fn query_as_of(
    store: &mut SqliteStore,
    knowledge_time: Instant,
    effective_time: Option<Instant>,
    entity_ids: Option<&[String]>,
) -> Result<Vec<Segment>, Error> {
    crate::core::query::as_of(store, knowledge_time, effective_time, entity_ids)
}

/// Reads the current watermark, if one has ever been recorded.
pub fn get_watermark(store: &mut SqliteStore) -> Result<Option<Instant>, Error> {
    store.with_tx("watermark.get", |tx, ts| ts.watermark(tx))
}

/// Explicitly sets the watermark, rejecting any value that would regress it
/// (spec §4.4: the watermark only ever advances under normal batch
/// processing; an explicit `set` enforces the same rule rather than
/// offering a silent escape hatch).
pub fn set_watermark(store: &mut SqliteStore, value: Instant) -> Result<(), Error> {
    store.with_tx("watermark.set", |tx, ts| {
        if let Some(current) = ts.watermark(tx)?
            && value < current
        {
            return Err(Error::WatermarkRegression {
                attempted: value.to_string(),
                current: current.to_string(),
            });
        }
        ts.set_watermark_raw(tx, value)
    })
}

/// Parses the command line, dispatches to the requested operation, and
/// prints results. The sole entry point `main` calls.
pub fn run() -> Result<(), Error> {
    let cli = cli::Cli::parse();
    let config = EngineConfig {
        db_path: cli.db.to_string_lossy().to_string(),
        watermark_name: cli.watermark_name.clone(),
        ..EngineConfig::default()
    };

    match cli.command {
        cli::Command::Init => {
            initialize(&config.db_path, &config.watermark_name)?;
            println!(
                "{} database at {}",
                "initialized".green().bold(),
                config.db_path
            );
        }
        cli::Command::Merge(args) => run_merge(&config, args)?,
        cli::Command::QueryAsOf(args) => run_query_as_of(&config, args)?,
        cli::Command::Watermark(args) => run_watermark(&config, args)?,
    }
    Ok(())
}

fn run_merge(config: &EngineConfig, args: cli::MergeCli) -> Result<(), Error> {
    let knowledge_time = match &args.knowledge_time {
        Some(raw) => raw.parse::<Instant>()?,
        None => Instant::now(),
    };

    let file = std::fs::File::open(&args.input)?;
    let mut facts = Vec::new();
    for line in std::io::BufReader::new(file).lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let value: serde_json::Value = serde_json::from_str(trimmed)
            .map_err(|e| Error::BadTimestamp(format!("malformed JSON line: {e}")))?;
        let record = value
            .as_object()
            .ok_or_else(|| Error::MissingField("record must be a JSON object".to_string()))?;
        facts.push(parse_fact(record)?);
    }

    let mut store = initialize(&config.db_path, &config.watermark_name)?;
    let summary = merge_records(&mut store, facts, knowledge_time, args.allow_late)?;

    if args.format == "json" {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).expect("summary is always serializable")
        );
    } else {
        println!(
            "{} {} processed, {} skipped as late, {} rows inserted",
            "merged:".green().bold(),
            summary.processed,
            summary.skipped_as_late,
            summary.inserted_rows
        );
        if let Some(max_et) = summary.max_event_time {
            println!("watermark now at most {}", max_et);
        }
    }
    Ok(())
}

fn run_query_as_of(config: &EngineConfig, args: cli::QueryAsOfCli) -> Result<(), Error> {
    let knowledge_time = args.knowledge_time.parse::<Instant>()?;
    let effective_time = args
        .effective_time
        .as_deref()
        .map(str::parse::<Instant>)
        .transpose()?;
    let entity_ids = if args.entity.is_empty() {
        None
    } else {
        Some(args.entity.as_slice())
    };

    let mut store = initialize(&config.db_path, &config.watermark_name)?;
    let segments = query_as_of(&mut store, knowledge_time, effective_time, entity_ids)?;

    if args.format == "json" {
        println!(
            "{}",
            serde_json::to_string_pretty(&segments).expect("segments are always serializable")
        );
    } else {
        for seg in &segments {
            println!(
                "{}  valid [{}, {})  {}",
                seg.entity_id.bold(),
                seg.valid_from,
                seg.valid_to
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "open".to_string()),
                seg.attributes
            );
        }
        println!("{} segments", segments.len());
    }
    Ok(())
}

fn run_watermark(config: &EngineConfig, args: cli::WatermarkCli) -> Result<(), Error> {
    let mut store = initialize(&config.db_path, &config.watermark_name)?;
    match args.command {
        cli::WatermarkCommand::Get => match get_watermark(&mut store)? {
            Some(w) => println!("{}", w),
            None => println!("(none)"),
        },
        cli::WatermarkCommand::Set { value } => {
            let value = value.parse::<Instant>()?;
            set_watermark(&mut store, value)?;
            println!("{} {}", "watermark set to".green().bold(), value);
        }
    }
    Ok(())
}

/// Writes a human-readable error to stderr, colored the way the teacher's
/// CLI reports failures, for `main` to call before exiting non-zero.
pub fn report_error(err: &Error) {
    let _ = writeln!(std::io::stderr(), "{} {}", "error:".red().bold(), err);
}
