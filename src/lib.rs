//! dupelens - duplicate and look-alike file finder
//!
//! Fingerprints a set of files on a pool of worker threads, groups matching
//! fingerprints into duplicate sets, reports wasted space, and applies
//! selections as in-memory removals.
//!
//! The engine is usable without the CLI:
//!
//! ```
//! use dupelens::actions::reconcile;
//! use dupelens::duplicates::DuplicateFinder;
//! use dupelens::scanner::RawItem;
//! use dupelens::selection::{smart_select, SmartPolicy};
//! use chrono::{Duration, Utc};
//!
//! let now = Utc::now();
//! let items = vec![
//!     RawItem::from_bytes("a.txt", b"same".to_vec(), now - Duration::days(1)),
//!     RawItem::from_bytes("b.txt", b"same".to_vec(), now),
//! ];
//!
//! let (result, _) = DuplicateFinder::with_defaults().scan(items).unwrap();
//! let selection = smart_select(&result.groups, &SmartPolicy::Newest).unwrap();
//! let outcome = reconcile(&result, &selection);
//!
//! assert_eq!(outcome.recovered_size, 4);
//! assert!(outcome.result.groups.is_empty());
//! ```

pub mod actions;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod selection;
pub mod signal;

use std::fs;
use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::actions::begin_removal;
use crate::cli::{Cli, Commands, OutputFormat, ScanArgs};
use crate::config::Config;
use crate::duplicates::{DuplicateFinder, FinderError};
use crate::error::ExitCode;
use crate::output::{format_size, CsvOutput, JsonOutput, ScanSummary, TextReport};
use crate::progress::Progress;
use crate::scanner::walker::ScanError;
use crate::scanner::{RawItem, Walker};
use crate::selection::{selected_size, smart_select, Selection};
use crate::signal::ShutdownHandler;

/// Run the application for parsed arguments.
///
/// # Errors
///
/// Returns an error for bad configuration, missing paths, an invalid
/// selection pattern, an interrupted scan, or failed output.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Scan(args) => run_scan(&args, cli.quiet),
    }
}

fn run_scan(args: &ScanArgs, quiet: bool) -> Result<ExitCode> {
    let mut config = Config::load(args.config.as_deref())?;
    config.merge_scan_args(args);
    config.validate()?;

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(ExitCode::Success);
    }

    let policy = args.smart_policy().map_err(anyhow::Error::msg)?;
    if let Some(policy) = &policy {
        policy.validate()?;
    }
    let handler = signal::install_handler()?;

    let (items, walk_errors) = collect_items(args, &config, &handler)?;

    let progress = Arc::new(Progress::new(quiet || args.output != OutputFormat::Text));
    let finder = DuplicateFinder::new(
        config
            .finder_config()
            .with_shutdown_flag(handler.get_flag())
            .with_progress_callback(progress),
    );
    let (mut result, stats) = finder.scan(items)?;

    let mut exit_code = ExitCode::for_scan(&result, &stats);
    if walk_errors > 0 {
        exit_code = ExitCode::PartialSuccess;
    }

    let mut selection = Selection::new();
    if let Some(policy) = policy {
        selection = smart_select(&result.groups, &policy)?;
        if !quiet {
            eprintln!(
                "Selected {} item(s) ({}) with policy {}",
                selection.len(),
                format_size(selected_size(&result.groups, &selection)),
                policy
            );
        }
    }

    if args.remove {
        let outcome = begin_removal(&result, selection).commit_after(config.removal_delay());
        if !quiet {
            eprintln!(
                "Removed {} item(s) from the result, {} recovered",
                outcome.removed_count(),
                format_size(outcome.recovered_size)
            );
        }
        result = outcome.result;
        selection = outcome.selection;
    }

    if let Some(path) = &args.summary {
        let summary = ScanSummary::from_result(&result);
        fs::write(path, summary.to_json_pretty()?)
            .with_context(|| format!("failed to write summary to {}", path.display()))?;
        log::info!("Summary written to {}", path.display());
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.output {
        OutputFormat::Text => TextReport::new(&result)
            .with_selection(&selection)
            .write_to(&mut out)?,
        OutputFormat::Json => JsonOutput::new(&result, stats.unreadable + stats.timed_out, exit_code)
            .write_to(&mut out, true)?,
        OutputFormat::Csv => CsvOutput::new(&result.groups).write_to(&mut out)?,
    }
    out.flush()?;

    Ok(exit_code)
}

fn collect_items(
    args: &ScanArgs,
    config: &Config,
    handler: &ShutdownHandler,
) -> Result<(Vec<RawItem>, usize)> {
    let walker = Walker::new(args.paths.clone(), config.walker_config())
        .with_shutdown_flag(handler.get_flag());

    let mut items = Vec::new();
    let mut errors = 0usize;
    for entry in walker.walk() {
        match entry {
            Ok(item) => items.push(item),
            Err(ScanError::NotFound(path)) => bail!("path not found: {}", path.display()),
            Err(e) => {
                log::warn!("{}", e);
                errors += 1;
            }
        }
    }

    if handler.is_shutdown_requested() {
        return Err(FinderError::Interrupted.into());
    }
    log::info!("Collected {} file(s) from {} path(s)", items.len(), args.paths.len());
    Ok((items, errors))
}
