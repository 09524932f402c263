//! Command-line interface definitions for dupelens.
//!
//! Global options control verbosity and error format; the `scan` subcommand
//! walks one or more paths, groups duplicates, and optionally applies a smart
//! selection and an in-memory removal.
//!
//! # Example
//!
//! ```bash
//! # Exact duplicates, text report
//! dupelens scan ~/Pictures
//!
//! # Visually similar images, JSON for scripting
//! dupelens scan ~/Pictures --mode visual --output json
//!
//! # Mark everything but the oldest copy and show what would be recovered
//! dupelens scan ~/Pictures --select newest --remove
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::scanner::{ExactAlgorithm, MatchMode};
use crate::selection::SmartPolicy;

/// Find byte-identical and visually similar files.
///
/// dupelens fingerprints every file (SHA-256 or BLAKE3, or a perceptual hash
/// for images in visual mode), groups matches, and reports recoverable space.
/// Nothing is ever deleted from disk.
#[derive(Debug, Parser)]
#[command(name = "dupelens")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan paths for duplicate files
    Scan(ScanArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Files or directories to scan
    #[arg(value_name = "PATH", required_unless_present = "print_config")]
    pub paths: Vec<PathBuf>,

    /// Matching mode
    #[arg(long, value_enum)]
    pub mode: Option<MatchMode>,

    /// Digest used for exact matching
    #[arg(long, value_enum)]
    pub algorithm: Option<ExactAlgorithm>,

    /// Hash undecodable images exactly instead of treating them as unique
    #[arg(long)]
    pub perceptual_fallback: bool,

    /// Items dispatched per chunk
    #[arg(long, value_name = "N")]
    pub chunk_size: Option<usize>,

    /// Worker threads per fingerprint family
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Treat an item as unique if its fingerprint takes longer than this
    #[arg(long, value_name = "MS")]
    pub request_timeout_ms: Option<u64>,

    /// Smart-select policy applied to every group
    #[arg(long, value_enum)]
    pub select: Option<SelectArg>,

    /// Case-insensitive name pattern for `--select pattern`
    #[arg(long, value_name = "REGEX")]
    pub pattern: Option<String>,

    /// Remove the selection from the result (in memory only)
    #[arg(long, requires = "select")]
    pub remove: bool,

    /// Delay before the removal is applied
    #[arg(long, value_name = "MS")]
    pub removal_delay_ms: Option<u64>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Write a compact JSON summary of the scan to this file
    #[arg(long, value_name = "FILE")]
    pub summary: Option<PathBuf>,

    /// Minimum file size to consider (e.g., 1KB, 1MB, 1GB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub min_size: Option<u64>,

    /// Maximum file size to consider (e.g., 1KB, 1MB, 1GB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub max_size: Option<u64>,

    /// Follow symbolic links during scan
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (starting with .)
    #[arg(long)]
    pub skip_hidden: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,
}

impl ScanArgs {
    /// The smart-select policy requested on the command line, if any.
    ///
    /// # Errors
    ///
    /// Returns a message when `--select pattern` is given without `--pattern`.
    pub fn smart_policy(&self) -> Result<Option<SmartPolicy>, String> {
        match self.select {
            None => Ok(None),
            Some(SelectArg::Newest) => Ok(Some(SmartPolicy::Newest)),
            Some(SelectArg::Oldest) => Ok(Some(SmartPolicy::Oldest)),
            Some(SelectArg::Pattern) => self
                .pattern
                .clone()
                .map(|p| Some(SmartPolicy::Pattern(p)))
                .ok_or_else(|| "--select pattern requires --pattern".to_string()),
        }
    }
}

/// Smart-select policy names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SelectArg {
    /// Keep the oldest copy in each group
    Newest,
    /// Keep the newest copy in each group
    Oldest,
    /// Select copies whose name matches --pattern
    Pattern,
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report
    Text,
    /// JSON for scripting
    Json,
    /// CSV, one row per group member
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Parse a size with an optional unit suffix.
///
/// Supports B, KB, KiB, MB, MiB, GB, GiB, TB, TiB (case-insensitive).
///
/// # Errors
///
/// Returns a message for empty input, a bad number, or an unknown suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
