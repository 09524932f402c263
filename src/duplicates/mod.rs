//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Chunked ingestion of raw items through the worker pool
//! - Grouping fingerprinted items and wasted-space accounting

pub mod finder;
pub mod groups;

pub use finder::{
    DuplicateFinder, FinderConfig, FinderError, ScanStats, DEFAULT_CHUNK_SIZE,
};
pub use groups::{build_scan_result, wasted_size_of, DuplicateGroup, ScanResult};
