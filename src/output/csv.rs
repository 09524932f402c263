//! CSV output formatter for scan results.
//!
//! One row is generated for each member of each duplicate group.
//!
//! # Columns
//!
//! - `group_hash`: Fingerprint shared by the group
//! - `name`: Display name
//! - `path`: Path relative to the selection root
//! - `size`: Size in bytes
//! - `status`: `Original` for the first member, `Duplicate` otherwise
//! - `last_modified`: Last modified time (ISO 8601, UTC)
//!
//! # Example
//!
//! ```
//! use dupelens::output::csv::CsvOutput;
//!
//! let output = CsvOutput::new(&[]);
//! let csv = output.to_string().unwrap();
//! assert!(csv.is_empty());
//! ```

use std::io;

use chrono::SecondsFormat;
use serde::Serialize;
use thiserror::Error;

use super::MemberStatus;
use crate::duplicates::DuplicateGroup;

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    group_hash: &'a str,
    name: &'a str,
    path: &'a str,
    size: u64,
    status: MemberStatus,
    last_modified: String,
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    groups: &'a [DuplicateGroup],
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(groups: &'a [DuplicateGroup]) -> Self {
        Self { groups }
    }

    /// Write the CSV output to the given writer.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        for group in self.groups {
            for (index, item) in group.members.iter().enumerate() {
                csv_writer.serialize(CsvRow {
                    group_hash: group.fingerprint.as_str(),
                    name: &item.name,
                    path: &item.relative_path,
                    size: item.size,
                    status: MemberStatus::at(index),
                    last_modified: item.modified.to_rfc3339_opts(SecondsFormat::Millis, true),
                })?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}
