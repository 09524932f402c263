//! JSON output formatter for scan results.
//!
//! Provides machine-readable JSON output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "summary": {
//!     "total_files": 3,
//!     "total_size": 250,
//!     "total_size_human": "250 B",
//!     "wasted_space": 100,
//!     "wasted_space_human": "100 B",
//!     "duplicate_groups": 1,
//!     "duplicate_files": 1,
//!     "unique_count": 2,
//!     "unreadable_items": 0,
//!     "exit_code": 0,
//!     "exit_code_name": "DL000"
//!   },
//!   "duplicate_groups": [
//!     {
//!       "hash": "ab12...",
//!       "wasted_size": 100,
//!       "wasted_size_human": "100 B",
//!       "files": [
//!         {
//!           "name": "a.txt",
//!           "path": "docs/a.txt",
//!           "size": 100,
//!           "last_modified": "2024-01-01T00:00:00.000Z",
//!           "status": "Original"
//!         }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::io::Write;

use chrono::SecondsFormat;
use serde::Serialize;

use super::{format_size, MemberStatus};
use crate::duplicates::{DuplicateGroup, ScanResult};
use crate::error::ExitCode;
use crate::scanner::Item;

/// One member of a group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonFile {
    /// Display name
    pub name: String,
    /// Path relative to the selection root
    pub path: String,
    /// Size in bytes
    pub size: u64,
    /// Last modified time (ISO 8601, UTC, milliseconds)
    pub last_modified: String,
    /// Original or duplicate
    pub status: MemberStatus,
}

impl JsonFile {
    fn from_item(item: &Item, index: usize) -> Self {
        Self {
            name: item.name.clone(),
            path: item.relative_path.clone(),
            size: item.size,
            last_modified: item.modified.to_rfc3339_opts(SecondsFormat::Millis, true),
            status: MemberStatus::at(index),
        }
    }
}

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// Shared fingerprint
    pub hash: String,
    /// Wasted size in bytes
    pub wasted_size: u64,
    /// Wasted size, human readable
    pub wasted_size_human: String,
    /// Members in group order
    pub files: Vec<JsonFile>,
}

impl JsonDuplicateGroup {
    /// Create a JSON group from a [`DuplicateGroup`].
    #[must_use]
    pub fn from_duplicate_group(group: &DuplicateGroup) -> Self {
        Self {
            hash: group.fingerprint.to_string(),
            wasted_size: group.wasted_size,
            wasted_size_human: format_size(group.wasted_size),
            files: group
                .members
                .iter()
                .enumerate()
                .map(|(index, item)| JsonFile::from_item(item, index))
                .collect(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Total number of items scanned
    pub total_files: usize,
    /// Total size of all scanned items in bytes
    pub total_size: u64,
    /// Total size, human readable
    pub total_size_human: String,
    /// Space taken by non-original members
    pub wasted_space: u64,
    /// Wasted space, human readable
    pub wasted_space_human: String,
    /// Number of duplicate groups
    pub duplicate_groups: usize,
    /// Number of non-original members
    pub duplicate_files: usize,
    /// Number of distinct fingerprints
    pub unique_count: usize,
    /// Items that could not be fingerprinted
    pub unreadable_items: usize,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "DL000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Create a JSON summary from a result and an exit code.
    #[must_use]
    pub fn from_result(result: &ScanResult, unreadable_items: usize, exit_code: ExitCode) -> Self {
        Self {
            total_files: result.total_files,
            total_size: result.total_size,
            total_size_human: format_size(result.total_size),
            wasted_space: result.wasted_space,
            wasted_space_human: format_size(result.wasted_space),
            duplicate_groups: result.group_count(),
            duplicate_files: result.duplicate_file_count(),
            unique_count: result.unique_count,
            unreadable_items,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Scan summary statistics
    pub summary: JsonSummary,
    /// Duplicate groups, largest wasted size first
    pub duplicate_groups: Vec<JsonDuplicateGroup>,
}

impl JsonOutput {
    /// Create a new JSON output.
    ///
    /// # Arguments
    ///
    /// * `result` - The scan result
    /// * `unreadable_items` - Items that were made unique because they failed
    /// * `exit_code` - The exit code for this run
    #[must_use]
    pub fn new(result: &ScanResult, unreadable_items: usize, exit_code: ExitCode) -> Self {
        Self {
            summary: JsonSummary::from_result(result, unreadable_items, exit_code),
            duplicate_groups: result
                .groups
                .iter()
                .map(JsonDuplicateGroup::from_duplicate_group)
                .collect(),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duplicates::build_scan_result;
    use crate::scanner::{Fingerprint, ItemId};
    use chrono::{DateTime, Utc};

    fn item(id: u64, fp: &str, size: u64) -> Item {
        Item {
            id: ItemId(id),
            name: format!("file{id}.txt"),
            relative_path: format!("docs/file{id}.txt"),
            size,
            content_type: Some("text/plain".into()),
            modified: DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000).unwrap(),
            fingerprint: Fingerprint::new(fp),
        }
    }

    fn sample() -> ScanResult {
        build_scan_result(vec![
            item(0, "h1", 100),
            item(1, "h1", 100),
            item(2, "h2", 50),
            item(3, "h3", 10),
            item(4, "h3", 10),
            item(5, "h3", 10),
        ])
    }

    #[test]
    fn test_json_output_empty() {
        let output = JsonOutput::new(&ScanResult::default(), 0, ExitCode::NoDuplicates);
        assert!(output.duplicate_groups.is_empty());
        assert_eq!(output.summary.total_files, 0);
        assert_eq!(output.summary.exit_code, 2);
        assert_eq!(output.summary.exit_code_name, "DL002");
    }

    #[test]
    fn test_json_output_with_groups() {
        let output = JsonOutput::new(&sample(), 1, ExitCode::PartialSuccess);

        assert_eq!(output.duplicate_groups.len(), 2);
        assert_eq!(output.duplicate_groups[0].hash, "h1");
        assert_eq!(output.duplicate_groups[0].files.len(), 2);
        assert_eq!(output.duplicate_groups[1].files.len(), 3);
        assert_eq!(output.summary.duplicate_groups, 2);
        assert_eq!(output.summary.duplicate_files, 3);
        assert_eq!(output.summary.wasted_space, 120);
        assert_eq!(output.summary.unique_count, 3);
        assert_eq!(output.summary.unreadable_items, 1);
    }

    #[test]
    fn test_member_status_and_timestamp() {
        let output = JsonOutput::new(&sample(), 0, ExitCode::Success);
        let files = &output.duplicate_groups[1].files;

        assert_eq!(files[0].status, MemberStatus::Original);
        assert_eq!(files[1].status, MemberStatus::Duplicate);
        assert_eq!(files[2].status, MemberStatus::Duplicate);
        assert_eq!(files[0].last_modified, "2023-11-14T22:13:20.000Z");
        assert_eq!(files[0].path, "docs/file3.txt");
    }

    #[test]
    fn test_to_json_compact() {
        let output = JsonOutput::new(&ScanResult::default(), 0, ExitCode::NoDuplicates);
        let json = output.to_json().unwrap();
        assert!(!json.contains('\n'));
        assert!(json.starts_with('{'));
    }

    #[test]
    fn test_write_to_parses_back() {
        let output = JsonOutput::new(&sample(), 0, ExitCode::Success);
        let mut buf = Vec::new();
        output.write_to(&mut buf, true).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["summary"]["total_files"], 6);
        assert_eq!(value["duplicate_groups"][0]["files"][0]["status"], "Original");
        assert_eq!(value["duplicate_groups"][0]["files"][1]["status"], "Duplicate");
    }
}
