//! Compact scan record for a history store.
//!
//! The full result is too large to keep around; a [`ScanSummary`] keeps the
//! totals and the five most wasteful groups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::duplicates::ScanResult;

/// Number of groups kept in a summary.
pub const TOP_GROUPS: usize = 5;

/// One of the most wasteful groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopGroup {
    /// Name of the group's original
    pub name: String,
    /// Wasted size in bytes
    pub wasted: u64,
}

/// Write-only summary of a finished scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// When the summary was taken
    pub recorded_at: DateTime<Utc>,
    /// Number of items scanned
    pub total_files: usize,
    /// Total size of all items scanned
    pub total_size: u64,
    /// Space taken by non-original members
    pub wasted_space: u64,
    /// Number of duplicate groups
    pub duplicate_count: usize,
    /// Up to five groups, largest wasted size first
    pub top_duplicates: Vec<TopGroup>,
}

impl ScanSummary {
    /// Summarize `result` as of now.
    #[must_use]
    pub fn from_result(result: &ScanResult) -> Self {
        Self::at(result, Utc::now())
    }

    /// Summarize `result` with an explicit timestamp.
    #[must_use]
    pub fn at(result: &ScanResult, recorded_at: DateTime<Utc>) -> Self {
        Self {
            recorded_at,
            total_files: result.total_files,
            total_size: result.total_size,
            wasted_space: result.wasted_space,
            duplicate_count: result.group_count(),
            top_duplicates: result
                .groups
                .iter()
                .take(TOP_GROUPS)
                .filter_map(|g| {
                    g.original().map(|item| TopGroup {
                        name: item.name.clone(),
                        wasted: g.wasted_size,
                    })
                })
                .collect(),
        }
    }

    /// Serialize as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
