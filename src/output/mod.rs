//! Output formatters for scan results.
//!
//! This module provides different output formats for scan results:
//! - Plain text report for the terminal
//! - JSON for automation and scripting
//! - CSV for spreadsheet import
//! - [`ScanSummary`], the compact record handed to a history store
//!
//! # Example
//!
//! ```
//! use dupelens::duplicates::ScanResult;
//! use dupelens::error::ExitCode;
//! use dupelens::output::JsonOutput;
//!
//! let result = ScanResult::default();
//! let output = JsonOutput::new(&result, 0, ExitCode::NoDuplicates);
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

pub mod csv;
pub mod json;
pub mod summary;
pub mod text;

use std::fmt;

use bytesize::ByteSize;
use serde::Serialize;

// Re-export main types
pub use csv::{CsvOutput, CsvOutputError};
pub use json::{JsonOutput, JsonOutputError};
pub use summary::{ScanSummary, TopGroup};
pub use text::TextReport;

/// Role of a member inside its group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MemberStatus {
    /// Member 0, the copy that is kept
    Original,
    /// Any later member
    Duplicate,
}

impl MemberStatus {
    /// Status of the member at `index` in its group.
    #[must_use]
    pub fn at(index: usize) -> Self {
        if index == 0 {
            Self::Original
        } else {
            Self::Duplicate
        }
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Original => write!(f, "Original"),
            Self::Duplicate => write!(f, "Duplicate"),
        }
    }
}

/// Human-readable byte count in binary units.
#[must_use]
pub fn format_size(bytes: u64) -> String {
    ByteSize::b(bytes).to_string()
}
