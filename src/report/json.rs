//! JSON output formatter for duplicate reports.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "algorithm": "sha1",
//!   "duplicates": [
//!     {
//!       "hash": "aaf4c61d...",
//!       "size": 5,
//!       "files": ["/path/to/a.txt", "/path/to/b.txt"]
//!     }
//!   ],
//!   "summary": {
//!     "duplicate_groups": 1,
//!     "duplicate_files": 2,
//!     "reclaimable_space": 5
//!   }
//! }
//! ```
//!
//! Paths that are not valid UTF-8 are rendered lossily.

use std::io::Write;

use serde::Serialize;

use super::{DuplicateReport, ReportError};
use crate::scanner::HashAlgorithm;
use crate::store::DuplicateGroup;

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// Content hash as lowercase hex
    pub hash: String,
    /// File size in bytes
    pub size: u64,
    /// Paths of all copies, sorted
    pub files: Vec<String>,
}

impl JsonDuplicateGroup {
    /// Convert a stored group.
    #[must_use]
    pub fn from_duplicate_group(group: &DuplicateGroup) -> Self {
        Self {
            hash: group.hash.as_str().to_string(),
            size: group.size,
            files: group
                .paths
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Number of duplicate groups
    pub duplicate_groups: usize,
    /// Number of files across all groups
    pub duplicate_files: usize,
    /// Bytes freed by keeping one copy per group
    pub reclaimable_space: u64,
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Digest algorithm of the index
    pub algorithm: HashAlgorithm,
    /// List of duplicate groups
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Totals
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Create the JSON view of a report.
    #[must_use]
    pub fn new(report: &DuplicateReport) -> Self {
        Self {
            algorithm: report.algorithm(),
            duplicates: report
                .groups()
                .iter()
                .map(JsonDuplicateGroup::from_duplicate_group)
                .collect(),
            summary: JsonSummary {
                duplicate_groups: report.groups().len(),
                duplicate_files: report.file_count(),
                reclaimable_space: report.reclaimable_bytes(),
            },
        }
    }

    /// Serialize to a pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write pretty-printed JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns `ReportError` if writing or serialization fails.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), ReportError> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}
