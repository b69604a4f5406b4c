//! CSV output formatter for duplicate reports.
//!
//! One row is generated for each file in a duplicate group.
//!
//! # Columns
//!
//! - `group_id`: 1-based group number, in report order
//! - `hash`: content hash (hexadecimal)
//! - `path`: file path (lossy UTF-8)
//! - `size`: file size in bytes

use std::io;

use serde::Serialize;

use super::ReportError;
use crate::store::DuplicateGroup;

/// A single row in the CSV output.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    group_id: usize,
    hash: &'a str,
    path: String,
    size: u64,
}

/// CSV output formatter, written one group at a time.
pub struct CsvOutput<W: io::Write> {
    writer: ::csv::Writer<W>,
    groups_written: usize,
}

impl<W: io::Write> CsvOutput<W> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: ::csv::Writer::from_writer(writer),
            groups_written: 0,
        }
    }

    /// Write one row per path of `group`.
    ///
    /// The header precedes the first row, so a report without groups stays
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns `ReportError` if writing or serialization fails.
    pub fn write_group(&mut self, group: &DuplicateGroup) -> Result<(), ReportError> {
        self.groups_written += 1;
        for path in &group.paths {
            self.writer.serialize(CsvRow {
                group_id: self.groups_written,
                hash: group.hash.as_str(),
                path: path.to_string_lossy().into_owned(),
                size: group.size,
            })?;
        }
        Ok(())
    }

    /// Flush the remaining rows.
    ///
    /// # Errors
    ///
    /// Returns `ReportError` if flushing fails.
    pub fn finish(mut self) -> Result<(), ReportError> {
        self.writer.flush()?;
        Ok(())
    }
}
