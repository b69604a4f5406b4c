//! Reports over the index contents.
//!
//! This module renders query results for humans and scripts:
//! - [`write_duplicates`]: duplicate groups streamed from the index as
//!   text, JSON or CSV
//! - [`DuplicateReport`]: the same renderings over groups held in memory
//! - [`write_stats`]: store summary
//! - [`ActionPrinter`]: per-file `A`/`U`/`D`/`E` lines during a scan
//!
//! # Example
//!
//! ```no_run
//! use findex::cli::OutputFormat;
//! use findex::report::write_duplicates;
//! use findex::store::{IndexStore, StoreOptions};
//! use std::path::Path;
//!
//! let store = IndexStore::open(Path::new("files.db"), &StoreOptions::existing()).unwrap();
//! let totals = write_duplicates(&store, std::io::stdout(), OutputFormat::Text).unwrap();
//! println!("{} groups", totals.groups);
//! ```

pub mod actions;
pub mod csv;
pub mod json;

use std::io::{self, Write};

use bytesize::ByteSize;
use thiserror::Error;

use crate::cli::OutputFormat;
use crate::scanner::HashAlgorithm;
use crate::store::{DuplicateGroup, IndexStore, StoreError, StoreStats};

pub use self::actions::ActionPrinter;
pub use self::csv::CsvOutput;
pub use self::json::JsonOutput;

/// Errors that can occur while producing a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Reading the index failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during JSON serialization.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),
}

/// Running totals over rendered duplicate groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportTotals {
    /// Number of duplicate groups
    pub groups: usize,
    /// Number of files across all groups
    pub files: usize,
    /// Bytes freed by keeping one copy per group
    pub reclaimable_bytes: u64,
}

impl ReportTotals {
    /// Count one more group.
    pub fn add(&mut self, group: &DuplicateGroup) {
        self.groups += 1;
        self.files += group.len();
        self.reclaimable_bytes += group.reclaimable_bytes();
    }

    /// Whether no groups were counted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups == 0
    }
}

/// Human-readable duplicate listing, written one group at a time.
///
/// ```text
/// <hash>  <n> files × <size>
///     <path>
///     <path>
///
/// <groups> duplicate groups, <files> files, <size> reclaimable
/// ```
#[derive(Debug)]
pub struct TextOutput<W: Write> {
    writer: W,
}

impl<W: Write> TextOutput<W> {
    /// Create a text writer.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write one group block.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    pub fn write_group(&mut self, group: &DuplicateGroup) -> io::Result<()> {
        writeln!(
            self.writer,
            "{}  {} files × {}",
            group.hash,
            group.len(),
            ByteSize::b(group.size)
        )?;
        for path in &group.paths {
            writeln!(self.writer, "    {}", path.display())?;
        }
        writeln!(self.writer)
    }

    /// Write the footer (or the empty-report notice) and flush.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    pub fn finish(mut self, totals: &ReportTotals) -> io::Result<()> {
        if totals.is_empty() {
            writeln!(self.writer, "No duplicate files found.")?;
        } else {
            writeln!(
                self.writer,
                "{} duplicate groups, {} files, {} reclaimable",
                totals.groups,
                totals.files,
                ByteSize::b(totals.reclaimable_bytes)
            )?;
        }
        self.writer.flush()
    }
}

/// Render the duplicate groups of `store` in `format`.
///
/// Text and CSV are written while the query runs, holding one group at a
/// time. JSON needs the totals up front, so its groups are collected first.
///
/// # Errors
///
/// Returns `ReportError` if the query, writing or serialization fails.
pub fn write_duplicates<W: Write>(
    store: &IndexStore,
    writer: W,
    format: OutputFormat,
) -> Result<ReportTotals, ReportError> {
    let mut totals = ReportTotals::default();
    match format {
        OutputFormat::Text => {
            let mut out = TextOutput::new(writer);
            store.for_each_duplicate_group(|group| {
                out.write_group(&group)?;
                totals.add(&group);
                Ok::<(), ReportError>(())
            })?;
            out.finish(&totals)?;
        }
        OutputFormat::Csv => {
            let mut out = CsvOutput::new(writer);
            store.for_each_duplicate_group(|group| {
                out.write_group(&group)?;
                totals.add(&group);
                Ok::<(), ReportError>(())
            })?;
            out.finish()?;
        }
        OutputFormat::Json => {
            let report = DuplicateReport::from_store(store)?;
            report.write_to(writer, format)?;
            totals = report.totals();
        }
    }
    Ok(totals)
}

/// Duplicate groups read from one index.
#[derive(Debug, Clone)]
pub struct DuplicateReport {
    algorithm: HashAlgorithm,
    groups: Vec<DuplicateGroup>,
}

impl DuplicateReport {
    /// Build a report from groups already in query order.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm, groups: Vec<DuplicateGroup>) -> Self {
        Self { algorithm, groups }
    }

    /// Query every duplicate group from `store`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails (for example, when a scan
    /// holds the lock).
    pub fn from_store(store: &IndexStore) -> Result<Self, StoreError> {
        Ok(Self::new(store.algorithm(), store.duplicate_groups()?))
    }

    /// Digest algorithm of the groups' hashes.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Groups ordered by hash.
    #[must_use]
    pub fn groups(&self) -> &[DuplicateGroup] {
        &self.groups
    }

    /// Whether no duplicates were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Group, file and byte totals.
    #[must_use]
    pub fn totals(&self) -> ReportTotals {
        let mut totals = ReportTotals::default();
        for group in &self.groups {
            totals.add(group);
        }
        totals
    }

    /// Number of files across all groups.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.totals().files
    }

    /// Bytes freed by keeping one copy per group.
    #[must_use]
    pub fn reclaimable_bytes(&self) -> u64 {
        self.totals().reclaimable_bytes
    }

    /// Render the report in `format`.
    ///
    /// # Errors
    ///
    /// Returns `ReportError` if writing or serialization fails.
    pub fn write_to<W: Write>(&self, writer: W, format: OutputFormat) -> Result<(), ReportError> {
        match format {
            OutputFormat::Text => {
                let mut out = TextOutput::new(writer);
                for group in &self.groups {
                    out.write_group(group)?;
                }
                out.finish(&self.totals())?;
            }
            OutputFormat::Json => JsonOutput::new(self).write_to(writer)?,
            OutputFormat::Csv => {
                let mut out = CsvOutput::new(writer);
                for group in &self.groups {
                    out.write_group(group)?;
                }
                out.finish()?;
            }
        }
        Ok(())
    }
}

/// Render store statistics in `format`.
///
/// # Errors
///
/// Returns `ReportError` if writing or serialization fails.
pub fn write_stats<W: Write>(
    mut writer: W,
    stats: &StoreStats,
    format: OutputFormat,
) -> Result<(), ReportError> {
    match format {
        OutputFormat::Text => {
            let last_scan = match stats.last_generation {
                Some(generation) => match generation.to_datetime() {
                    Some(at) => format!("{} (generation {})", at.to_rfc3339(), generation),
                    None => format!("generation {generation}"),
                },
                None => "never".to_string(),
            };
            writeln!(writer, "Algorithm:        {}", stats.algorithm)?;
            writeln!(writer, "Files:            {}", stats.records)?;
            writeln!(writer, "Distinct hashes:  {}", stats.distinct_hashes)?;
            writeln!(writer, "Duplicate groups: {}", stats.duplicate_groups)?;
            writeln!(writer, "Total size:       {}", ByteSize::b(stats.total_bytes))?;
            writeln!(writer, "Last scan:        {last_scan}")?;
            writer.flush()?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, stats)?;
            writeln!(writer)?;
        }
        OutputFormat::Csv => {
            let mut csv_writer = ::csv::Writer::from_writer(writer);
            csv_writer.serialize(stats)?;
            csv_writer.flush()?;
        }
    }
    Ok(())
}
