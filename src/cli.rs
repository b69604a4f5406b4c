//! Command-line interface definitions for findex.
//!
//! This module defines all CLI arguments, subcommands, and options using the clap derive API.
//! Global options (verbosity, color, configuration) apply to every subcommand.
//!
//! # Example
//!
//! ```bash
//! # Index a directory into files.db
//! findex index files.db ~/Pictures
//!
//! # List duplicate groups as JSON
//! findex duplicates files.db --output json
//!
//! # Verbose mode for debugging
//! findex -v index files.db ~/Pictures --ignore '*.tmp'
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::scanner::HashAlgorithm;

/// Incremental content-addressed file index with duplicate detection.
///
/// findex records a content hash for every file under a directory in a
/// single SQLite database. Rescans only rehash files whose size or change
/// timestamp moved.
#[derive(Debug, Parser)]
#[command(name = "findex")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Read configuration from this TOML file instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Report fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory (or a single file) into the index
    Index(IndexArgs),
    /// List groups of indexed files with identical content
    #[command(visible_alias = "dups")]
    Duplicates(DuplicatesArgs),
    /// Show a summary of the index contents
    Stats(StatsArgs),
}

/// Arguments for the index subcommand.
#[derive(Debug, Args)]
pub struct IndexArgs {
    /// Index database file (created if missing)
    #[arg(value_name = "DATABASE")]
    pub database: PathBuf,

    /// Directory or file to index
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Glob patterns to ignore (can be specified multiple times)
    ///
    /// Patterns use gitignore syntax and are matched relative to PATH.
    /// Files matching a pattern are dropped from the index.
    #[arg(short, long = "ignore", value_name = "PATTERN")]
    pub ignore_patterns: Vec<String>,

    /// Follow symbolic links during scan
    ///
    /// Symlink cycles are reported as per-file errors.
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (starting with .)
    #[arg(long)]
    pub skip_hidden: bool,

    /// Hash algorithm for a new index (must match an existing one)
    #[arg(long = "hash", value_enum, value_name = "ALGORITHM")]
    pub hash_algorithm: Option<HashAlgorithm>,
}

/// Arguments for the duplicates subcommand.
#[derive(Debug, Args)]
pub struct DuplicatesArgs {
    /// Index database file
    #[arg(value_name = "DATABASE")]
    pub database: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the stats subcommand.
#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Index database file
    #[arg(value_name = "DATABASE")]
    pub database: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON output for scripting
    Json,
    /// CSV output for spreadsheets
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
