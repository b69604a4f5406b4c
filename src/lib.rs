//! findex - incremental content-addressed file index
//!
//! findex keeps one fingerprint (content hash, path, size, change timestamp)
//! per file in a single SQLite database. Rescans touch unchanged files
//! without reading them, rehash the rest, and purge files that disappeared.
//! The index answers "which files have identical content?".
//!
//! # Modules
//!
//! - [`scanner`]: directory walking, fingerprints and content hashing
//! - [`store`]: the SQLite index and its queries
//! - [`indexer`]: the incremental scan algorithm
//! - [`report`]: duplicate and statistics output
//! - [`cli`], [`config`], [`error`], [`logging`], [`signal`]: application shell

pub mod cli;
pub mod config;
pub mod error;
pub mod indexer;
pub mod logging;
pub mod report;
pub mod scanner;
pub mod signal;
pub mod store;

use std::io::{self, IsTerminal, Write};

use anyhow::{Context, Result};

use crate::cli::{Cli, Commands, DuplicatesArgs, IndexArgs, StatsArgs};
use crate::config::Config;
use crate::error::ExitCode;
use crate::indexer::{Indexer, IndexerConfig};
use crate::report::ActionPrinter;
use crate::store::{Generation, IndexStore};

/// Run the application with parsed arguments.
///
/// # Errors
///
/// Returns an error for configuration problems, lock conflicts, database
/// failures, an unusable scan root, or an interrupted scan. Per-file
/// problems are not errors; they yield [`ExitCode::PartialSuccess`].
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let config = Config::load(cli.config.as_deref())?;
    log::debug!("Configuration: {:?}", config);

    let color = !cli.no_color && io::stdout().is_terminal();

    match &cli.command {
        Commands::Index(args) => run_index(args, config, color, cli.quiet),
        Commands::Duplicates(args) => run_duplicates(args, &config),
        Commands::Stats(args) => run_stats(args, &config),
    }
}

fn run_index(args: &IndexArgs, mut config: Config, color: bool, quiet: bool) -> Result<ExitCode> {
    config.merge_index_args(args);

    let handler = signal::install_handler()?;
    let mut store = IndexStore::open(&args.database, &config.store_options())?;
    let generation = Generation::next_after(store.last_generation()?);

    let indexer = Indexer::new(
        IndexerConfig::new(config.walker_config()).with_shutdown_flag(handler.get_flag()),
    );

    let out: Box<dyn Write> = if quiet {
        Box::new(io::sink())
    } else {
        Box::new(io::stdout().lock())
    };
    let mut printer = ActionPrinter::new(out, io::stderr()).with_color(color);

    let summary = indexer.index(&mut store, &args.path, generation, &mut printer)?;
    printer.finish().context("Failed to write scan output")?;

    if summary.has_errors() {
        log::warn!(
            "{} files could not be indexed",
            summary.errors.len()
        );
        Ok(ExitCode::PartialSuccess)
    } else {
        Ok(ExitCode::Success)
    }
}

fn run_duplicates(args: &DuplicatesArgs, config: &Config) -> Result<ExitCode> {
    let store = IndexStore::open(&args.database, &config.existing_store_options())?;
    let totals = report::write_duplicates(&store, io::stdout().lock(), args.output)
        .context("Failed to write duplicate report")?;

    if totals.is_empty() {
        Ok(ExitCode::NoDuplicates)
    } else {
        Ok(ExitCode::Success)
    }
}

fn run_stats(args: &StatsArgs, config: &Config) -> Result<ExitCode> {
    let store = IndexStore::open(&args.database, &config.existing_store_options())?;
    let stats = store.stats()?;

    report::write_stats(io::stdout().lock(), &stats, args.output)
        .context("Failed to write statistics")?;
    Ok(ExitCode::Success)
}
