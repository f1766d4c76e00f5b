//! Command-line interface for dirshape.
//!
//! Three subcommands wrap the library:
//! - `scan` prints every directory under a source that matches a pattern
//! - `shuffle` scans, then copies each match under a destination directory
//! - `assess` prints the pattern roots that contain a given file
//!
//! Patterns are always loaded from declaration files given with `--pattern`.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::config::DirshapeConfig;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::logging;
use crate::output::OutputFormatter;
use crate::pattern::StructurePattern;
use crate::scan::ScanResult;
use crate::shuffle::{DEFAULT_WORKERS, ShuffleInput, ShuffleOptions, ShuffleReport};

/// dirshape: find directory trees by shape and copy them elsewhere.
#[derive(Debug, Parser)]
#[command(name = "dirshape", version)]
#[command(about = "Match directory trees against structure patterns", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity (-v warnings, -vv info, -vvv debug)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// Configuration file (defaults to ./.dirshape.toml, then ~/.config/dirshape/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan a directory for patterns and print matching paths
    Scan {
        source: PathBuf,

        /// Pattern declaration file (repeatable)
        #[arg(short = 'p', long = "pattern", required = true)]
        patterns: Vec<PathBuf>,
    },

    /// Scan for patterns and copy matching directories to a destination
    Shuffle(ShuffleArgs),

    /// Print the pattern roots that contain a file
    Assess {
        file: PathBuf,

        /// Pattern declaration file (repeatable)
        #[arg(short = 'p', long = "pattern", required = true)]
        patterns: Vec<PathBuf>,
    },
}

#[derive(Debug, Args)]
pub struct ShuffleArgs {
    pub source: PathBuf,

    pub destination: PathBuf,

    /// Pattern declaration file (repeatable)
    #[arg(short = 'p', long = "pattern", required = true)]
    pub patterns: Vec<PathBuf>,

    /// Copy into destinations that already exist
    #[arg(long)]
    pub overwrite: bool,

    /// Show what would be copied without writing anything
    #[arg(long)]
    pub dryrun: bool,

    /// Copy matches on a worker pool
    #[arg(long)]
    pub parallel: bool,

    /// Worker pool size (implies --parallel)
    #[arg(long)]
    pub workers: Option<NonZeroUsize>,
}

/// Process exit status for a failed run.
///
/// Bad pattern files and bad configuration are usage errors (2); anything
/// that goes wrong while touching the filesystem is a runtime error (1).
pub fn exit_code(error: &Error) -> u8 {
    match error {
        Error::InvalidGlob { .. }
        | Error::InvalidDeclaration(_)
        | Error::PatternFile { .. }
        | Error::Config(_) => 2,
        _ => 1,
    }
}

/// Runs the parsed command line.
///
/// Loads configuration, installs logging, then dispatches the subcommand.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use dirshape::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["dirshape", "scan", "/data", "-p", "pattern.json"]);
/// if let Err(e) = run_cli(&cli) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(cli: &Cli) -> Result<()> {
    let config = DirshapeConfig::load(cli.config.as_deref())?;
    logging::init(cli.verbosity, logging::log_file(&config.logging).as_deref())?;

    let engine = config.build_engine();
    tracing::debug!(
        walker = engine.walker_name(),
        globs = engine.glob_backend(),
        "Engine configured"
    );

    match &cli.command {
        Command::Scan { source, patterns } => {
            let matches = scan_matches(&engine, source, patterns)?;
            OutputFormatter::paths(matches.iter().map(|found| found.root.as_path()));
        }
        Command::Shuffle(args) => {
            shuffle_matches(&engine, args)?;
        }
        Command::Assess { file, patterns } => {
            assess_file(&engine, file, patterns)?;
        }
    }
    Ok(())
}

/// Loads every declaration file, failing on the first bad one.
pub fn load_patterns(engine: &Engine, paths: &[PathBuf]) -> Result<Vec<StructurePattern>> {
    paths.iter().map(|path| engine.load_pattern(path)).collect()
}

/// Scans `source` and returns the matches ordered by path.
pub fn scan_matches(engine: &Engine, source: &Path, pattern_paths: &[PathBuf]) -> Result<Vec<ScanResult>> {
    let patterns = load_patterns(engine, pattern_paths)?;
    let mut matches: Vec<ScanResult> = engine.scan(source, &patterns)?.into_iter().collect();
    matches.sort_by(|a, b| a.root.cmp(&b.root).then_with(|| a.pattern.cmp(&b.pattern)));
    Ok(matches)
}

/// Applies command-line flags on top of configured shuffle options.
pub fn shuffle_options(defaults: ShuffleOptions, args: &ShuffleArgs) -> ShuffleOptions {
    let workers = match (args.workers, args.parallel) {
        (Some(workers), _) => Some(workers),
        (None, true) => defaults.workers.or(NonZeroUsize::new(DEFAULT_WORKERS)),
        (None, false) => defaults.workers,
    };
    ShuffleOptions {
        overwrite: args.overwrite,
        dryrun: args.dryrun,
        workers,
        chunk_size: defaults.chunk_size,
    }
}

/// Scans, lists the planned copies, copies, and prints the summary.
pub fn shuffle_matches(engine: &Engine, args: &ShuffleArgs) -> Result<ShuffleReport> {
    tracing::info!(
        "Beginning shuffle matches from {} to {}",
        args.source.display(),
        args.destination.display()
    );
    let matches = scan_matches(engine, &args.source, &args.patterns)?;
    let options = shuffle_options(engine.shuffle_defaults(), args);

    if matches.is_empty() {
        OutputFormatter::info("No matching directories found.");
        return Ok(ShuffleReport::default());
    }

    OutputFormatter::header("This operation will copy the following directories:");
    OutputFormatter::paths(matches.iter().map(|found| found.root.as_path()));

    let pb = OutputFormatter::create_progress_bar(matches.len() as u64);
    let progress = |input: &ShuffleInput| {
        pb.set_message(input.source.display().to_string());
        pb.inc(1);
    };
    let shuffler = engine.shuffler(options).on_progress(&progress);
    let dryrun = shuffler.options().dryrun;
    let report = shuffler.shuffle_to(matches, &args.destination)?;
    pb.finish_and_clear();

    OutputFormatter::shuffle_summary(&report, dryrun);
    if report.is_complete_success() && !dryrun {
        OutputFormatter::success("Shuffle complete!");
    }
    Ok(report)
}

/// Prints each validated root as soon as it is found.
pub fn assess_file(engine: &Engine, file: &Path, pattern_paths: &[PathBuf]) -> Result<Vec<ScanResult>> {
    let patterns = load_patterns(engine, pattern_paths)?;
    let mut found = Vec::new();
    for result in engine.assess(file, &patterns) {
        let result = result?;
        OutputFormatter::plain(&result.root.display().to_string());
        found.push(result);
    }
    Ok(found)
}
