//! Copying matched directory trees to new locations.
//!
//! A copy walks the pattern and the source tree together. At each level the
//! files matching any required or optional file glob are streamed across,
//! and each subdirectory is recursed into with the first required or
//! optional sub-pattern it satisfies. Everything else is left behind.

use std::io::{ErrorKind, Read, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::matcher::Matcher;
use crate::pattern::StructurePattern;
use crate::scan::ScanResult;
use crate::walk::WalkEntry;

/// Streaming copy buffer size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// Worker count used when parallel copying is requested without a size.
pub const DEFAULT_WORKERS: usize = 4;

/// One requested copy: `source` is realized *as* `destination`, not inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShuffleInput {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub pattern: Arc<StructurePattern>,
}

impl ShuffleInput {
    pub fn new(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        pattern: impl Into<Arc<StructurePattern>>,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            pattern: pattern.into(),
        }
    }
}

/// A copy that completed, or in a dry run, one that was planned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShuffleResult {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub pattern: Arc<StructurePattern>,
}

impl From<ShuffleInput> for ShuffleResult {
    fn from(input: ShuffleInput) -> Self {
        Self {
            source: input.source,
            destination: input.destination,
            pattern: input.pattern,
        }
    }
}

/// Knobs for a copy batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShuffleOptions {
    /// Merge into destinations that already exist instead of skipping them.
    pub overwrite: bool,
    /// Plan and report without writing anything.
    pub dryrun: bool,
    /// Size of the worker pool, or `None` to copy serially.
    pub workers: Option<NonZeroUsize>,
    /// Streaming copy buffer size in bytes.
    pub chunk_size: usize,
}

impl Default for ShuffleOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            dryrun: false,
            workers: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Outcome of a batch.
#[derive(Debug, Default)]
pub struct ShuffleReport {
    /// Inputs that were copied, in input order for serial batches.
    pub copied: Vec<ShuffleResult>,
    /// Inputs whose destination already existed.
    pub skipped: Vec<(ShuffleInput, Error)>,
    /// Inputs that failed partway; their destination may be incomplete.
    pub failed: Vec<(ShuffleInput, Error)>,
}

impl ShuffleReport {
    pub fn total_processed(&self) -> usize {
        self.copied.len() + self.skipped.len() + self.failed.len()
    }

    /// Returns true if every input was copied.
    pub fn is_complete_success(&self) -> bool {
        self.skipped.is_empty() && self.failed.is_empty()
    }

    fn record(&mut self, input: ShuffleInput, outcome: Result<()>) {
        match outcome {
            Ok(()) => self.copied.push(input.into()),
            Err(e @ Error::DestinationExists(_)) => {
                tracing::error!(
                    "Destination folder already exists: {}. Skipping: {}",
                    input.destination.display(),
                    source_name(&input.source)
                );
                self.skipped.push((input, e));
            }
            Err(e) => {
                tracing::error!("Failed to copy {}: {}", input.source.display(), e);
                self.failed.push((input, e));
            }
        }
    }
}

fn source_name(source: &Path) -> String {
    source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

type Progress<'a> = &'a (dyn Fn(&ShuffleInput) + Sync);

/// Copies pattern-shaped trees through a [`Matcher`]'s filesystem.
#[derive(Clone, Copy)]
pub struct Shuffler<'a> {
    matcher: Matcher<'a>,
    options: ShuffleOptions,
    progress: Option<Progress<'a>>,
}

impl<'a> Shuffler<'a> {
    pub fn new(matcher: Matcher<'a>, options: ShuffleOptions) -> Self {
        Self {
            matcher,
            options,
            progress: None,
        }
    }

    /// Registers a callback invoked once per finished input.
    pub fn on_progress(mut self, progress: Progress<'a>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn options(&self) -> &ShuffleOptions {
        &self.options
    }

    /// Copies the parts of `source` described by `pattern` to `destination`.
    ///
    /// # Errors
    ///
    /// [`Error::DestinationExists`] if `destination` exists and overwriting is
    /// off and this is not a dry run, [`Error::Io`] for any read, write or
    /// listing failure.
    pub fn copy(&self, pattern: &StructurePattern, source: &Path, destination: &Path) -> Result<()> {
        self.copy_level(pattern, source, destination, 1)?;
        tracing::info!(
            dryrun = self.options.dryrun,
            "Finished copying {} to {}",
            source.display(),
            destination.display()
        );
        Ok(())
    }

    fn copy_level(
        &self,
        pattern: &StructurePattern,
        source: &Path,
        destination: &Path,
        depth: usize,
    ) -> Result<()> {
        let fs = self.matcher.fs();
        let dryrun = self.options.dryrun;

        if dryrun {
            if !self.options.overwrite && fs.exists(destination) {
                tracing::warn!(
                    "Destination folder already exists: {}. A real run would skip it",
                    destination.display()
                );
            }
        } else {
            self.create_destination(destination)?;
        }

        let entry = WalkEntry::list(fs, source)?;

        let file_globs = pattern.all_files();
        for filename in &entry.filenames {
            if !self.any_glob_matches(&filename.to_string_lossy(), &file_globs)? {
                continue;
            }
            let from = source.join(filename);
            let to = destination.join(filename);
            if !dryrun {
                self.copy_file(&from, &to)?;
            }
            tracing::debug!(depth, dryrun, "Copied {} to {}", from.display(), to.display());
        }

        let branches = pattern.all_directories();
        for dirname in &entry.dirnames {
            let child = source.join(dirname);
            for branch in &branches {
                if self.matcher.matches_path(branch, &child)? {
                    self.copy_level(branch, &child, &destination.join(dirname), depth + 1)?;
                    break;
                }
            }
        }
        Ok(())
    }

    /// Creates `destination`, which must not exist yet unless overwriting.
    fn create_destination(&self, destination: &Path) -> Result<()> {
        let fs = self.matcher.fs();
        if self.options.overwrite {
            return fs
                .create_dir_all(destination)
                .map_err(|e| Error::io(destination, e));
        }

        if let Some(parent) = destination.parent() {
            fs.create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        fs.create_dir(destination).map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => Error::DestinationExists(destination.to_path_buf()),
            _ => Error::io(destination, e),
        })
    }

    fn any_glob_matches(&self, name: &str, globs: &[&str]) -> Result<bool> {
        for glob in globs {
            if self.matcher.name_matches(name, glob)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Streams one file in fixed-size chunks, then carries its timestamps over.
    fn copy_file(&self, from: &Path, to: &Path) -> Result<()> {
        let fs = self.matcher.fs();
        let mut reader = fs.open_read(from).map_err(|e| Error::io(from, e))?;
        let mut writer = fs.create_write(to).map_err(|e| Error::io(to, e))?;

        let mut buffer = vec![0u8; self.options.chunk_size.max(1)];
        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(read) => read,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::io(from, e)),
            };
            writer
                .write_all(&buffer[..read])
                .map_err(|e| Error::io(to, e))?;
        }
        writer.flush().map_err(|e| Error::io(to, e))?;
        drop(writer);

        fs.copy_times(from, to).map_err(|e| Error::io(to, e))
    }

    fn run_one(&self, input: &ShuffleInput) -> Result<()> {
        let outcome = self.copy(&input.pattern, &input.source, &input.destination);
        if let Some(progress) = self.progress {
            progress(input);
        }
        outcome
    }

    /// Copies every input, recording failures instead of stopping at them.
    ///
    /// Serial batches report in input order. With a worker pool the set of
    /// results is the same, and input order is still kept.
    ///
    /// # Errors
    ///
    /// Only fails if the worker pool cannot be started.
    pub fn shuffle<I>(&self, inputs: I) -> Result<ShuffleReport>
    where
        I: IntoIterator<Item = ShuffleInput>,
    {
        let inputs: Vec<ShuffleInput> = inputs.into_iter().collect();
        let outcomes: Vec<Result<()>> = match self.options.workers {
            None => inputs.iter().map(|input| self.run_one(input)).collect(),
            Some(workers) => {
                tracing::debug!(workers = workers.get(), "Copying in parallel");
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(workers.get())
                    .build()
                    .map_err(|e| Error::WorkerPool(e.to_string()))?;
                pool.install(|| inputs.par_iter().map(|input| self.run_one(input)).collect())
            }
        };

        let mut report = ShuffleReport::default();
        for (input, outcome) in inputs.into_iter().zip(outcomes) {
            report.record(input, outcome);
        }
        tracing::info!("Copied {} directories", report.copied.len());
        Ok(report)
    }

    /// Copies each match to `destination_root/<match directory name>`.
    ///
    /// A match rooted at a filesystem root has no name; it is copied to
    /// `destination_root` itself.
    pub fn shuffle_to<I>(&self, matches: I, destination_root: &Path) -> Result<ShuffleReport>
    where
        I: IntoIterator<Item = ScanResult>,
    {
        self.shuffle_with(matches, |found| match found.root.file_name() {
            Some(name) => destination_root.join(name),
            None => {
                tracing::warn!(
                    "{} has no directory name, copying it to {}",
                    found.root.display(),
                    destination_root.display()
                );
                destination_root.to_path_buf()
            }
        })
    }

    /// Copies each match to the destination computed by `destination_fn`.
    pub fn shuffle_with<I, F>(&self, matches: I, mut destination_fn: F) -> Result<ShuffleReport>
    where
        I: IntoIterator<Item = ScanResult>,
        F: FnMut(&ScanResult) -> PathBuf,
    {
        let inputs: Vec<ShuffleInput> = matches
            .into_iter()
            .map(|found| {
                let destination = destination_fn(&found);
                ShuffleInput::new(found.root, destination, found.pattern)
            })
            .collect();
        self.shuffle(inputs)
    }
}
