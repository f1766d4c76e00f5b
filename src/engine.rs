//! Wires a filesystem, walker and glob backend together.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::assess::{Assess, AssessDepth};
use crate::error::Result;
use crate::fs::{FileSystem, LocalFs};
use crate::glob::{NameMatcher, ShellGlob};
use crate::matcher::Matcher;
use crate::pattern::StructurePattern;
use crate::scan::ScanResult;
use crate::shuffle::{ShuffleInput, ShuffleOptions, ShuffleReport, Shuffler};
use crate::walk::{StackWalker, Walker};

/// The entry point for scanning, assessing and shuffling.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use std::sync::Arc;
/// use dirshape::{Engine, MemoryFs, StructurePattern};
///
/// let fs = MemoryFs::new();
/// fs.add_file("/dir/file.txt", "hello").unwrap();
///
/// let engine = Engine::new(Arc::new(fs));
/// let pattern = StructurePattern::new()
///     .set_name(Some("dir"))
///     .add_file("file.txt", true);
///
/// let found = engine.scan(Path::new("/"), &[pattern]).unwrap();
/// assert_eq!(found.len(), 1);
/// ```
#[derive(Clone)]
pub struct Engine {
    fs: Arc<dyn FileSystem>,
    walker: Arc<dyn Walker>,
    globs: Arc<dyn NameMatcher>,
    assess_depth: AssessDepth,
    boundary: Option<PathBuf>,
    shuffle_defaults: ShuffleOptions,
}

impl Engine {
    /// An engine over `fs` with the stack walker and shell glob backend.
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            walker: Arc::new(StackWalker),
            globs: Arc::new(ShellGlob::new()),
            assess_depth: AssessDepth::default(),
            boundary: None,
            shuffle_defaults: ShuffleOptions::default(),
        }
    }

    /// An engine over the local disk.
    pub fn local() -> Self {
        Self::new(Arc::new(LocalFs))
    }

    pub fn with_walker(mut self, walker: Arc<dyn Walker>) -> Self {
        self.walker = walker;
        self
    }

    pub fn with_globs(mut self, globs: Arc<dyn NameMatcher>) -> Self {
        self.globs = globs;
        self
    }

    pub fn with_assess_depth(mut self, depth: AssessDepth) -> Self {
        self.assess_depth = depth;
        self
    }

    /// Assess never looks above `boundary`.
    pub fn with_boundary(mut self, boundary: impl Into<PathBuf>) -> Self {
        self.boundary = Some(boundary.into());
        self
    }

    /// Options used as the starting point for shuffles.
    pub fn with_shuffle_defaults(mut self, options: ShuffleOptions) -> Self {
        self.shuffle_defaults = options;
        self
    }

    pub fn walker_name(&self) -> &'static str {
        self.walker.name()
    }

    pub fn glob_backend(&self) -> &'static str {
        self.globs.backend_name()
    }

    pub fn shuffle_defaults(&self) -> ShuffleOptions {
        self.shuffle_defaults
    }

    pub fn matcher(&self) -> Matcher<'_> {
        Matcher::new(self.fs.as_ref(), self.globs.as_ref())
    }

    /// Loads a declaration file and checks its globs against this engine's backend.
    pub fn load_pattern(&self, path: &Path) -> Result<StructurePattern> {
        let pattern = StructurePattern::load(path)?;
        pattern.validate(self.globs.as_ref())?;
        Ok(pattern)
    }

    /// Returns whether the directory at `path` satisfies `pattern`.
    pub fn matches(&self, pattern: &StructurePattern, path: &Path) -> Result<bool> {
        self.matcher().matches_path(pattern, path)
    }

    pub fn scan(&self, root: &Path, patterns: &[StructurePattern]) -> Result<HashSet<ScanResult>> {
        crate::scan::scan(&self.matcher(), self.walker.as_ref(), root, patterns)
    }

    /// Lazily finds the pattern roots that contain `file`.
    pub fn assess(&self, file: &Path, patterns: &[StructurePattern]) -> Assess<'_> {
        crate::assess::assess(
            self.matcher(),
            file,
            patterns,
            self.assess_depth,
            self.boundary.as_deref(),
        )
    }

    pub fn shuffler(&self, options: ShuffleOptions) -> Shuffler<'_> {
        Shuffler::new(self.matcher(), options)
    }

    /// Copies one tree with the default options plus the given flags.
    pub fn copy(
        &self,
        pattern: &StructurePattern,
        source: &Path,
        destination: &Path,
        overwrite: bool,
        dryrun: bool,
    ) -> Result<()> {
        let options = ShuffleOptions {
            overwrite,
            dryrun,
            ..self.shuffle_defaults
        };
        self.shuffler(options).copy(pattern, source, destination)
    }

    pub fn shuffle<I>(&self, inputs: I, options: ShuffleOptions) -> Result<ShuffleReport>
    where
        I: IntoIterator<Item = ShuffleInput>,
    {
        self.shuffler(options).shuffle(inputs)
    }

    pub fn shuffle_to<I>(
        &self,
        matches: I,
        destination_root: &Path,
        options: ShuffleOptions,
    ) -> Result<ShuffleReport>
    where
        I: IntoIterator<Item = ScanResult>,
    {
        self.shuffler(options).shuffle_to(matches, destination_root)
    }

    pub fn shuffle_with<I, F>(
        &self,
        matches: I,
        destination_fn: F,
        options: ShuffleOptions,
    ) -> Result<ShuffleReport>
    where
        I: IntoIterator<Item = ScanResult>,
        F: FnMut(&ScanResult) -> PathBuf,
    {
        self.shuffler(options).shuffle_with(matches, destination_fn)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::local()
    }
}

/// Scans a local directory with the default engine.
pub fn scan(root: &Path, patterns: &[StructurePattern]) -> Result<HashSet<ScanResult>> {
    Engine::local().scan(root, patterns)
}

/// Assesses a local file with the default engine, collecting every result.
pub fn assess(file: &Path, patterns: &[StructurePattern]) -> Result<Vec<ScanResult>> {
    Engine::local().assess(file, patterns).collect()
}

/// Copies local matches under `destination_root` with the default engine.
pub fn shuffle_to<I>(matches: I, destination_root: &Path, options: ShuffleOptions) -> Result<ShuffleReport>
where
    I: IntoIterator<Item = ScanResult>,
{
    Engine::local().shuffle_to(matches, destination_root, options)
}
