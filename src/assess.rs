//! Reverse lookup: which pattern roots contain a given file.
//!
//! Candidate roots are the ancestors of the file's directory, nearest first.
//! How far up to look is a heuristic ([`AssessDepth`]); every candidate is
//! re-checked with the [`Matcher`] before it is reported, so the heuristic
//! can only cost results that lie above the bound, never add wrong ones.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::vec;

use crate::error::{Error, Result};
use crate::matcher::Matcher;
use crate::pattern::StructurePattern;
use crate::scan::{ScanResult, unique_patterns};

/// How many ancestor directories are tried as pattern roots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AssessDepth {
    /// As many levels as the pattern tree is deep, counting the file's own
    /// directory as the first.
    #[default]
    PatternDepth,
    /// A fixed number of levels (at least one).
    Levels(usize),
    /// Every ancestor up to the filesystem root.
    Unbounded,
}

impl AssessDepth {
    fn limit(self, pattern: &StructurePattern) -> Option<usize> {
        match self {
            AssessDepth::PatternDepth => Some(pattern.depth()),
            AssessDepth::Levels(levels) => Some(levels.max(1)),
            AssessDepth::Unbounded => None,
        }
    }
}

/// Lazy, single-pass stream of validated pattern roots for one file.
///
/// Yields results pattern by pattern, nearest candidate first. The first
/// error ends the stream.
pub struct Assess<'a> {
    matcher: Matcher<'a>,
    start: PathBuf,
    depth: AssessDepth,
    boundary: Option<PathBuf>,
    patterns: vec::IntoIter<Arc<StructurePattern>>,
    current: Option<(Arc<StructurePattern>, vec::IntoIter<PathBuf>)>,
    pending: Option<Error>,
    done: bool,
}

/// Starts assessing `file` against `patterns`.
///
/// Resolution failures (missing file, unresolvable boundary) surface as the
/// first item of the stream.
pub fn assess<'a>(
    matcher: Matcher<'a>,
    file: &Path,
    patterns: &[StructurePattern],
    depth: AssessDepth,
    boundary: Option<&Path>,
) -> Assess<'a> {
    let mut assess = Assess {
        matcher,
        start: PathBuf::new(),
        depth,
        boundary: None,
        patterns: unique_patterns(patterns).into_iter(),
        current: None,
        pending: None,
        done: false,
    };
    match Assess::resolve(matcher, file, boundary) {
        Ok((start, boundary)) => {
            tracing::debug!(file = %file.display(), start = %start.display(), "Assessing");
            assess.start = start;
            assess.boundary = boundary;
        }
        Err(e) => assess.pending = Some(e),
    }
    assess
}

impl Assess<'_> {
    fn resolve(
        matcher: Matcher<'_>,
        file: &Path,
        boundary: Option<&Path>,
    ) -> Result<(PathBuf, Option<PathBuf>)> {
        let fs = matcher.fs();
        let file = fs.canonicalize(file).map_err(|e| Error::io(file, e))?;
        let start = match file.parent() {
            Some(parent) => parent.to_path_buf(),
            None => file,
        };
        let boundary = boundary
            .map(|path| fs.canonicalize(path).map_err(|e| Error::io(path, e)))
            .transpose()?;
        Ok((start, boundary))
    }

    fn candidates(&self, pattern: &StructurePattern) -> Vec<PathBuf> {
        if let Some(boundary) = &self.boundary {
            if !self.start.starts_with(boundary) {
                return Vec::new();
            }
        }

        let limit = self.depth.limit(pattern);
        let mut candidates = Vec::new();
        for ancestor in self.start.ancestors() {
            if limit.is_some_and(|limit| candidates.len() >= limit) {
                break;
            }
            candidates.push(ancestor.to_path_buf());
            if self.boundary.as_deref() == Some(ancestor) {
                break;
            }
        }
        candidates
    }
}

impl Iterator for Assess<'_> {
    type Item = Result<ScanResult>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.pending.take() {
            self.done = true;
            return Some(Err(e));
        }
        if self.done {
            return None;
        }

        loop {
            if let Some((pattern, candidates)) = &mut self.current {
                for candidate in candidates.by_ref() {
                    match self.matcher.matches_path(pattern, &candidate) {
                        Ok(true) => {
                            tracing::info!(root = %candidate.display(), "Assess matched");
                            return Some(Ok(ScanResult::new(candidate, Arc::clone(pattern))));
                        }
                        Ok(false) => {}
                        Err(e) => {
                            self.done = true;
                            return Some(Err(e));
                        }
                    }
                }
            }

            let Some(pattern) = self.patterns.next() else {
                self.done = true;
                return None;
            };
            let candidates = self.candidates(&pattern);
            tracing::debug!(candidates = candidates.len(), pattern = %pattern, "Candidate roots");
            self.current = Some((pattern, candidates.into_iter()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;
    use crate::glob::ShellGlob;

    fn mission_fs() -> MemoryFs {
        let fs = MemoryFs::new();
        fs.add_file("/data/run1/Mission/plan.misx", "m").unwrap();
        fs.add_file("/data/run1/Logs/a.log", "l").unwrap();
        fs.add_file("/data/run1/readme.txt", "r").unwrap();
        fs
    }

    fn mission_pattern() -> StructurePattern {
        StructurePattern::new()
            .add_directory(
                StructurePattern::new()
                    .set_name(Some("Mission"))
                    .add_file("*.misx", true),
                true,
            )
            .add_directory(
                StructurePattern::new()
                    .set_name(Some("Logs"))
                    .add_file("*.log", true),
                true,
            )
    }

    fn roots(results: Vec<Result<ScanResult>>) -> Vec<PathBuf> {
        results.into_iter().map(|r| r.unwrap().root).collect()
    }

    #[test]
    fn test_assess_finds_root_from_nested_file() {
        let fs = mission_fs();
        let globs = ShellGlob::new();
        let matcher = Matcher::new(&fs, &globs);

        let found = assess(
            matcher,
            Path::new("/data/run1/Logs/a.log"),
            &[mission_pattern()],
            AssessDepth::PatternDepth,
            None,
        )
        .collect();
        assert_eq!(roots(found), vec![PathBuf::from("/data/run1")]);
    }

    #[test]
    fn test_assess_depth_bound_limits_candidates() {
        let fs = mission_fs();
        let globs = ShellGlob::new();
        let matcher = Matcher::new(&fs, &globs);

        let found: Vec<_> = assess(
            matcher,
            Path::new("/data/run1/Logs/a.log"),
            &[mission_pattern()],
            AssessDepth::Levels(1),
            None,
        )
        .collect();
        assert!(found.is_empty());

        let unbounded = assess(
            matcher,
            Path::new("/data/run1/Logs/a.log"),
            &[mission_pattern()],
            AssessDepth::Unbounded,
            None,
        )
        .collect();
        assert_eq!(roots(unbounded), vec![PathBuf::from("/data/run1")]);
    }

    #[test]
    fn test_assess_respects_boundary() {
        let fs = mission_fs();
        let globs = ShellGlob::new();
        let matcher = Matcher::new(&fs, &globs);

        let found: Vec<_> = assess(
            matcher,
            Path::new("/data/run1/Logs/a.log"),
            &[mission_pattern()],
            AssessDepth::Unbounded,
            Some(Path::new("/data/run1/Logs")),
        )
        .collect();
        assert!(found.is_empty());
    }

    #[test]
    fn test_assess_yields_every_matching_ancestor() {
        let fs = MemoryFs::new();
        fs.add_file("/a/b/c/deep.txt", "x").unwrap();
        let globs = ShellGlob::new();
        let matcher = Matcher::new(&fs, &globs);

        let found = assess(
            matcher,
            Path::new("/a/b/c/deep.txt"),
            &[StructurePattern::new()],
            AssessDepth::Levels(2),
            None,
        )
        .collect();
        assert_eq!(
            roots(found),
            vec![PathBuf::from("/a/b/c"), PathBuf::from("/a/b")]
        );
    }

    #[test]
    fn test_assess_is_lazy() {
        let fs = mission_fs();
        fs.deny("/data");
        let globs = ShellGlob::new();
        let matcher = Matcher::new(&fs, &globs);

        // The nearest candidate matches before the denied ancestor is listed.
        let mut results = assess(
            matcher,
            Path::new("/data/run1/readme.txt"),
            &[StructurePattern::new()],
            AssessDepth::Unbounded,
            None,
        );
        let first = results.next().unwrap().unwrap();
        assert_eq!(first.root, PathBuf::from("/data/run1"));

        assert!(matches!(results.next(), Some(Err(Error::Io { .. }))));
        assert!(results.next().is_none());
    }

    #[test]
    fn test_assess_missing_file_errors_once() {
        let fs = mission_fs();
        let globs = ShellGlob::new();
        let matcher = Matcher::new(&fs, &globs);

        let results: Vec<_> = assess(
            matcher,
            Path::new("/nope/file.txt"),
            &[mission_pattern()],
            AssessDepth::PatternDepth,
            None,
        )
        .collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }
}
