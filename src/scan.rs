//! Whole-tree search for directories matching a set of patterns.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::matcher::Matcher;
use crate::pattern::StructurePattern;
use crate::walk::Walker;

/// A directory that satisfied a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanResult {
    pub root: PathBuf,
    pub pattern: Arc<StructurePattern>,
}

impl ScanResult {
    pub fn new(root: impl Into<PathBuf>, pattern: impl Into<Arc<StructurePattern>>) -> Self {
        Self {
            root: root.into(),
            pattern: pattern.into(),
        }
    }
}

/// Resolves `root` and checks that it is a directory.
pub(crate) fn resolve_root(matcher: &Matcher<'_>, root: &Path) -> Result<PathBuf> {
    let fs = matcher.fs();
    let resolved = fs.canonicalize(root).map_err(|e| Error::io(root, e))?;
    if !fs.is_dir(&resolved) {
        return Err(Error::NotADirectory(resolved));
    }
    Ok(resolved)
}

/// Equal patterns collapse to one entry.
pub(crate) fn unique_patterns(patterns: &[StructurePattern]) -> Vec<Arc<StructurePattern>> {
    patterns
        .iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|pattern| Arc::new(pattern.clone()))
        .collect()
}

/// Tests every directory under `root` (itself included) against every pattern.
///
/// Each (directory, pattern) pair that matches yields one [`ScanResult`].
/// Any walk or listing failure aborts the scan; there are no partial results.
pub fn scan(
    matcher: &Matcher<'_>,
    walker: &dyn Walker,
    root: &Path,
    patterns: &[StructurePattern],
) -> Result<HashSet<ScanResult>> {
    let root = resolve_root(matcher, root)?;
    let patterns = unique_patterns(patterns);
    tracing::info!(
        root = %root.display(),
        patterns = patterns.len(),
        walker = walker.name(),
        "Scanning"
    );

    let mut results = HashSet::new();
    for entry in walker.walk(matcher.fs(), &root) {
        let entry = entry?;
        for pattern in &patterns {
            if matcher.matches(pattern, &entry)? {
                tracing::info!(path = %entry.path.display(), "Matched pattern");
                results.insert(ScanResult::new(entry.path.clone(), Arc::clone(pattern)));
            }
        }
    }

    tracing::info!(matches = results.len(), "Scan finished");
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;
    use crate::glob::ShellGlob;
    use crate::walk::StackWalker;

    fn csv_pattern() -> StructurePattern {
        StructurePattern::new().add_file("*.csv", true)
    }

    #[test]
    fn test_scan_visits_nested_directories() {
        let fs = MemoryFs::new();
        fs.add_file("/data/a/x.csv", "1").unwrap();
        fs.add_file("/data/a/b/y.csv", "2").unwrap();
        fs.add_file("/data/c/z.txt", "3").unwrap();
        let globs = ShellGlob::new();
        let matcher = Matcher::new(&fs, &globs);

        let results = scan(&matcher, &StackWalker, Path::new("/data"), &[csv_pattern()]).unwrap();
        let roots: BTreeSet<_> = results.iter().map(|r| r.root.clone()).collect();
        assert_eq!(
            roots,
            BTreeSet::from([PathBuf::from("/data/a"), PathBuf::from("/data/a/b")])
        );
    }

    #[test]
    fn test_scan_includes_root_itself() {
        let fs = MemoryFs::new();
        fs.add_file("/data/x.csv", "1").unwrap();
        let globs = ShellGlob::new();
        let matcher = Matcher::new(&fs, &globs);

        let results = scan(&matcher, &StackWalker, Path::new("/data"), &[csv_pattern()]).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results.contains(&ScanResult::new("/data", csv_pattern())));
    }

    #[test]
    fn test_duplicate_patterns_do_not_duplicate_results() {
        let fs = MemoryFs::new();
        fs.add_file("/data/x.csv", "1").unwrap();
        let globs = ShellGlob::new();
        let matcher = Matcher::new(&fs, &globs);

        let results = scan(
            &matcher,
            &StackWalker,
            Path::new("/data"),
            &[csv_pattern(), csv_pattern()],
        )
        .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_one_directory_can_match_several_patterns() {
        let fs = MemoryFs::new();
        fs.add_file("/data/x.csv", "1").unwrap();
        let globs = ShellGlob::new();
        let matcher = Matcher::new(&fs, &globs);
        let named = StructurePattern::new().set_name(Some("data"));

        let results = scan(
            &matcher,
            &StackWalker,
            Path::new("/data"),
            &[csv_pattern(), named],
        )
        .unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_scan_relative_root_is_resolved() {
        let fs = MemoryFs::new();
        fs.add_file("/data/x.csv", "1").unwrap();
        let globs = ShellGlob::new();
        let matcher = Matcher::new(&fs, &globs);

        let results = scan(
            &matcher,
            &StackWalker,
            Path::new("/data/sub/.."),
            &[csv_pattern()],
        )
        .unwrap();
        assert!(results.contains(&ScanResult::new("/data", csv_pattern())));
    }

    #[test]
    fn test_scan_rejects_file_root() {
        let fs = MemoryFs::new();
        fs.add_file("/data/x.csv", "1").unwrap();
        let globs = ShellGlob::new();
        let matcher = Matcher::new(&fs, &globs);

        let err = scan(&matcher, &StackWalker, Path::new("/data/x.csv"), &[csv_pattern()])
            .unwrap_err();
        assert!(matches!(err, Error::NotADirectory(_)));
    }

    #[test]
    fn test_scan_surfaces_listing_errors() {
        let fs = MemoryFs::new();
        fs.add_file("/data/locked/x.csv", "1").unwrap();
        fs.deny("/data/locked");
        let globs = ShellGlob::new();
        let matcher = Matcher::new(&fs, &globs);

        let err = scan(&matcher, &StackWalker, Path::new("/data"), &[csv_pattern()]).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
