//! Evaluates a [`StructurePattern`] against one directory.

use std::ffi::OsString;
use std::path::Path;

use crate::error::Result;
use crate::fs::FileSystem;
use crate::glob::NameMatcher;
use crate::pattern::StructurePattern;
use crate::walk::WalkEntry;

/// Checks directories against patterns.
///
/// Only required members take part: the name glob, every required file glob
/// (each needs at least one matching filename, and one file may satisfy
/// several globs), and every required sub-pattern (each needs at least one
/// matching immediate subdirectory). Subdirectories are listed on demand
/// through the filesystem, and listing failures are returned as errors
/// rather than counted as a mismatch.
#[derive(Clone, Copy)]
pub struct Matcher<'a> {
    fs: &'a dyn FileSystem,
    globs: &'a dyn NameMatcher,
}

impl<'a> Matcher<'a> {
    pub fn new(fs: &'a dyn FileSystem, globs: &'a dyn NameMatcher) -> Self {
        Self { fs, globs }
    }

    pub fn fs(&self) -> &'a dyn FileSystem {
        self.fs
    }

    /// Returns whether the directory described by `entry` satisfies `pattern`.
    pub fn matches(&self, pattern: &StructurePattern, entry: &WalkEntry) -> Result<bool> {
        self.matches_at(pattern, entry, 1)
    }

    /// Lists `path` and checks it against `pattern`.
    pub fn matches_path(&self, pattern: &StructurePattern, path: &Path) -> Result<bool> {
        let entry = WalkEntry::list(self.fs, path)?;
        self.matches(pattern, &entry)
    }

    /// Whether `name` matches `glob` in full.
    pub fn name_matches(&self, name: &str, glob: &str) -> Result<bool> {
        self.globs.is_match(name, glob)
    }

    fn matches_at(&self, pattern: &StructurePattern, entry: &WalkEntry, depth: usize) -> Result<bool> {
        tracing::debug!(depth, path = %entry.path.display(), "Evaluating match");

        if let Some(name_glob) = pattern.name() {
            let name = entry.name();
            if !self.globs.is_match(&name, name_glob)? {
                tracing::debug!(depth, expected = name_glob, found = %name, "Directory name mismatch");
                return Ok(false);
            }
        }

        for file_glob in pattern.required_files() {
            if !self.any_matches(&entry.filenames, file_glob)? {
                tracing::debug!(
                    depth,
                    required = %file_glob,
                    path = %entry.path.display(),
                    "Missing required file"
                );
                return Ok(false);
            }
        }

        for branch in pattern.required_directories() {
            if !self.any_subdirectory_matches(branch, entry, depth)? {
                tracing::debug!(
                    depth,
                    required = %branch,
                    path = %entry.path.display(),
                    "Missing required subdirectory"
                );
                return Ok(false);
            }
        }

        tracing::debug!(depth, path = %entry.path.display(), "Matched");
        Ok(true)
    }

    fn any_matches(&self, names: &[OsString], glob: &str) -> Result<bool> {
        for name in names {
            if self.globs.is_match(&name.to_string_lossy(), glob)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn any_subdirectory_matches(
        &self,
        branch: &StructurePattern,
        entry: &WalkEntry,
        depth: usize,
    ) -> Result<bool> {
        for dirname in &entry.dirnames {
            // Skip the listing when the name alone already rules the directory out.
            if let Some(name_glob) = branch.name() {
                if !self.globs.is_match(&dirname.to_string_lossy(), name_glob)? {
                    continue;
                }
            }
            let child = WalkEntry::list(self.fs, &entry.path.join(dirname))?;
            if self.matches_at(branch, &child, depth + 1)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::fs::MemoryFs;
    use crate::glob::ShellGlob;

    fn mission_fs() -> MemoryFs {
        let fs = MemoryFs::new();
        fs.add_file("/data/run1/Mission/plan.misx", "m").unwrap();
        fs.add_file("/data/run1/Logs/a.log", "l").unwrap();
        fs.add_file("/data/run1/Sonar/ping.dat", "s").unwrap();
        fs.add_file("/data/run2/Mission/plan.misx", "m").unwrap();
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

    #[test]
    fn test_empty_pattern_matches_anything() {
        let fs = mission_fs();
        let globs = ShellGlob::new();
        let matcher = Matcher::new(&fs, &globs);
        let pattern = StructurePattern::new();

        assert!(matcher.matches_path(&pattern, Path::new("/")).unwrap());
        assert!(matcher.matches_path(&pattern, Path::new("/data/run2")).unwrap());
    }

    #[test]
    fn test_name_glob_must_match() {
        let fs = mission_fs();
        let globs = ShellGlob::new();
        let matcher = Matcher::new(&fs, &globs);

        let run = StructurePattern::new().set_name(Some("run?"));
        assert!(matcher.matches_path(&run, Path::new("/data/run1")).unwrap());
        assert!(!matcher.matches_path(&run, Path::new("/data")).unwrap());
    }

    #[test]
    fn test_required_files_need_one_match_each() {
        let fs = MemoryFs::new();
        fs.add_file("/dir/report.csv", "x").unwrap();
        let globs = ShellGlob::new();
        let matcher = Matcher::new(&fs, &globs);

        // One file may satisfy several globs.
        let shared = StructurePattern::new().add_files(["*.csv", "report*"], true);
        assert!(matcher.matches_path(&shared, Path::new("/dir")).unwrap());

        let missing = StructurePattern::new().add_files(["*.csv", "*.txt"], true);
        assert!(!matcher.matches_path(&missing, Path::new("/dir")).unwrap());
    }

    #[test]
    fn test_required_subdirectories_recurse() {
        let fs = mission_fs();
        let globs = ShellGlob::new();
        let matcher = Matcher::new(&fs, &globs);
        let pattern = mission_pattern();

        assert!(matcher.matches_path(&pattern, Path::new("/data/run1")).unwrap());
        assert!(!matcher.matches_path(&pattern, Path::new("/data/run2")).unwrap());
    }

    #[test]
    fn test_optional_members_never_block_a_match() {
        let fs = mission_fs();
        let globs = ShellGlob::new();
        let matcher = Matcher::new(&fs, &globs);
        let pattern = mission_pattern()
            .add_file("*.absent", false)
            .add_directory(StructurePattern::new().set_name(Some("Nowhere")), false);

        assert!(matcher.matches_path(&pattern, Path::new("/data/run1")).unwrap());
    }

    #[test]
    fn test_unreadable_subdirectory_is_an_error() {
        let fs = mission_fs();
        fs.deny("/data/run1/Logs");
        let globs = ShellGlob::new();
        let matcher = Matcher::new(&fs, &globs);

        let err = matcher
            .matches_path(&mission_pattern(), Path::new("/data/run1"))
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_unreadable_subdirectory_with_other_name_is_not_listed() {
        let fs = mission_fs();
        fs.deny("/data/run1/Sonar");
        let globs = ShellGlob::new();
        let matcher = Matcher::new(&fs, &globs);

        assert!(matcher
            .matches_path(&mission_pattern(), Path::new("/data/run1"))
            .unwrap());
    }

    #[test]
    fn test_invalid_glob_propagates() {
        let fs = mission_fs();
        let globs = ShellGlob::new();
        let matcher = Matcher::new(&fs, &globs);
        let pattern = StructurePattern::new().add_file("[broken", true);

        let err = matcher
            .matches_path(&pattern, Path::new("/data/run1/Logs"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidGlob { .. }));
    }
}
