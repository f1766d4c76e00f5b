//! Declarative directory structure patterns.
//!
//! A [`StructurePattern`] describes one directory level: an optional glob
//! for the directory's own name, globs for files that must (or may) be
//! present, and sub-patterns for subdirectories that must (or may) be
//! present. Optional members never affect matching; they only widen what a
//! shuffle copies.
//!
//! # Declaration format
//!
//! Patterns are persisted as JSON:
//!
//! ```json
//! {
//!   "directory_name": "Mission",
//!   "files": ["*.misx"],
//!   "optional_files": ["notes.txt"],
//!   "directories": [],
//!   "optional_directories": []
//! }
//! ```
//!
//! Every field may be omitted; `directory_name` may be `null`.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::glob::{NameMatcher, ShellGlob};

/// One directory-level matching rule and its sub-patterns.
///
/// Children are owned values, so a pattern is always a finite tree: adding
/// a pattern to itself stores a copy of its current state, never a cycle.
/// Equality and hashing are structural over the whole tree.
///
/// # Examples
///
/// ```
/// use dirshape::StructurePattern;
///
/// let logs = StructurePattern::new().set_name(Some("Logs")).add_file("*.log", true);
/// let mission = StructurePattern::new()
///     .add_directory(logs, true)
///     .add_file("notes.txt", false);
///
/// assert_eq!(mission.depth(), 2);
/// assert_eq!(mission.required_directories().len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StructurePattern {
    #[serde(rename = "directory_name", default)]
    name: Option<String>,

    #[serde(rename = "files", default)]
    required_files: Vec<String>,

    #[serde(default)]
    optional_files: BTreeSet<String>,

    #[serde(rename = "directories", default)]
    required_directories: Vec<StructurePattern>,

    #[serde(default)]
    optional_directories: BTreeSet<StructurePattern>,
}

impl StructurePattern {
    /// An empty pattern: matches every directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets or clears the glob the directory's own name must match.
    pub fn set_name(mut self, name: Option<&str>) -> Self {
        self.name = name.map(str::to_string);
        self
    }

    /// Adds a file glob, as a requirement or as an optional copy target.
    pub fn add_file(mut self, pattern: impl Into<String>, required: bool) -> Self {
        if required {
            self.required_files.push(pattern.into());
        } else {
            self.optional_files.insert(pattern.into());
        }
        self
    }

    pub fn add_files<I, S>(self, patterns: I, required: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        patterns
            .into_iter()
            .fold(self, |pattern, file| pattern.add_file(file, required))
    }

    /// Adds a subdirectory pattern, as a requirement or as an optional copy target.
    pub fn add_directory(mut self, directory: StructurePattern, required: bool) -> Self {
        if required {
            self.required_directories.push(directory);
        } else {
            self.optional_directories.insert(directory);
        }
        self
    }

    pub fn add_directories<I>(self, directories: I, required: bool) -> Self
    where
        I: IntoIterator<Item = StructurePattern>,
    {
        directories
            .into_iter()
            .fold(self, |pattern, directory| pattern.add_directory(directory, required))
    }

    /// The directory name glob. An empty glob counts as no constraint.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }

    pub fn required_files(&self) -> &[String] {
        &self.required_files
    }

    pub fn optional_files(&self) -> &BTreeSet<String> {
        &self.optional_files
    }

    pub fn required_directories(&self) -> &[StructurePattern] {
        &self.required_directories
    }

    pub fn optional_directories(&self) -> &BTreeSet<StructurePattern> {
        &self.optional_directories
    }

    /// Required and optional file globs without duplicates, required first.
    pub fn all_files(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.required_files
            .iter()
            .chain(&self.optional_files)
            .map(String::as_str)
            .filter(|pattern| seen.insert(*pattern))
            .collect()
    }

    /// Required and optional sub-patterns without duplicates, required first.
    pub fn all_directories(&self) -> Vec<&StructurePattern> {
        let mut seen = HashSet::new();
        self.required_directories
            .iter()
            .chain(&self.optional_directories)
            .filter(|pattern| seen.insert(*pattern))
            .collect()
    }

    /// Number of directory levels the tree spans, this level included.
    pub fn depth(&self) -> usize {
        1 + self
            .required_directories
            .iter()
            .chain(&self.optional_directories)
            .map(StructurePattern::depth)
            .max()
            .unwrap_or(0)
    }

    /// Checks that every glob in the tree compiles with `globs`.
    pub fn validate(&self, globs: &dyn NameMatcher) -> Result<()> {
        if let Some(name) = self.name() {
            globs.check(name)?;
        }
        for pattern in self.required_files.iter().chain(&self.optional_files) {
            globs.check(pattern)?;
        }
        for directory in self
            .required_directories
            .iter()
            .chain(&self.optional_directories)
        {
            directory.validate(globs)?;
        }
        Ok(())
    }

    /// Serializes the tree to its JSON declaration.
    pub fn to_declaration(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses and validates a JSON declaration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDeclaration`] for malformed JSON and
    /// [`Error::InvalidGlob`] for globs that do not compile.
    pub fn from_declaration(text: &str) -> Result<Self> {
        let pattern: Self = serde_json::from_str(text)?;
        pattern.validate(&ShellGlob::new())?;
        Ok(pattern)
    }

    /// Loads a declaration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::PatternFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_declaration(&text)
    }
}

impl fmt::Display for StructurePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let compact = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&compact)
    }
}
