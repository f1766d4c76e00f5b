//! Filename glob matching.
//!
//! A pattern always matches a single path component (a file or directory
//! name), and must match the whole name. Supported syntax:
//! - `*` matches any run of characters, including none
//! - `?` matches exactly one character
//! - `[abc]`, `[a-z]` character classes, negated with `[!abc]` or `[^abc]`
//!
//! Two interchangeable backends implement [`NameMatcher`]: [`ShellGlob`]
//! built on the `glob` crate and [`GlobsetMatcher`] built on `globset`.
//! Both keep a bounded LRU cache of compiled patterns keyed by pattern text,
//! since a scan evaluates the same handful of patterns against many names.

use std::borrow::Cow;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use glob::{MatchOptions, Pattern};
use globset::GlobBuilder;
use lru::LruCache;

use crate::error::{Error, Result};

/// Default number of compiled patterns kept per backend.
pub const DEFAULT_CACHE_SIZE: usize = 256;

/// Matches a single name against a single glob pattern.
pub trait NameMatcher: Send + Sync {
    /// Returns whether `name` matches `pattern` in full.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGlob`] if `pattern` cannot be compiled.
    fn is_match(&self, name: &str, pattern: &str) -> Result<bool>;

    /// Checks that `pattern` compiles without matching anything.
    fn check(&self, pattern: &str) -> Result<()> {
        self.is_match("", pattern).map(|_| ())
    }

    /// Short identifier used in logs.
    fn backend_name(&self) -> &'static str;
}

/// Rewrites syntax both backends should treat identically.
///
/// Runs of `*` collapse to one (within a single name they are equivalent)
/// and `[^` is accepted as a negated class.
fn normalize(pattern: &str) -> Cow<'_, str> {
    if !pattern.contains("**") && !pattern.contains("[^") {
        return Cow::Borrowed(pattern);
    }

    let mut out = String::with_capacity(pattern.len());
    let mut prev = None;
    for ch in pattern.chars() {
        match (prev, ch) {
            (Some('*'), '*') => continue,
            (Some('['), '^') => out.push('!'),
            _ => out.push(ch),
        }
        prev = Some(ch);
    }
    Cow::Owned(out)
}

fn cache_capacity(size: usize) -> NonZeroUsize {
    NonZeroUsize::new(size).unwrap_or(NonZeroUsize::MIN)
}

/// Glob backend using the `glob` crate's shell-style patterns.
pub struct ShellGlob {
    options: MatchOptions,
    cache: Mutex<LruCache<String, Pattern>>,
}

impl ShellGlob {
    /// Case-sensitive matcher with the default cache size.
    pub fn new() -> Self {
        Self::with_options(true, DEFAULT_CACHE_SIZE)
    }

    /// Creates a matcher with explicit case sensitivity and cache capacity.
    pub fn with_options(case_sensitive: bool, cache_size: usize) -> Self {
        Self {
            options: MatchOptions {
                case_sensitive,
                require_literal_separator: false,
                require_literal_leading_dot: false,
            },
            cache: Mutex::new(LruCache::new(cache_capacity(cache_size))),
        }
    }

    fn compile(pattern: &str) -> Result<Pattern> {
        Pattern::new(&normalize(pattern)).map_err(|e| Error::InvalidGlob {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
    }
}

impl Default for ShellGlob {
    fn default() -> Self {
        Self::new()
    }
}

impl NameMatcher for ShellGlob {
    fn is_match(&self, name: &str, pattern: &str) -> Result<bool> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(compiled) = cache.get(pattern) {
            return Ok(compiled.matches_with(name, self.options));
        }

        let compiled = Self::compile(pattern)?;
        let matched = compiled.matches_with(name, self.options);
        cache.put(pattern.to_string(), compiled);
        Ok(matched)
    }

    fn backend_name(&self) -> &'static str {
        "shell"
    }
}

/// Glob backend compiling each pattern to a `globset` matcher.
pub struct GlobsetMatcher {
    case_sensitive: bool,
    cache: Mutex<LruCache<String, globset::GlobMatcher>>,
}

impl GlobsetMatcher {
    /// Case-sensitive matcher with the default cache size.
    pub fn new() -> Self {
        Self::with_options(true, DEFAULT_CACHE_SIZE)
    }

    /// Creates a matcher with explicit case sensitivity and cache capacity.
    pub fn with_options(case_sensitive: bool, cache_size: usize) -> Self {
        Self {
            case_sensitive,
            cache: Mutex::new(LruCache::new(cache_capacity(cache_size))),
        }
    }

    fn compile(&self, pattern: &str) -> Result<globset::GlobMatcher> {
        GlobBuilder::new(&normalize(pattern))
            .literal_separator(true)
            .backslash_escape(false)
            .case_insensitive(!self.case_sensitive)
            .build()
            .map(|glob| glob.compile_matcher())
            .map_err(|e| Error::InvalidGlob {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
    }
}

impl Default for GlobsetMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl NameMatcher for GlobsetMatcher {
    fn is_match(&self, name: &str, pattern: &str) -> Result<bool> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(compiled) = cache.get(pattern) {
            return Ok(compiled.is_match(name));
        }

        let compiled = self.compile(pattern)?;
        let matched = compiled.is_match(name);
        cache.put(pattern.to_string(), compiled);
        Ok(matched)
    }

    fn backend_name(&self) -> &'static str {
        "globset"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backends() -> Vec<Box<dyn NameMatcher>> {
        vec![Box::new(ShellGlob::new()), Box::new(GlobsetMatcher::new())]
    }

    #[test]
    fn test_star_extension_requires_full_match() {
        for backend in backends() {
            assert!(backend.is_match("main.py", "*.py").unwrap());
            assert!(!backend.is_match("main.pyc", "*.py").unwrap());
            assert!(!backend.is_match("py", "*.py").unwrap());
        }
    }

    #[test]
    fn test_question_mark_matches_one_character() {
        for backend in backends() {
            assert!(backend.is_match("file1.txt", "file?.txt").unwrap());
            assert!(!backend.is_match("file.txt", "file?.txt").unwrap());
            assert!(!backend.is_match("file12.txt", "file?.txt").unwrap());
        }
    }

    #[test]
    fn test_character_classes_and_negation() {
        for backend in backends() {
            assert!(backend.is_match("1cache.tmp", "[0-9]*.tmp").unwrap());
            assert!(!backend.is_match("cache.tmp", "[0-9]*.tmp").unwrap());
            assert!(backend.is_match("b.log", "[!a]*.log").unwrap());
            assert!(!backend.is_match("a.log", "[!a]*.log").unwrap());
            assert!(backend.is_match("b.log", "[^a]*.log").unwrap());
            assert!(!backend.is_match("a.log", "[^a]*.log").unwrap());
        }
    }

    #[test]
    fn test_star_matches_hidden_names() {
        for backend in backends() {
            assert!(backend.is_match(".hidden", "*").unwrap());
            assert!(backend.is_match("State.csv", "*State.csv").unwrap());
        }
    }

    #[test]
    fn test_double_star_behaves_like_single_star() {
        for backend in backends() {
            assert!(backend.is_match("abc", "a**c").unwrap());
            assert!(backend.is_match("mission.misx", "**.misx").unwrap());
        }
    }

    #[test]
    fn test_case_sensitivity_is_configurable() {
        let sensitive = ShellGlob::new();
        assert!(!sensitive.is_match("README.MD", "*.md").unwrap());

        let insensitive: Vec<Box<dyn NameMatcher>> = vec![
            Box::new(ShellGlob::with_options(false, 8)),
            Box::new(GlobsetMatcher::with_options(false, 8)),
        ];
        for backend in insensitive {
            assert!(backend.is_match("README.MD", "*.md").unwrap());
        }
    }

    #[test]
    fn test_invalid_glob_returns_error() {
        for backend in backends() {
            let err = backend.check("[invalid").unwrap_err();
            assert!(matches!(err, Error::InvalidGlob { .. }));
        }
    }

    #[test]
    fn test_cache_is_bounded() {
        let glob = ShellGlob::with_options(true, 2);
        for pattern in ["*.a", "*.b", "*.c"] {
            glob.is_match("x.a", pattern).unwrap();
        }
        assert_eq!(glob.cache.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_backends_agree() {
        let names = [
            "main.py", "main.pyc", "py", "data.csv", "Data.CSV", "a", "x[1]", "Mission",
            "run_42.log", "notes.txt",
        ];
        let patterns = [
            "*", "*.py", "?", "data.*", "[A-Z]*", "[!a-z]*", "*_[0-9][0-9].log", "Mission",
            "*.t?t",
        ];
        let shell = ShellGlob::new();
        let set = GlobsetMatcher::new();
        for pattern in patterns {
            for name in names {
                assert_eq!(
                    shell.is_match(name, pattern).unwrap(),
                    set.is_match(name, pattern).unwrap(),
                    "backends disagree on {name:?} against {pattern:?}"
                );
            }
        }
    }
}
