//! dirshape - find directory trees by their shape and copy them elsewhere
//!
//! A [`StructurePattern`] declares what a directory must contain: file name
//! globs and sub-patterns for subdirectories, each either required (they
//! decide whether a directory matches) or optional (they are only copied
//! along). The library can:
//! - scan a tree for every directory matching a set of patterns
//! - assess which pattern roots contain a given file
//! - shuffle matches to new locations, copying only pattern members
//!
//! Everything runs against a pluggable [`FileSystem`], so the same code
//! works on the local disk and on the in-memory [`MemoryFs`].

pub mod assess;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod fs;
pub mod glob;
pub mod logging;
pub mod matcher;
pub mod output;
pub mod pattern;
pub mod scan;
pub mod shuffle;
pub mod walk;

pub use assess::{Assess, AssessDepth};
pub use config::{ConfigError, DirshapeConfig};
pub use engine::{Engine, assess, scan, shuffle_to};
pub use error::{Error, Result};
pub use fs::{DirListing, FileSystem, LocalFs, MemoryFs};
pub use glob::{GlobsetMatcher, NameMatcher, ShellGlob};
pub use matcher::Matcher;
pub use pattern::StructurePattern;
pub use scan::ScanResult;
pub use shuffle::{ShuffleInput, ShuffleOptions, ShuffleReport, ShuffleResult, Shuffler};
pub use walk::{StackWalker, WalkEntry, Walker, WalkdirWalker};

pub use cli::run_cli;
