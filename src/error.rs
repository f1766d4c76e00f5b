//! Error types shared across the crate.

use std::path::PathBuf;

use crate::config::ConfigError;

/// Errors produced while loading patterns, walking trees, or copying matches.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A glob in a pattern could not be compiled.
    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidGlob {
        /// The offending glob text.
        pattern: String,
        /// Why the glob backend rejected it.
        reason: String,
    },

    /// A pattern declaration was not valid JSON or had the wrong shape.
    #[error("Invalid pattern declaration: {0}")]
    InvalidDeclaration(#[from] serde_json::Error),

    /// A pattern declaration file could not be read.
    #[error("Failed to read pattern file {}: {source}", path.display())]
    PatternFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A filesystem operation failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A path that must be a directory is not one.
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// A shuffle destination exists and overwriting was not requested.
    #[error("Destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The parallel copy pool could not be started.
    #[error("Failed to start copy workers: {0}")]
    WorkerPool(String),
}

impl Error {
    /// Wraps an I/O error with the path it occurred at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for dirshape operations.
pub type Result<T> = std::result::Result<T, Error>;
