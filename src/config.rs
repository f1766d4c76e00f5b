//! Engine configuration.
//!
//! Configuration is stored in TOML format. Every section and key is
//! optional:
//!
//! ```toml
//! [matching]
//! case_sensitive = true
//! backend = "shell"      # or "globset"
//! cache_size = 256
//!
//! [walk]
//! walker = "stack"       # or "walkdir"
//!
//! [assess]
//! max_levels = 0         # 0 derives the bound from the pattern depth
//! boundary = "/data"
//!
//! [shuffle]
//! workers = 0            # 0 copies serially
//! chunk_size = 262144
//!
//! [logging]
//! file = "/tmp/dirshape.log"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::assess::AssessDepth;
use crate::engine::Engine;
use crate::fs::LocalFs;
use crate::glob::{DEFAULT_CACHE_SIZE, GlobsetMatcher, NameMatcher, ShellGlob};
use crate::shuffle::{DEFAULT_CHUNK_SIZE, ShuffleOptions};
use crate::walk::{StackWalker, Walker, WalkdirWalker};

/// Errors that can occur while loading configuration.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    /// IO error while reading configuration.
    #[error("IO error reading configuration: {0}")]
    Io(String),
}

/// Which glob engine compiles name patterns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlobBackend {
    #[default]
    Shell,
    Globset,
}

/// Which traversal strategy a scan uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalkerKind {
    #[default]
    Stack,
    Walkdir,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Whether globs distinguish upper and lower case. Defaults to true.
    pub case_sensitive: bool,
    pub backend: GlobBackend,
    /// Compiled patterns kept in the LRU cache.
    pub cache_size: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            backend: GlobBackend::default(),
            cache_size: DEFAULT_CACHE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    pub walker: WalkerKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessConfig {
    /// Ancestor levels tried as roots; 0 derives it from the pattern depth.
    pub max_levels: usize,
    /// Directory assess never looks above.
    pub boundary: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShuffleConfig {
    /// Copy worker threads; 0 copies serially.
    pub workers: usize,
    /// Streaming copy buffer in bytes.
    pub chunk_size: usize,
}

impl Default for ShuffleConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log file appended to in addition to stderr.
    pub file: Option<PathBuf>,
}

/// Full configuration, one field per TOML section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirshapeConfig {
    pub matching: MatchingConfig,
    pub walk: WalkConfig,
    pub assess: AssessConfig,
    pub shuffle: ShuffleConfig,
    pub logging: LoggingConfig,
}

impl DirshapeConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.dirshape.toml` in the current directory
    /// 3. Look for `~/.config/dirshape/config.toml` in home directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but
    /// cannot be read, or if any file found is not valid.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(".dirshape.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("dirshape")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if file does not exist.
    /// Returns `ConfigError::Invalid` if TOML parsing fails.
    /// Returns `ConfigError::Io` if file cannot be read.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;

        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn glob_matcher(&self) -> Arc<dyn NameMatcher> {
        let MatchingConfig {
            case_sensitive,
            backend,
            cache_size,
        } = self.matching;
        match backend {
            GlobBackend::Shell => Arc::new(ShellGlob::with_options(case_sensitive, cache_size)),
            GlobBackend::Globset => {
                Arc::new(GlobsetMatcher::with_options(case_sensitive, cache_size))
            }
        }
    }

    pub fn walker(&self) -> Arc<dyn Walker> {
        match self.walk.walker {
            WalkerKind::Stack => Arc::new(StackWalker),
            WalkerKind::Walkdir => Arc::new(WalkdirWalker),
        }
    }

    pub fn assess_depth(&self) -> AssessDepth {
        match self.assess.max_levels {
            0 => AssessDepth::PatternDepth,
            levels => AssessDepth::Levels(levels),
        }
    }

    /// Shuffle options before command-line flags are applied.
    pub fn shuffle_options(&self) -> ShuffleOptions {
        ShuffleOptions {
            workers: NonZeroUsize::new(self.shuffle.workers),
            chunk_size: self.shuffle.chunk_size,
            ..ShuffleOptions::default()
        }
    }

    /// Builds a local-disk engine from this configuration.
    pub fn build_engine(&self) -> Engine {
        let engine = Engine::new(Arc::new(LocalFs))
            .with_globs(self.glob_matcher())
            .with_walker(self.walker())
            .with_assess_depth(self.assess_depth())
            .with_shuffle_defaults(self.shuffle_options());
        match &self.assess.boundary {
            Some(boundary) => engine.with_boundary(boundary.clone()),
            None => engine,
        }
    }
}
