//! Log output for the command-line tool.
//!
//! Events always go to stderr. A log file can be added through the
//! `DIRSHAPE_LOG_FILE` environment variable or the `[logging]` config
//! section; it is appended to, without ANSI colors.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Environment variable naming the log file.
pub const LOG_FILE_ENV: &str = "DIRSHAPE_LOG_FILE";

/// Maps a `-v` count to a level: errors only by default, then warn, info, debug.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::ERROR,
        1 => LevelFilter::WARN,
        2 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    }
}

/// The environment variable wins over the config file.
pub fn log_file(config: &LoggingConfig) -> Option<PathBuf> {
    std::env::var_os(LOG_FILE_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| config.file.clone())
}

/// Installs the global subscriber.
///
/// `RUST_LOG`, when set, overrides the verbosity-derived level. Calling this
/// again after a subscriber is installed is a no-op.
pub fn init(verbosity: u8, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(level_for(verbosity).into())
        .from_env_lossy();

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| Error::io(path, e))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(level_for(0), LevelFilter::ERROR);
        assert_eq!(level_for(1), LevelFilter::WARN);
        assert_eq!(level_for(2), LevelFilter::INFO);
        assert_eq!(level_for(3), LevelFilter::DEBUG);
        assert_eq!(level_for(9), LevelFilter::DEBUG);
    }

    #[test]
    fn test_log_file_falls_back_to_config() {
        // The variable is not set by the test harness.
        if std::env::var_os(LOG_FILE_ENV).is_some() {
            return;
        }
        let config = LoggingConfig {
            file: Some(PathBuf::from("/tmp/from-config.log")),
        };
        assert_eq!(log_file(&config), Some(PathBuf::from("/tmp/from-config.log")));
        assert_eq!(log_file(&LoggingConfig::default()), None);
    }

    #[test]
    fn test_init_creates_log_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("dirshape.log");
        init(0, Some(&path)).expect("Failed to initialise logging");
        assert!(path.exists());
    }

    #[test]
    fn test_init_reports_unopenable_log_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("missing-dir").join("dirshape.log");
        assert!(matches!(init(0, Some(&path)), Err(Error::Io { .. })));
    }
}
