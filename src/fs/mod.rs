//! Filesystem capabilities the matcher and copy engine depend on.
//!
//! Everything above this module talks to a [`FileSystem`] rather than to
//! `std::fs`, so the same scan/assess/shuffle code runs against the local
//! disk ([`LocalFs`]) or an in-process tree ([`MemoryFs`]).

mod local;
mod memory;

pub use local::LocalFs;
pub use memory::MemoryFs;

use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Immediate children of one directory, split by kind and sorted by name.
///
/// Entries that are neither regular files nor directories (symlinks,
/// sockets, ...) are left out. Names are kept exactly as the backend
/// reports them, including names that are not valid UTF-8.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirListing {
    pub dirnames: Vec<OsString>,
    pub filenames: Vec<OsString>,
}

/// The set of operations a storage backend has to provide.
pub trait FileSystem: Send + Sync {
    /// Lists the immediate children of `path`.
    fn read_dir(&self, path: &Path) -> io::Result<DirListing>;

    fn is_file(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    fn exists(&self, path: &Path) -> bool {
        self.is_file(path) || self.is_dir(path)
    }

    /// Opens a file for streaming reads.
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>>;

    /// Creates (or truncates) a file for streaming writes.
    fn create_write(&self, path: &Path) -> io::Result<Box<dyn Write + Send>>;

    /// Creates a single directory, failing with `AlreadyExists` if present.
    fn create_dir(&self, path: &Path) -> io::Result<()>;

    /// Creates a directory and any missing parents.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Resolves `path` to an absolute, normalized form.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;

    /// Copies access/modification times from `from` onto `to`.
    ///
    /// Backends without timestamps keep the default no-op.
    fn copy_times(&self, _from: &Path, _to: &Path) -> io::Result<()> {
        Ok(())
    }
}
