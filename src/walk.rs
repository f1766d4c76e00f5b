//! Directory traversal producing `(path, dirnames, filenames)` snapshots.
//!
//! Every directory under the root, the root included, is visited exactly
//! once. A [`WalkEntry`] is a snapshot: changing its name lists has no
//! effect on where the walk goes next.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::fs::{DirListing, FileSystem};

/// One visited directory and its immediate children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub path: PathBuf,
    pub dirnames: Vec<OsString>,
    pub filenames: Vec<OsString>,
}

impl WalkEntry {
    pub fn new(path: impl Into<PathBuf>, listing: DirListing) -> Self {
        Self {
            path: path.into(),
            dirnames: listing.dirnames,
            filenames: listing.filenames,
        }
    }

    /// Lists a single directory through `fs`.
    pub fn list(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        let listing = fs.read_dir(path).map_err(|e| Error::io(path, e))?;
        Ok(Self::new(path, listing))
    }

    /// The directory's own name, or `""` for a filesystem root.
    ///
    /// Names that are not valid UTF-8 are decoded lossily; this form is only
    /// for glob matching, never for building paths.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Boxed stream of walk results.
pub type WalkIter<'a> = Box<dyn Iterator<Item = Result<WalkEntry>> + 'a>;

/// A traversal strategy.
pub trait Walker: Send + Sync {
    fn walk<'a>(&'a self, fs: &'a dyn FileSystem, root: &Path) -> WalkIter<'a>;

    /// Short identifier used in logs.
    fn name(&self) -> &'static str;
}

/// Lazy depth-first walk that only needs [`FileSystem::read_dir`].
///
/// Works with any backend. Children are visited in name order.
#[derive(Debug, Clone, Copy, Default)]
pub struct StackWalker;

struct StackWalk<'a> {
    fs: &'a dyn FileSystem,
    stack: Vec<PathBuf>,
}

impl Iterator for StackWalk<'_> {
    type Item = Result<WalkEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.stack.pop()?;
        match WalkEntry::list(self.fs, &path) {
            Ok(entry) => {
                self.stack
                    .extend(entry.dirnames.iter().rev().map(|name| path.join(name)));
                Some(Ok(entry))
            }
            Err(e) => {
                // Nothing further is trustworthy once a listing fails.
                self.stack.clear();
                Some(Err(e))
            }
        }
    }
}

impl Walker for StackWalker {
    fn walk<'a>(&'a self, fs: &'a dyn FileSystem, root: &Path) -> WalkIter<'a> {
        Box::new(StackWalk {
            fs,
            stack: vec![root.to_path_buf()],
        })
    }

    fn name(&self) -> &'static str {
        "stack"
    }
}

/// Walk of the local disk using the `walkdir` crate.
///
/// Reads the host filesystem directly and ignores the `fs` argument, so it
/// must only be paired with [`LocalFs`](crate::fs::LocalFs). The whole tree
/// is enumerated up front and regrouped per directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkdirWalker;

fn walkdir_error(err: walkdir::Error, root: &Path) -> Error {
    let path = err.path().unwrap_or(root).to_path_buf();
    let source = match err.into_io_error() {
        Some(io_err) => io_err,
        None => io::Error::other("filesystem loop detected"),
    };
    Error::io(path, source)
}

impl WalkdirWalker {
    fn collect(root: &Path) -> Result<Vec<WalkEntry>> {
        let mut entries: BTreeMap<PathBuf, WalkEntry> = BTreeMap::new();
        let walker = WalkDir::new(root).follow_links(false).sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(|e| walkdir_error(e, root))?;
            let path = entry.path();
            let file_type = entry.file_type();

            if file_type.is_dir() {
                entries
                    .entry(path.to_path_buf())
                    .or_insert_with(|| WalkEntry::new(path, DirListing::default()));
            }
            if entry.depth() == 0 {
                continue;
            }

            let Some(parent) = path.parent() else {
                continue;
            };
            let name = entry.file_name().to_os_string();
            let listing = entries
                .entry(parent.to_path_buf())
                .or_insert_with(|| WalkEntry::new(parent, DirListing::default()));
            if file_type.is_dir() {
                listing.dirnames.push(name);
            } else if file_type.is_file() {
                listing.filenames.push(name);
            }
        }

        Ok(entries.into_values().collect())
    }
}

impl Walker for WalkdirWalker {
    fn walk<'a>(&'a self, _fs: &'a dyn FileSystem, root: &Path) -> WalkIter<'a> {
        match Self::collect(root) {
            Ok(entries) => Box::new(entries.into_iter().map(Ok)),
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    }

    fn name(&self) -> &'static str {
        "walkdir"
    }
}
