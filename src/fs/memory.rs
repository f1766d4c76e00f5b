use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Cursor, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use super::{DirListing, FileSystem};

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File { data: Vec<u8>, modified: SystemTime },
}

#[derive(Debug)]
struct Tree {
    nodes: BTreeMap<PathBuf, Node>,
    denied: BTreeSet<PathBuf>,
}

/// An in-process filesystem tree.
///
/// Paths are absolute and normalized on entry (`.` and `..` are resolved,
/// relative paths hang off `/`). Clones share the same tree. Directories
/// can be marked as denied to simulate permission failures: listing them,
/// or creating anything inside them, fails with `PermissionDenied`.
#[derive(Debug, Clone)]
pub struct MemoryFs {
    tree: Arc<Mutex<Tree>>,
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::from("/");
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::ParentDir => {
                out.pop();
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    out
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} does not exist", path.display()),
    )
}

fn denied(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::PermissionDenied,
        format!("permission denied: {}", path.display()),
    )
}

impl Tree {
    /// Checks that a new entry may be created at `path`.
    fn check_creatable(&self, path: &Path) -> io::Result<()> {
        let parent = path.parent().ok_or_else(|| not_found(path))?;
        if self.denied.contains(parent) {
            return Err(denied(parent));
        }
        match self.nodes.get(parent) {
            Some(Node::Dir) => Ok(()),
            Some(Node::File { .. }) => Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("{} is not a directory", parent.display()),
            )),
            None => Err(not_found(parent)),
        }
    }
}

impl MemoryFs {
    /// Creates a tree containing only the root directory.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(PathBuf::from("/"), Node::Dir);
        Self {
            tree: Arc::new(Mutex::new(Tree {
                nodes,
                denied: BTreeSet::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates a directory and its parents.
    pub fn add_dir(&self, path: impl AsRef<Path>) -> io::Result<()> {
        self.create_dir_all(path.as_ref())
    }

    /// Writes a file, creating parent directories as needed.
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> io::Result<()> {
        let path = normalize(path.as_ref());
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent)?;
        }
        let mut writer = self.create_write(&path)?;
        writer.write_all(contents.as_ref())
    }

    /// Returns the contents of a file, if it exists.
    pub fn read(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.lock().nodes.get(&normalize(path.as_ref())) {
            Some(Node::File { data, .. }) => Some(data.clone()),
            _ => None,
        }
    }

    /// Returns the modification time of a file, if it exists.
    pub fn modified(&self, path: impl AsRef<Path>) -> Option<SystemTime> {
        match self.lock().nodes.get(&normalize(path.as_ref())) {
            Some(Node::File { modified, .. }) => Some(*modified),
            _ => None,
        }
    }

    /// Overrides the modification time of an existing file.
    pub fn set_modified(&self, path: impl AsRef<Path>, time: SystemTime) -> io::Result<()> {
        let path = normalize(path.as_ref());
        match self.lock().nodes.get_mut(&path) {
            Some(Node::File { modified, .. }) => {
                *modified = time;
                Ok(())
            }
            _ => Err(not_found(&path)),
        }
    }

    /// Marks a directory as unreadable and unwritable.
    pub fn deny(&self, path: impl AsRef<Path>) {
        self.lock().denied.insert(normalize(path.as_ref()));
    }
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for MemoryFs {
    fn read_dir(&self, path: &Path) -> io::Result<DirListing> {
        let path = normalize(path);
        let tree = self.lock();
        if tree.denied.contains(&path) {
            return Err(denied(&path));
        }
        match tree.nodes.get(&path) {
            Some(Node::Dir) => {}
            Some(Node::File { .. }) => {
                return Err(io::Error::new(
                    io::ErrorKind::NotADirectory,
                    format!("{} is not a directory", path.display()),
                ));
            }
            None => return Err(not_found(&path)),
        }

        let mut listing = DirListing::default();
        let children = tree
            .nodes
            .range(path.clone()..)
            .skip(1)
            .take_while(|(child, _)| child.starts_with(&path))
            .filter(|(child, _)| child.parent() == Some(path.as_path()));
        for (child, node) in children {
            let Some(name) = child.file_name() else {
                continue;
            };
            let name = name.to_os_string();
            match node {
                Node::Dir => listing.dirnames.push(name),
                Node::File { .. } => listing.filenames.push(name),
            }
        }
        Ok(listing)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(
            self.lock().nodes.get(&normalize(path)),
            Some(Node::File { .. })
        )
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().nodes.get(&normalize(path)), Some(Node::Dir))
    }

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        let path = normalize(path);
        match self.lock().nodes.get(&path) {
            Some(Node::File { data, .. }) => Ok(Box::new(Cursor::new(data.clone()))),
            Some(Node::Dir) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{} is a directory", path.display()),
            )),
            None => Err(not_found(&path)),
        }
    }

    fn create_write(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        let path = normalize(path);
        let mut tree = self.lock();
        tree.check_creatable(&path)?;
        if let Some(Node::Dir) = tree.nodes.get(&path) {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{} is a directory", path.display()),
            ));
        }
        tree.nodes.insert(
            path.clone(),
            Node::File {
                data: Vec::new(),
                modified: SystemTime::now(),
            },
        );
        Ok(Box::new(MemoryWriter {
            tree: Arc::clone(&self.tree),
            path,
        }))
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        let path = normalize(path);
        let mut tree = self.lock();
        if tree.nodes.contains_key(&path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", path.display()),
            ));
        }
        tree.check_creatable(&path)?;
        tree.nodes.insert(path, Node::Dir);
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let path = normalize(path);
        let mut tree = self.lock();
        let mut current = PathBuf::from("/");
        for component in path.components().skip(1) {
            current.push(component);
            match tree.nodes.get(&current) {
                Some(Node::Dir) => {}
                Some(Node::File { .. }) => {
                    return Err(io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        format!("{} exists and is a file", current.display()),
                    ));
                }
                None => {
                    tree.check_creatable(&current)?;
                    tree.nodes.insert(current.clone(), Node::Dir);
                }
            }
        }
        Ok(())
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        let path = normalize(path);
        if self.lock().nodes.contains_key(&path) {
            Ok(path)
        } else {
            Err(not_found(&path))
        }
    }

    fn copy_times(&self, from: &Path, to: &Path) -> io::Result<()> {
        let source_time = self.modified(from).ok_or_else(|| not_found(from))?;
        self.set_modified(to, source_time)
    }
}

/// Appends written bytes straight into the shared tree.
struct MemoryWriter {
    tree: Arc<Mutex<Tree>>,
    path: PathBuf,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut tree = self.tree.lock().unwrap_or_else(PoisonError::into_inner);
        match tree.nodes.get_mut(&self.path) {
            Some(Node::File { data, modified }) => {
                data.extend_from_slice(buf);
                *modified = SystemTime::now();
                Ok(buf.len())
            }
            _ => Err(not_found(&self.path)),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tree_has_empty_root() {
        let fs = MemoryFs::new();
        assert!(fs.is_dir(Path::new("/")));
        assert_eq!(fs.read_dir(Path::new("/")).unwrap(), DirListing::default());
    }

    #[test]
    fn test_read_dir_lists_only_direct_children() {
        let fs = MemoryFs::new();
        fs.add_file("/dir/file.txt", "hello").unwrap();
        fs.add_file("/dir/sub/deep.txt", "deep").unwrap();
        fs.add_dir("/dir b").unwrap();

        let root = fs.read_dir(Path::new("/")).unwrap();
        assert_eq!(root.dirnames, vec!["dir", "dir b"]);
        assert!(root.filenames.is_empty());

        let dir = fs.read_dir(Path::new("/dir")).unwrap();
        assert_eq!(dir.dirnames, vec!["sub"]);
        assert_eq!(dir.filenames, vec!["file.txt"]);
    }

    #[test]
    fn test_paths_are_normalized() {
        let fs = MemoryFs::new();
        fs.add_file("dir/./a/../file.txt", "x").unwrap();
        assert!(fs.is_file(Path::new("/dir/file.txt")));
        assert_eq!(
            fs.canonicalize(Path::new("/dir/../dir")).unwrap(),
            PathBuf::from("/dir")
        );
    }

    #[test]
    fn test_create_dir_fails_when_present() {
        let fs = MemoryFs::new();
        fs.create_dir(Path::new("/dest")).unwrap();
        let err = fs.create_dir(Path::new("/dest")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_writes_stream_into_tree() {
        let fs = MemoryFs::new();
        let mut writer = fs.create_write(Path::new("/out.bin")).unwrap();
        writer.write_all(b"abc").unwrap();
        writer.write_all(b"def").unwrap();
        assert_eq!(fs.read("/out.bin").unwrap(), b"abcdef");
    }

    #[test]
    fn test_denied_directory_rejects_reads_and_writes() {
        let fs = MemoryFs::new();
        fs.add_dir("/locked").unwrap();
        fs.deny("/locked");

        let err = fs.read_dir(Path::new("/locked")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        let err = fs.create_dir_all(Path::new("/locked/child")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_copy_times_copies_modification_time() {
        let fs = MemoryFs::new();
        fs.add_file("/a.txt", "a").unwrap();
        fs.add_file("/b.txt", "b").unwrap();
        let stamp = SystemTime::UNIX_EPOCH;
        fs.set_modified("/a.txt", stamp).unwrap();

        fs.copy_times(Path::new("/a.txt"), Path::new("/b.txt")).unwrap();
        assert_eq!(fs.modified("/b.txt"), Some(stamp));
    }
}
