use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use filetime::FileTime;

use super::{DirListing, FileSystem};

/// The host filesystem, through `std::fs`.
///
/// Symbolic links are not followed when listing a directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn read_dir(&self, path: &Path) -> io::Result<DirListing> {
        let mut listing = DirListing::default();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let name = entry.file_name();
            if file_type.is_dir() {
                listing.dirnames.push(name);
            } else if file_type.is_file() {
                listing.filenames.push(name);
            }
        }
        listing.dirnames.sort();
        listing.filenames.sort();
        Ok(listing)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(path)?))
    }

    fn create_write(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        Ok(Box::new(File::create(path)?))
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }

    fn copy_times(&self, from: &Path, to: &Path) -> io::Result<()> {
        let metadata = fs::metadata(from)?;
        let atime = FileTime::from_last_access_time(&metadata);
        let mtime = FileTime::from_last_modification_time(&metadata);
        filetime::set_file_times(to, atime, mtime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_dir_splits_and_sorts_entries() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        fs::write(base.join("b.txt"), "b").unwrap();
        fs::write(base.join("a.txt"), "a").unwrap();
        fs::create_dir(base.join("sub")).unwrap();

        let listing = LocalFs.read_dir(base).unwrap();
        assert_eq!(listing.filenames, vec!["a.txt", "b.txt"]);
        assert_eq!(listing.dirnames, vec!["sub"]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_read_dir_keeps_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        let odd = OsStr::from_bytes(b"bad\xffname");
        fs::create_dir(base.join(odd)).unwrap();
        fs::write(base.join(odd).join("inner.txt"), "x").unwrap();

        let listing = LocalFs.read_dir(base).unwrap();
        assert_eq!(listing.dirnames, vec![odd.to_os_string()]);

        let child = LocalFs.read_dir(&base.join(&listing.dirnames[0])).unwrap();
        assert_eq!(child.filenames, vec!["inner.txt"]);
    }

    #[test]
    fn test_read_dir_missing_directory_errors() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let result = LocalFs.read_dir(&temp_dir.path().join("missing"));
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_copy_times_preserves_mtime() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("source.txt");
        let target = temp_dir.path().join("target.txt");
        fs::write(&source, "data").unwrap();
        fs::write(&target, "data").unwrap();

        let stamp = FileTime::from_unix_time(1_000_000_000, 0);
        filetime::set_file_mtime(&source, stamp).unwrap();

        LocalFs.copy_times(&source, &target).unwrap();
        let copied = FileTime::from_last_modification_time(&fs::metadata(&target).unwrap());
        assert_eq!(copied, stamp);
    }
}
