//! In-memory filesystem implementation

use std::collections::HashMap;
use std::io::{Error as IoError, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::traits::{FileSystem, normalize_path};
use crate::error::Result;

/// In-memory filesystem.
///
/// Stores listfiles and directories in a HashMap keyed by normalized
/// absolute path. Adding a file creates its parent directories.
pub struct InMemoryFs {
    entries: RwLock<HashMap<PathBuf, FsEntry>>,
}

#[derive(Debug, Clone)]
enum FsEntry {
    File(String),
    Directory,
}

impl Default for InMemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryFs {
    /// Create a new in-memory filesystem holding only `/`.
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(PathBuf::from("/"), FsEntry::Directory);
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Builder-style [`add_file`](Self::add_file).
    pub fn with_file(self, path: impl AsRef<Path>, content: impl Into<String>) -> Self {
        self.add_file(path, content);
        self
    }

    /// Add (or replace) a file, creating parent directories.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = Self::absolute(path.as_ref());
        let mut entries = self.write();
        if let Some(parent) = path.parent() {
            Self::create_dirs(&mut entries, parent);
        }
        entries.insert(path, FsEntry::File(content.into()));
    }

    /// Add a directory and its parents.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = Self::absolute(path.as_ref());
        Self::create_dirs(&mut self.write(), &path);
    }

    fn create_dirs(entries: &mut HashMap<PathBuf, FsEntry>, path: &Path) {
        let mut current = PathBuf::from("/");
        for component in path.components().skip(1) {
            current.push(component);
            entries
                .entry(current.clone())
                .or_insert(FsEntry::Directory);
        }
    }

    fn absolute(path: &Path) -> PathBuf {
        normalize_path(&Path::new("/").join(path))
    }

    // A poisoned lock only means a writer panicked mid-insert; the map
    // itself is still usable.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<PathBuf, FsEntry>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<PathBuf, FsEntry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl FileSystem for InMemoryFs {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        match self.read().get(&Self::absolute(path)) {
            Some(FsEntry::File(content)) => Ok(content.clone()),
            Some(FsEntry::Directory) => Err(IoError::other("is a directory").into()),
            None => Err(IoError::new(ErrorKind::NotFound, "file not found").into()),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.read().contains_key(&Self::absolute(path))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(
            self.read().get(&Self::absolute(path)),
            Some(FsEntry::Directory)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_read_file() {
        let fs = InMemoryFs::new().with_file("/src/CMakeLists.txt", "project(x)");
        assert_eq!(
            fs.read_to_string(Path::new("/src/CMakeLists.txt")).unwrap(),
            "project(x)"
        );
        assert!(fs.is_dir(Path::new("/src")));
        assert!(fs.is_file(Path::new("/src/CMakeLists.txt")));
    }

    #[test]
    fn test_paths_are_normalized() {
        let fs = InMemoryFs::new().with_file("/a/b/f.cmake", "");
        assert!(fs.exists(Path::new("/a/./c/../b/f.cmake")));
    }

    #[test]
    fn test_missing_file() {
        let fs = InMemoryFs::new();
        let err = fs.read_to_string(Path::new("/nope")).unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert!(!fs.exists(Path::new("/nope")));
    }

    #[test]
    fn test_directory_is_not_readable() {
        let fs = InMemoryFs::new();
        fs.add_dir("/d");
        assert!(fs.read_to_string(Path::new("/d")).is_err());
        assert!(!fs.is_file(Path::new("/d")));
    }
}
