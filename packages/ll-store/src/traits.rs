//! The byte-store trait.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;

/// What sits at a path in a byte store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    pub fn is_dir(self) -> bool {
        self == EntryKind::Directory
    }

    pub fn is_file(self) -> bool {
        self == EntryKind::File
    }
}

/// Physical storage of bytes at concrete paths.
///
/// This is the narrow waist of the stack: paths here are already resolved and
/// sanitized, data is opaque bytes, and every failure is a plain
/// [`io::Error`]. Higher layers decide what the bytes mean and which paths
/// are legal.
///
/// Implementations follow ordinary filesystem rules: the parent of a written
/// file or created directory must already exist as a directory, and removal of
/// a directory is recursive.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Box<dyn ByteStore>`.
pub trait ByteStore: Send + Sync {
    /// Create or truncate the file at `path` and fill it with `bytes`.
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Read every byte of the file at `path`.
    fn read(&self, path: &Path) -> io::Result<Bytes>;

    /// Delete the file at `path`, or the directory and everything below it.
    fn remove(&self, path: &Path) -> io::Result<()>;

    /// List the immediate children of the directory at `path` as full paths.
    ///
    /// The order is unspecified.
    fn list(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Create a single directory. Fails if anything already exists at `path`.
    fn create_dir(&self, path: &Path) -> io::Result<()>;

    /// Create a directory and any missing ancestors.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Move the file or directory at `from` to `to`.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Report what exists at `path`, or `None` when nothing does.
    fn kind(&self, path: &Path) -> io::Result<Option<EntryKind>>;

    /// Set or clear the "do not back up" attribute of a single entry.
    fn set_excluded_from_backup(&self, path: &Path, excluded: bool) -> io::Result<()>;

    /// Query the "do not back up" attribute of a single entry.
    fn is_excluded_from_backup(&self, path: &Path) -> io::Result<bool>;

    /// Every entry below the directory at `path`, parents before children.
    fn descendants(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        let mut pending = vec![path.to_path_buf()];
        while let Some(dir) = pending.pop() {
            let mut children = self.list(&dir)?;
            children.sort();
            for child in children {
                if self.kind(&child)? == Some(EntryKind::Directory) {
                    pending.push(child.clone());
                }
                found.push(child);
            }
        }
        Ok(found)
    }

    /// Whether anything exists at `path`. Errors count as absence.
    fn exists(&self, path: &Path) -> bool {
        matches!(self.kind(path), Ok(Some(_)))
    }
}

impl<T: ByteStore + ?Sized> ByteStore for Box<T> {
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        self.as_ref().write(path, bytes)
    }

    fn read(&self, path: &Path) -> io::Result<Bytes> {
        self.as_ref().read(path)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        self.as_ref().remove(path)
    }

    fn list(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.as_ref().list(path)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        self.as_ref().create_dir(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.as_ref().create_dir_all(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.as_ref().rename(from, to)
    }

    fn kind(&self, path: &Path) -> io::Result<Option<EntryKind>> {
        self.as_ref().kind(path)
    }

    fn set_excluded_from_backup(&self, path: &Path, excluded: bool) -> io::Result<()> {
        self.as_ref().set_excluded_from_backup(path, excluded)
    }

    fn is_excluded_from_backup(&self, path: &Path) -> io::Result<bool> {
        self.as_ref().is_excluded_from_backup(path)
    }

    fn descendants(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.as_ref().descendants(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryStore;

    #[test]
    fn entry_kind_predicates() {
        assert!(EntryKind::Directory.is_dir());
        assert!(!EntryKind::Directory.is_file());
        assert!(EntryKind::File.is_file());
    }

    #[test]
    fn default_descendants_walks_nested_directories() {
        let store = InMemoryStore::new();
        store.create_dir_all(Path::new("/root/a/b")).unwrap();
        store.write(Path::new("/root/a/b/leaf"), b"x").unwrap();
        store.write(Path::new("/root/top"), b"y").unwrap();

        let boxed: Box<dyn ByteStore> = Box::new(store);
        let mut found = boxed.descendants(Path::new("/root")).unwrap();
        found.sort();

        assert_eq!(
            found,
            vec![
                PathBuf::from("/root/a"),
                PathBuf::from("/root/a/b"),
                PathBuf::from("/root/a/b/leaf"),
                PathBuf::from("/root/top"),
            ]
        );
    }

    #[test]
    fn exists_reflects_kind() {
        let store = InMemoryStore::new();
        assert!(!store.exists(Path::new("/nothing")));
        store.create_dir_all(Path::new("/something")).unwrap();
        assert!(store.exists(Path::new("/something")));
    }
}
