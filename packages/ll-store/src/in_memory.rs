//! In-memory byte store.
//!
//! A tree of files and directories kept in a map, following the same rules a
//! real filesystem would. Useful for hermetic tests and anywhere a scratch
//! store is enough.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use bytes::Bytes;

use crate::traits::{ByteStore, EntryKind};

#[derive(Debug, Clone)]
enum Node {
    File { bytes: Bytes, excluded: bool },
    Directory { excluded: bool },
}

impl Node {
    fn kind(&self) -> EntryKind {
        match self {
            Node::File { .. } => EntryKind::File,
            Node::Directory { .. } => EntryKind::Directory,
        }
    }
}

/// A byte store that never touches the disk.
///
/// # Example
///
/// ```rust
/// use std::path::Path;
/// use stowage_ll_store::{ByteStore, InMemoryStore};
///
/// let store = InMemoryStore::new();
/// store.create_dir_all(Path::new("/data")).unwrap();
/// store.write(Path::new("/data/greeting"), b"hello").unwrap();
///
/// assert_eq!(&store.read(Path::new("/data/greeting")).unwrap()[..], b"hello");
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Mutex<BTreeMap<PathBuf, Node>>,
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no entry at {}", path.display()),
    )
}

fn already_exists(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("an entry already exists at {}", path.display()),
    )
}

fn not_a_directory(path: &Path) -> io::Error {
    io::Error::other(format!("{} is not a directory", path.display()))
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries (files and directories) currently held.
    pub fn len(&self) -> io::Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> io::Result<bool> {
        self.len().map(|len| len == 0)
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, BTreeMap<PathBuf, Node>>> {
        self.entries
            .lock()
            .map_err(|_| io::Error::other("in-memory store lock poisoned"))
    }

    fn require_parent_dir(entries: &BTreeMap<PathBuf, Node>, path: &Path) -> io::Result<()> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => return Ok(()),
        };
        match entries.get(parent) {
            Some(Node::Directory { .. }) => Ok(()),
            Some(Node::File { .. }) => Err(not_a_directory(parent)),
            None => Err(not_found(parent)),
        }
    }
}

impl ByteStore for InMemoryStore {
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut entries = self.lock()?;
        Self::require_parent_dir(&entries, path)?;

        let excluded = match entries.get(path) {
            Some(Node::Directory { .. }) => {
                return Err(io::Error::other(format!(
                    "{} is a directory",
                    path.display()
                )))
            }
            Some(Node::File { excluded, .. }) => *excluded,
            None => false,
        };

        entries.insert(
            path.to_path_buf(),
            Node::File {
                bytes: Bytes::copy_from_slice(bytes),
                excluded,
            },
        );
        Ok(())
    }

    fn read(&self, path: &Path) -> io::Result<Bytes> {
        match self.lock()?.get(path) {
            Some(Node::File { bytes, .. }) => Ok(bytes.clone()),
            Some(Node::Directory { .. }) => Err(io::Error::other(format!(
                "{} is a directory",
                path.display()
            ))),
            None => Err(not_found(path)),
        }
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        let mut entries = self.lock()?;
        if !entries.contains_key(path) {
            return Err(not_found(path));
        }
        entries.retain(|key, _| !key.starts_with(path));
        Ok(())
    }

    fn list(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let entries = self.lock()?;
        match entries.get(path) {
            Some(Node::Directory { .. }) => {}
            Some(Node::File { .. }) => return Err(not_a_directory(path)),
            None => return Err(not_found(path)),
        }
        Ok(entries
            .keys()
            .filter(|key| key.parent() == Some(path))
            .cloned()
            .collect())
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        let mut entries = self.lock()?;
        if entries.contains_key(path) {
            return Err(already_exists(path));
        }
        Self::require_parent_dir(&entries, path)?;
        entries.insert(path.to_path_buf(), Node::Directory { excluded: false });
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut entries = self.lock()?;
        let mut ancestors: Vec<&Path> = path
            .ancestors()
            .filter(|ancestor| !ancestor.as_os_str().is_empty())
            .collect();
        ancestors.reverse();

        for ancestor in ancestors {
            match entries.get(ancestor) {
                Some(Node::Directory { .. }) => {}
                Some(Node::File { .. }) => return Err(not_a_directory(ancestor)),
                None => {
                    entries.insert(ancestor.to_path_buf(), Node::Directory { excluded: false });
                }
            }
        }
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut entries = self.lock()?;
        let source_kind = entries.get(from).map(Node::kind).ok_or_else(|| not_found(from))?;
        if from == to {
            return Ok(());
        }
        if to.starts_with(from) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "cannot move {} into itself at {}",
                    from.display(),
                    to.display()
                ),
            ));
        }
        Self::require_parent_dir(&entries, to)?;
        match (source_kind, entries.get(to).map(Node::kind)) {
            (_, None) => {}
            // Files replace files, as rename(2) does.
            (EntryKind::File, Some(EntryKind::File)) => {
                entries.remove(to);
            }
            _ => return Err(already_exists(to)),
        }

        let moved: Vec<PathBuf> = entries
            .keys()
            .filter(|key| key.starts_with(from))
            .cloned()
            .collect();
        for key in moved {
            if let Some(node) = entries.remove(&key) {
                let relative = key.strip_prefix(from).map_err(io::Error::other)?;
                let destination = if relative.as_os_str().is_empty() {
                    to.to_path_buf()
                } else {
                    to.join(relative)
                };
                entries.insert(destination, node);
            }
        }
        Ok(())
    }

    fn kind(&self, path: &Path) -> io::Result<Option<EntryKind>> {
        Ok(self.lock()?.get(path).map(Node::kind))
    }

    fn set_excluded_from_backup(&self, path: &Path, excluded: bool) -> io::Result<()> {
        let mut entries = self.lock()?;
        match entries.get_mut(path) {
            Some(Node::File { excluded: flag, .. }) | Some(Node::Directory { excluded: flag }) => {
                *flag = excluded;
                Ok(())
            }
            None => Err(not_found(path)),
        }
    }

    fn is_excluded_from_backup(&self, path: &Path) -> io::Result<bool> {
        match self.lock()?.get(path) {
            Some(Node::File { excluded, .. }) | Some(Node::Directory { excluded }) => Ok(*excluded),
            None => Err(not_found(path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> &Path {
        Path::new(s)
    }

    #[test]
    fn write_requires_parent_directory() {
        let store = InMemoryStore::new();
        let err = store.write(p("/missing/file"), b"data").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        store.create_dir_all(p("/present")).unwrap();
        store.write(p("/present/file"), b"data").unwrap();
        assert_eq!(&store.read(p("/present/file")).unwrap()[..], b"data");
    }

    #[test]
    fn overwrite_keeps_backup_flag() {
        let store = InMemoryStore::new();
        store.create_dir_all(p("/d")).unwrap();
        store.write(p("/d/f"), b"one").unwrap();
        store.set_excluded_from_backup(p("/d/f"), true).unwrap();
        store.write(p("/d/f"), b"two").unwrap();

        assert_eq!(&store.read(p("/d/f")).unwrap()[..], b"two");
        assert!(store.is_excluded_from_backup(p("/d/f")).unwrap());
    }

    #[test]
    fn len_counts_entries() {
        let store = InMemoryStore::new();
        assert!(store.is_empty().unwrap());

        store.create_dir_all(p("/a/b")).unwrap();
        store.write(p("/a/b/f"), b"x").unwrap();
        assert_eq!(store.len().unwrap(), 3);
    }

    #[test]
    fn poisoned_lock_is_an_error_everywhere() {
        let store = InMemoryStore::new();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _entries = store.entries.lock().unwrap();
            panic!("poisoning the store");
        }));

        assert!(store.len().is_err());
        assert!(store.is_empty().is_err());
        assert!(store.read(p("/anything")).is_err());
    }

    #[test]
    fn read_nonexistent_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.read(p("/nope")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn list_returns_only_immediate_children() {
        let store = InMemoryStore::new();
        store.create_dir_all(p("/d/sub")).unwrap();
        store.write(p("/d/a"), b"").unwrap();
        store.write(p("/d/sub/b"), b"").unwrap();

        let mut children = store.list(p("/d")).unwrap();
        children.sort();
        assert_eq!(children, vec![PathBuf::from("/d/a"), PathBuf::from("/d/sub")]);
    }

    #[test]
    fn remove_is_recursive() {
        let store = InMemoryStore::new();
        store.create_dir_all(p("/d/sub")).unwrap();
        store.write(p("/d/sub/b"), b"").unwrap();

        store.remove(p("/d")).unwrap();
        assert_eq!(store.kind(p("/d")).unwrap(), None);
        assert_eq!(store.kind(p("/d/sub/b")).unwrap(), None);
        // The root survives.
        assert_eq!(store.kind(p("/")).unwrap(), Some(EntryKind::Directory));
    }

    #[test]
    fn remove_does_not_touch_siblings_sharing_a_prefix() {
        let store = InMemoryStore::new();
        store.create_dir_all(p("/d")).unwrap();
        store.write(p("/d/item"), b"1").unwrap();
        store.write(p("/d/item2"), b"2").unwrap();

        store.remove(p("/d/item")).unwrap();
        assert_eq!(store.kind(p("/d/item2")).unwrap(), Some(EntryKind::File));
    }

    #[test]
    fn create_dir_fails_when_present() {
        let store = InMemoryStore::new();
        store.create_dir_all(p("/d")).unwrap();
        let err = store.create_dir(p("/d")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn create_dir_all_through_file_fails() {
        let store = InMemoryStore::new();
        store.create_dir_all(p("/d")).unwrap();
        store.write(p("/d/file"), b"").unwrap();
        assert!(store.create_dir_all(p("/d/file/below")).is_err());
    }

    #[test]
    fn rename_moves_whole_subtree() {
        let store = InMemoryStore::new();
        store.create_dir_all(p("/a/dir")).unwrap();
        store.create_dir_all(p("/b")).unwrap();
        store.write(p("/a/dir/0"), b"zero").unwrap();
        store.write(p("/a/dir/1"), b"one").unwrap();

        store.rename(p("/a/dir"), p("/b/moved")).unwrap();

        assert_eq!(store.kind(p("/a/dir")).unwrap(), None);
        assert_eq!(&store.read(p("/b/moved/0")).unwrap()[..], b"zero");
        assert_eq!(&store.read(p("/b/moved/1")).unwrap()[..], b"one");
    }

    #[test]
    fn rename_onto_directory_fails() {
        let store = InMemoryStore::new();
        store.create_dir_all(p("/a")).unwrap();
        store.create_dir_all(p("/b")).unwrap();
        store.write(p("/a/f"), b"").unwrap();
        let err = store.rename(p("/a/f"), p("/b")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn backup_flag_round_trips() {
        let store = InMemoryStore::new();
        store.create_dir_all(p("/d")).unwrap();
        assert!(!store.is_excluded_from_backup(p("/d")).unwrap());
        store.set_excluded_from_backup(p("/d"), true).unwrap();
        assert!(store.is_excluded_from_backup(p("/d")).unwrap());
        store.set_excluded_from_backup(p("/d"), false).unwrap();
        assert!(!store.is_excluded_from_backup(p("/d")).unwrap());
    }
}
