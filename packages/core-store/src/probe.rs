//! Existence probing.
//!
//! Every lookup goes to the byte store. Nothing is cached, so an answer is
//! never stale, at the price of a `kind` call per candidate.

use std::path::{Path, PathBuf};

use stowage_ll_store::{ByteStore, EntryKind};

use crate::error::{Error, Result};
use crate::path::ValidPath;

/// What a probe found, and where.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Found {
    File(PathBuf),
    Directory(PathBuf),
}

impl Found {
    pub fn path(&self) -> &Path {
        match self {
            Found::File(path) | Found::Directory(path) => path,
        }
    }

    pub fn into_path(self) -> PathBuf {
        match self {
            Found::File(path) | Found::Directory(path) => path,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Found::Directory(_))
    }
}

/// One candidate shape for a bare name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileExtension {
    /// The name as given, as a file.
    None,
    Json,
    Png,
    Jpg,
    /// The name as given, as a directory.
    Directory,
}

impl FileExtension {
    /// Every candidate, in probing order.
    pub const ALL: [FileExtension; 5] = [
        FileExtension::None,
        FileExtension::Json,
        FileExtension::Png,
        FileExtension::Jpg,
        FileExtension::Directory,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            FileExtension::None | FileExtension::Directory => "",
            FileExtension::Json => ".json",
            FileExtension::Png => ".png",
            FileExtension::Jpg => ".jpg",
        }
    }

    fn accepts(self, kind: EntryKind) -> bool {
        match self {
            FileExtension::Directory => kind.is_dir(),
            _ => kind.is_file(),
        }
    }
}

/// How many candidates may match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Uniqueness {
    /// Take the first match in probing order.
    #[default]
    First,
    /// More than one match is an [`Error::AmbiguousMatch`].
    Exactly,
}

fn kind_at<S: ByteStore + ?Sized>(store: &S, path: &Path) -> Result<Option<EntryKind>> {
    store.kind(path).map_err(Error::io("inspect", path))
}

/// Find the single concrete entry `path` names under `root`.
///
/// A directory hint on `path` only accepts a directory.
pub fn find<S: ByteStore + ?Sized>(store: &S, root: &Path, path: &ValidPath) -> Result<Found> {
    let concrete = path.resolve_onto(root);
    let found = match kind_at(store, &concrete)? {
        Some(EntryKind::Directory) => Some(Found::Directory(concrete.clone())),
        Some(EntryKind::File) if !path.is_directory() => Some(Found::File(concrete.clone())),
        Some(EntryKind::File) => {
            log::trace!(
                "{} is a file but a directory was asked for",
                concrete.display()
            );
            None
        }
        None => None,
    };

    log::trace!("Probed {}: {:?}", concrete.display(), found);
    found.ok_or(Error::NotFound { path: concrete })
}

/// Look `name` up under each candidate shape in `extensions`.
///
/// A directory hint on `name` restricts the search to directories.
pub fn find_candidates<S: ByteStore + ?Sized>(
    store: &S,
    root: &Path,
    name: &ValidPath,
    extensions: &[FileExtension],
    uniqueness: Uniqueness,
) -> Result<Found> {
    let mut matches = Vec::new();
    for &extension in extensions {
        if name.is_directory() && extension != FileExtension::Directory {
            continue;
        }

        let candidate = name.with_suffix(extension.suffix()).resolve_onto(root);
        match kind_at(store, &candidate)? {
            Some(kind) if extension.accepts(kind) => {
                log::trace!("Candidate {} matches", candidate.display());
                let found = match kind {
                    EntryKind::Directory => Found::Directory(candidate),
                    EntryKind::File => Found::File(candidate),
                };
                if uniqueness == Uniqueness::First {
                    return Ok(found);
                }
                matches.push(found);
            }
            _ => log::trace!("Candidate {} does not match", candidate.display()),
        }
    }

    if matches.len() > 1 {
        return Err(Error::AmbiguousMatch {
            name: name.to_string(),
            candidates: matches.into_iter().map(Found::into_path).collect(),
        });
    }
    matches.pop().ok_or_else(|| Error::NotFound {
        path: name.resolve_onto(root),
    })
}

/// Whether [`find`] would succeed. Never fails.
pub fn exists<S: ByteStore + ?Sized>(store: &S, root: &Path, path: &ValidPath) -> bool {
    find(store, root, path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stowage_ll_store::InMemoryStore;

    fn vp(raw: &str) -> ValidPath {
        ValidPath::sanitize(raw).unwrap()
    }

    fn store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.create_dir_all(Path::new("/root/album")).unwrap();
        store.write(Path::new("/root/notes.json"), b"{}").unwrap();
        store.write(Path::new("/root/album/0.png"), b"").unwrap();
        store
    }

    #[test]
    fn find_file_and_directory() {
        let store = store();
        let root = Path::new("/root");
        assert_eq!(
            find(&store, root, &vp("notes.json")).unwrap(),
            Found::File(PathBuf::from("/root/notes.json"))
        );
        assert_eq!(
            find(&store, root, &vp("album")).unwrap(),
            Found::Directory(PathBuf::from("/root/album"))
        );
        assert!(find(&store, root, &vp("album/")).unwrap().is_dir());
    }

    #[test]
    fn directory_hint_rejects_files() {
        let store = store();
        let err = find(&store, Path::new("/root"), &vp("notes.json/")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn missing_is_not_found_with_concrete_path() {
        let store = store();
        match find(&store, Path::new("/root"), &vp("missing.json")) {
            Err(Error::NotFound { path }) => assert_eq!(path, PathBuf::from("/root/missing.json")),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!exists(&store, Path::new("/root"), &vp("missing.json")));
        assert!(exists(&store, Path::new("/root"), &vp("notes.json")));
    }

    #[test]
    fn candidates_by_bare_name() {
        let store = store();
        let found = find_candidates(
            &store,
            Path::new("/root"),
            &vp("notes"),
            &FileExtension::ALL,
            Uniqueness::Exactly,
        )
        .unwrap();
        assert_eq!(found, Found::File(PathBuf::from("/root/notes.json")));
    }

    #[test]
    fn ambiguous_candidates() {
        let store = store();
        store.write(Path::new("/root/album.png"), b"").unwrap();
        let root = Path::new("/root");

        match find_candidates(&store, root, &vp("album"), &FileExtension::ALL, Uniqueness::Exactly) {
            Err(Error::AmbiguousMatch { name, candidates }) => {
                assert_eq!(name, "album");
                assert_eq!(
                    candidates,
                    vec![PathBuf::from("/root/album.png"), PathBuf::from("/root/album")]
                );
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let first =
            find_candidates(&store, root, &vp("album"), &FileExtension::ALL, Uniqueness::First)
                .unwrap();
        assert_eq!(first, Found::File(PathBuf::from("/root/album.png")));

        let folder =
            find_candidates(&store, root, &vp("album/"), &FileExtension::ALL, Uniqueness::Exactly)
                .unwrap();
        assert_eq!(folder, Found::Directory(PathBuf::from("/root/album")));
    }

    #[test]
    fn no_candidates_is_not_found() {
        let store = store();
        let err = find_candidates(
            &store,
            Path::new("/root"),
            &vp("nothing"),
            &FileExtension::ALL,
            Uniqueness::Exactly,
        )
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn extension_candidates_ignore_directories() {
        let store = store();
        store.create_dir_all(Path::new("/root/odd.json")).unwrap();
        let err = find_candidates(
            &store,
            Path::new("/root"),
            &vp("odd"),
            &[FileExtension::Json],
            Uniqueness::First,
        )
        .unwrap_err();
        assert!(err.is_not_found());
    }
}
