//! The typed persistence protocol.

use std::path::{Path, PathBuf};

use stowage_core_store::probe::{self, FileExtension, Found, Uniqueness};
use stowage_core_store::{
    resolve, ByteStore, Bytes, EntryKind, Error, LocalDiskStore, Locator, OverwritePolicy, Result,
    StorageLocation, StoreConfig, ValidPath,
};
use stowage_serde_store::{
    append_records, Appendable, Codecs, Element, Encoded, Member, Persistable, Retrievable,
    Stored, ValueKind,
};

use crate::members;

/// Saves and retrieves typed values under sanitized names in storage
/// locations.
///
/// `Disk` keeps no state besides its collaborators: every call sanitizes,
/// resolves and probes again, so answers are never stale.
///
/// How a value is laid out depends on its kind. Records ([`Json`]), blobs and
/// single images are one file at the path. Blob and image collections are a
/// directory at the path with members `0`, `1`, `2`, … (`0.png`, `1.jpg` for
/// images).
///
/// # Example
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use stowage::{Disk, Json, StorageLocation, StoreConfig};
///
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct Message {
///     body: String,
/// }
///
/// let dir = tempfile::tempdir().unwrap();
/// let disk = Disk::new(StoreConfig::sandboxed(dir.path())).unwrap();
///
/// let hello = Json(Message { body: "hello".to_string() });
/// disk.save(&hello, &StorageLocation::Documents, "messages/first.json").unwrap();
///
/// let back: Json<Message> = disk.retrieve("messages/first.json", &StorageLocation::Documents).unwrap();
/// assert_eq!(back, hello);
/// ```
///
/// [`Json`]: stowage_serde_store::Json
pub struct Disk<S: ByteStore = LocalDiskStore> {
    store: S,
    locator: Box<dyn Locator>,
    codecs: Codecs,
    overwrite: OverwritePolicy,
}

impl Disk {
    /// A disk on the local filesystem, set up as `config` says.
    pub fn new(config: StoreConfig) -> Result<Self> {
        Disk::with_store(LocalDiskStore::new(), config)
    }
}

impl<S: ByteStore> Disk<S> {
    /// A disk over any byte store.
    pub fn with_store(store: S, config: StoreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Disk {
            store,
            locator: config.locator(),
            codecs: Codecs::from_config(&config),
            overwrite: config.overwrite,
        })
    }

    #[must_use]
    pub fn with_locator(mut self, locator: impl Locator + 'static) -> Self {
        self.locator = Box::new(locator);
        self
    }

    #[must_use]
    pub fn with_codecs(mut self, codecs: Codecs) -> Self {
        self.codecs = codecs;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn overwrite_policy(&self) -> OverwritePolicy {
        self.overwrite
    }

    /// The root directory of `location`.
    pub fn root(&self, location: &StorageLocation) -> Result<PathBuf> {
        self.locator.root(location)
    }

    /// The concrete path `path` maps to in `location`. Nothing needs to exist
    /// there.
    pub fn resolved_path(&self, path: &str, location: &StorageLocation) -> Result<PathBuf> {
        let path = ValidPath::sanitize(path)?;
        resolve(self.locator.as_ref(), location, Some(&path))
    }

    /// Store `value` at `path`, creating missing parent directories.
    ///
    /// The whole value is encoded before anything is written. What happens
    /// when something is already stored there depends on the overwrite
    /// policy.
    pub fn save<V: Persistable + ?Sized>(
        &self,
        value: &V,
        location: &StorageLocation,
        path: &str,
    ) -> Result<()> {
        let path = ValidPath::sanitize(path)?;
        let target = resolve(self.locator.as_ref(), location, Some(&path))?;
        log::debug!("Saving {} to {}...", V::KIND.name(), target.display());

        let existing = self.kind_at(&target)?;
        if V::KIND.is_collection() {
            if existing == Some(EntryKind::File) {
                return Err(Error::invalid_operation(
                    &target,
                    format!("a {} is a directory, but a file is in the way", V::KIND.name()),
                ));
            }
        } else {
            if path.is_directory() {
                return Err(Error::invalid_operation(
                    &target,
                    format!(
                        "a {} is stored as a single file, so its path cannot end with '/'",
                        V::KIND.name()
                    ),
                ));
            }
            if existing == Some(EntryKind::Directory) {
                return Err(Error::invalid_operation(
                    &target,
                    format!("a {} is a single file, but a directory is in the way", V::KIND.name()),
                ));
            }
        }

        let encoded = value.encode(&self.codecs, &path)?;
        if existing.is_some() {
            self.make_room(&target)?;
        }
        self.create_parent(&target)?;

        match encoded {
            Encoded::File(bytes) => self
                .store
                .write(&target, &bytes)
                .map_err(Error::io("write", &target)),
            Encoded::Members(members) => {
                self.store
                    .create_dir(&target)
                    .map_err(Error::io("create directory", &target))?;
                self.write_members(&target, &members, 0).inspect_err(|_| {
                    if let Err(cleanup) = self.store.remove(&target) {
                        log::warn!(
                            "Could not clean up partially written {}: {}",
                            target.display(),
                            cleanup
                        );
                    }
                })
            }
        }
    }

    /// Read back the value stored at `path`.
    pub fn retrieve<V: Retrievable>(&self, path: &str, location: &StorageLocation) -> Result<V> {
        let path = ValidPath::sanitize(path)?;
        let root = self.root(location)?;
        let found = probe::find(&self.store, &root, &path)?;
        log::debug!("Retrieving {} from {}...", V::KIND.name(), found.path().display());

        let stored = match (V::KIND.is_collection(), found) {
            (false, Found::File(file)) => Stored::File(
                self.store
                    .read(&file)
                    .map_err(Error::io("read", &file))?,
            ),
            (true, Found::Directory(dir)) => Stored::Members(self.read_members(&dir)?),
            (true, Found::File(file)) => {
                return Err(Error::invalid_operation(
                    file,
                    format!("a {} is a directory, but a file is stored here", V::KIND.name()),
                ))
            }
            (false, Found::Directory(dir)) => {
                return Err(Error::invalid_operation(
                    dir,
                    format!("a {} is a single file, but a directory is stored here", V::KIND.name()),
                ))
            }
        };

        V::decode(stored, &self.codecs).map_err(|e| e.at(&path.resolve_onto(&root)))
    }

    /// Append one element to what is stored at `path`.
    ///
    /// Records join the record file as an array; a single stored record
    /// becomes the first element. Blobs and images join a collection
    /// directory after its highest-numbered member. With nothing stored yet
    /// this is a save of a one-element collection.
    pub fn append<E: Appendable + ?Sized>(
        &self,
        element: &E,
        path: &str,
        location: &StorageLocation,
    ) -> Result<()> {
        let element = element.element(&self.codecs)?;
        self.append_elements(E::KIND, vec![element], path, location)
    }

    /// Append several elements at once, in order.
    pub fn append_all<E: Appendable>(
        &self,
        elements: &[E],
        path: &str,
        location: &StorageLocation,
    ) -> Result<()> {
        let elements = elements
            .iter()
            .enumerate()
            .map(|(i, element)| element.element(&self.codecs).map_err(|e| e.at_index(i)))
            .collect::<Result<Vec<_>>>()?;
        self.append_elements(E::KIND, elements, path, location)
    }

    fn append_elements(
        &self,
        kind: ValueKind,
        elements: Vec<Element>,
        path: &str,
        location: &StorageLocation,
    ) -> Result<()> {
        let path = ValidPath::sanitize(path)?;
        let target = resolve(self.locator.as_ref(), location, Some(&path))?;
        log::debug!(
            "Appending {} element(s) to {} at {}...",
            elements.len(),
            kind.name(),
            target.display()
        );

        let mut records = Vec::new();
        let mut new_members = Vec::new();
        for element in elements {
            match element {
                Element::Record(record) => records.push(record),
                Element::Member(member) => new_members.push(member),
            }
        }

        if kind == ValueKind::Record {
            self.append_to_record(&path, &target, records)
        } else {
            self.append_members(&target, &new_members)
        }
    }

    fn append_to_record(
        &self,
        path: &ValidPath,
        target: &Path,
        records: Vec<serde_json::Value>,
    ) -> Result<()> {
        if path.is_directory() {
            return Err(Error::invalid_operation(
                target,
                "records are single files, so a record path cannot end with '/'",
            ));
        }

        let existing = match self.kind_at(target)? {
            None => None,
            Some(EntryKind::Directory) => {
                return Err(Error::invalid_operation(
                    target,
                    "records cannot be appended to a blob or image collection",
                ))
            }
            Some(EntryKind::File) => {
                let bytes = self
                    .store
                    .read(target)
                    .map_err(Error::io("read", target))?;
                Some(self.codecs.records.decode(&bytes).map_err(|e| e.at(target))?)
            }
        };

        let combined = append_records(existing, records);
        let bytes = self.codecs.records.encode(&combined)?;
        self.create_parent(target)?;
        self.store
            .write(target, &bytes)
            .map_err(Error::io("write", target))
    }

    fn append_members(&self, target: &Path, new_members: &[Member]) -> Result<()> {
        let first = match self.kind_at(target)? {
            Some(EntryKind::File) => {
                return Err(Error::invalid_operation(
                    target,
                    "blobs and images can only be appended to a collection directory",
                ))
            }
            Some(EntryKind::Directory) => {
                let existing = self
                    .store
                    .list(target)
                    .map_err(Error::io("list", target))?;
                members::next_index(&existing)
                    .filter(|first| first.checked_add(new_members.len() as u64).is_some())
                    .ok_or_else(|| {
                        Error::invalid_operation(target, "no member index is left to append with")
                    })?
            }
            None => {
                self.create_parent(target)?;
                self.store
                    .create_dir(target)
                    .map_err(Error::io("create directory", target))?;
                0
            }
        };
        self.write_members(target, new_members, first)
    }

    /// Delete what `path` names, recursively for directories.
    pub fn remove(&self, path: &str, location: &StorageLocation) -> Result<()> {
        let path = ValidPath::sanitize(path)?;
        let root = self.root(location)?;
        let found = probe::find(&self.store, &root, &path)?;
        log::debug!("Removing {}...", found.path().display());
        self.store
            .remove(found.path())
            .map_err(Error::io("remove", found.path()))
    }

    /// Delete everything in `location`, keeping its root directory.
    pub fn clear(&self, location: &StorageLocation) -> Result<()> {
        let root = self.root(location)?;
        if self.kind_at(&root)?.is_none() {
            log::trace!("{} does not exist, nothing to clear", root.display());
            return Ok(());
        }

        log::debug!("Clearing {}...", root.display());
        let children = self.store.list(&root).map_err(Error::io("list", &root))?;
        for child in children {
            self.store
                .remove(&child)
                .map_err(Error::io("remove", &child))?;
        }
        Ok(())
    }

    /// Whether anything is stored at `path`. Never fails: invalid names and
    /// unavailable locations count as absent.
    pub fn exists(&self, path: &str, location: &StorageLocation) -> bool {
        let Ok(path) = ValidPath::sanitize(path) else {
            return false;
        };
        match self.root(location) {
            Ok(root) => probe::exists(&self.store, &root, &path),
            Err(_) => false,
        }
    }

    /// Move what `path` names from one location to the same path in another.
    pub fn move_to(
        &self,
        path: &str,
        from: &StorageLocation,
        to: &StorageLocation,
    ) -> Result<()> {
        let path = ValidPath::sanitize(path)?;
        let source = probe::find(&self.store, &self.root(from)?, &path)?;
        let destination = resolve(self.locator.as_ref(), to, Some(&path))?;
        self.relocate(source.path(), &destination)
    }

    /// Give what `path` names a new name in the same location.
    ///
    /// Only the last segment changes unless `new_name` has several segments,
    /// in which case it is the whole new path.
    pub fn rename(&self, path: &str, location: &StorageLocation, new_name: &str) -> Result<()> {
        let path = ValidPath::sanitize(path)?;
        let root = self.root(location)?;
        let source = probe::find(&self.store, &root, &path)?;
        let destination = path.with_file_name(new_name)?.resolve_onto(&root);
        self.relocate(source.path(), &destination)
    }

    fn relocate(&self, source: &Path, destination: &Path) -> Result<()> {
        if source == destination {
            return Ok(());
        }
        if source.starts_with(destination) || destination.starts_with(source) {
            return Err(Error::invalid_operation(
                destination,
                format!("cannot move {} into or onto itself", source.display()),
            ));
        }
        if self.kind_at(destination)?.is_some() {
            self.make_room(destination)?;
        }
        self.create_parent(destination)?;
        self.store
            .rename(source, destination)
            .map_err(Error::io("move", source))
    }

    /// Set or clear the "do not back up" flag of what `path` names.
    ///
    /// For a directory the flag is set on it and on everything below it.
    pub fn set_excluded_from_backup(
        &self,
        path: &str,
        location: &StorageLocation,
        excluded: bool,
    ) -> Result<()> {
        let path = ValidPath::sanitize(path)?;
        let found = probe::find(&self.store, &self.root(location)?, &path)?;

        let mut targets = vec![found.path().to_path_buf()];
        if found.is_dir() {
            targets.extend(
                self.store
                    .descendants(found.path())
                    .map_err(Error::io("list", found.path()))?,
            );
        }
        for target in targets {
            self.store
                .set_excluded_from_backup(&target, excluded)
                .map_err(Error::io("set the backup flag of", &target))?;
        }
        Ok(())
    }

    pub fn do_not_backup(&self, path: &str, location: &StorageLocation) -> Result<()> {
        self.set_excluded_from_backup(path, location, true)
    }

    pub fn backup(&self, path: &str, location: &StorageLocation) -> Result<()> {
        self.set_excluded_from_backup(path, location, false)
    }

    pub fn is_excluded_from_backup(&self, path: &str, location: &StorageLocation) -> Result<bool> {
        let path = ValidPath::sanitize(path)?;
        let found = probe::find(&self.store, &self.root(location)?, &path)?;
        self.store
            .is_excluded_from_backup(found.path())
            .map_err(Error::io("read the backup flag of", found.path()))
    }

    /// Find a stored item by bare name, trying `.json`, `.png`, `.jpg` and a
    /// directory in turn. More than one match is an error.
    pub fn locate(&self, name: &str, location: &StorageLocation) -> Result<PathBuf> {
        let name = ValidPath::sanitize(name)?;
        let root = self.root(location)?;
        probe::find_candidates(
            &self.store,
            &root,
            &name,
            &FileExtension::ALL,
            Uniqueness::Exactly,
        )
        .map(Found::into_path)
    }

    fn kind_at(&self, path: &Path) -> Result<Option<EntryKind>> {
        self.store.kind(path).map_err(Error::io("inspect", path))
    }

    fn make_room(&self, target: &Path) -> Result<()> {
        match self.overwrite {
            OverwritePolicy::Replace => {
                log::debug!("Replacing {}...", target.display());
                self.store
                    .remove(target)
                    .map_err(Error::io("remove", target))
            }
            OverwritePolicy::Reject => Err(Error::AlreadyExists {
                path: target.to_path_buf(),
            }),
        }
    }

    fn create_parent(&self, target: &Path) -> Result<()> {
        match target.parent() {
            Some(parent) => self
                .store
                .create_dir_all(parent)
                .map_err(Error::io("create directory", parent)),
            None => Ok(()),
        }
    }

    fn write_members(&self, dir: &Path, new_members: &[Member], first: u64) -> Result<()> {
        for (index, member) in (first..=u64::MAX).zip(new_members) {
            let file = dir.join(member.file_name(index));
            self.store
                .write(&file, &member.bytes)
                .map_err(Error::io("write", &file))?;
        }
        Ok(())
    }

    fn read_members(&self, dir: &Path) -> Result<Vec<Bytes>> {
        let mut files = Vec::new();
        for child in self.store.list(dir).map_err(Error::io("list", dir))? {
            if self.kind_at(&child)? == Some(EntryKind::File) {
                files.push(child);
            }
        }
        members::sort_members(&mut files);

        files
            .iter()
            .map(|file| {
                let is_member = file
                    .file_name()
                    .and_then(|name| name.to_str())
                    .and_then(members::member_index)
                    .is_some();
                if !is_member {
                    log::warn!("{} is not a numbered member file", file.display());
                }
                self.store.read(file).map_err(Error::io("read", file))
            })
            .collect()
    }
}
