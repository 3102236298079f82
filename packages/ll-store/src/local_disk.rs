use std::{fs, io, path};

use bytes::Bytes;

use crate::traits::{ByteStore, EntryKind};

/// Extended attribute carrying the backup-exclusion flag.
#[cfg(target_os = "macos")]
const BACKUP_EXCLUSION_ATTRIBUTE: &str = "com.apple.metadata:com_apple_backup_excludeItem";
#[cfg(target_os = "macos")]
const BACKUP_EXCLUSION_VALUE: &[u8] = b"com.apple.backupd";

// https://www.freedesktop.org/wiki/CommonExtendedAttributes/
#[cfg(all(unix, not(target_os = "macos")))]
const BACKUP_EXCLUSION_ATTRIBUTE: &str = "user.xdg.robots.backup";
#[cfg(all(unix, not(target_os = "macos")))]
const BACKUP_EXCLUSION_VALUE: &[u8] = b"false";

/// A byte store backed by the local filesystem.
///
/// Paths are used exactly as given; callers are expected to hand in absolute,
/// already-resolved paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalDiskStore;

impl LocalDiskStore {
    pub fn new() -> Self {
        LocalDiskStore
    }

    fn is_cross_device(error: &io::Error) -> bool {
        error.kind() == io::ErrorKind::CrossesDevices
    }

    /// Copy `from` to `to` entry by entry, then delete `from`.
    ///
    /// Only used when a rename crosses filesystems. Not atomic.
    fn copy_then_remove(from: &path::Path, to: &path::Path) -> io::Result<()> {
        log::debug!(
            "Copying {} to {} across devices...",
            from.display(),
            to.display()
        );

        if fs::symlink_metadata(from)?.is_file() {
            fs::copy(from, to)?;
            return fs::remove_file(from);
        }

        for entry in walkdir::WalkDir::new(from) {
            let entry = entry.map_err(io::Error::other)?;
            let relative = entry
                .path()
                .strip_prefix(from)
                .map_err(io::Error::other)?;
            let destination = to.join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&destination)?;
            } else {
                fs::copy(entry.path(), &destination)?;
            }
        }
        fs::remove_dir_all(from)
    }
}

impl ByteStore for LocalDiskStore {
    fn write(&self, path: &path::Path, bytes: &[u8]) -> io::Result<()> {
        use io::Write;

        log::debug!("Writing {}...", path.display());
        let mut f = fs::File::create(path)?;
        f.write_all(bytes)?;
        f.flush()
    }

    fn read(&self, path: &path::Path) -> io::Result<Bytes> {
        log::debug!("Reading {}...", path.display());
        fs::read(path).map(Bytes::from)
    }

    fn remove(&self, path: &path::Path) -> io::Result<()> {
        log::debug!("Removing {}...", path.display());
        if fs::symlink_metadata(path)?.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        }
    }

    fn list(&self, path: &path::Path) -> io::Result<Vec<path::PathBuf>> {
        fs::read_dir(path)?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect()
    }

    fn create_dir(&self, path: &path::Path) -> io::Result<()> {
        fs::create_dir(path)
    }

    fn create_dir_all(&self, path: &path::Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn rename(&self, from: &path::Path, to: &path::Path) -> io::Result<()> {
        log::debug!("Moving {} to {}...", from.display(), to.display());
        match fs::rename(from, to) {
            Err(error) if Self::is_cross_device(&error) => Self::copy_then_remove(from, to),
            result => result,
        }
    }

    fn kind(&self, path: &path::Path) -> io::Result<Option<EntryKind>> {
        match fs::metadata(path) {
            Ok(attr) if attr.is_dir() => Ok(Some(EntryKind::Directory)),
            Ok(_) => Ok(Some(EntryKind::File)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error),
        }
    }

    #[cfg(unix)]
    fn set_excluded_from_backup(&self, path: &path::Path, excluded: bool) -> io::Result<()> {
        log::debug!(
            "Setting backup exclusion of {} to {}...",
            path.display(),
            excluded
        );
        if excluded {
            xattr::set(path, BACKUP_EXCLUSION_ATTRIBUTE, BACKUP_EXCLUSION_VALUE)
        } else if xattr::get(path, BACKUP_EXCLUSION_ATTRIBUTE)?.is_some() {
            xattr::remove(path, BACKUP_EXCLUSION_ATTRIBUTE)
        } else {
            Ok(())
        }
    }

    #[cfg(unix)]
    fn is_excluded_from_backup(&self, path: &path::Path) -> io::Result<bool> {
        Ok(xattr::get(path, BACKUP_EXCLUSION_ATTRIBUTE)?.as_deref() == Some(BACKUP_EXCLUSION_VALUE))
    }

    #[cfg(not(unix))]
    fn set_excluded_from_backup(&self, _path: &path::Path, _excluded: bool) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "backup exclusion attributes are not supported on this platform",
        ))
    }

    #[cfg(not(unix))]
    fn is_excluded_from_backup(&self, _path: &path::Path) -> io::Result<bool> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "backup exclusion attributes are not supported on this platform",
        ))
    }

    fn descendants(&self, path: &path::Path) -> io::Result<Vec<path::PathBuf>> {
        walkdir::WalkDir::new(path)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .map(|entry| {
                entry
                    .map(|entry| entry.into_path())
                    .map_err(io::Error::other)
            })
            .collect()
    }
}
