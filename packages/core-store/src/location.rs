//! Storage locations and their resolution to root directories.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::path::ValidPath;

/// One of the fixed places values can be stored.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StorageLocation {
    /// Durable user data that cannot be recreated.
    Documents,
    /// Data that can be downloaded again or regenerated; may be reclaimed.
    Caches,
    /// Support files the application needs between launches.
    ApplicationSupport,
    /// Scratch space.
    Temporary,
    /// A container shared between processes of one application group.
    SharedContainer(String),
}

impl StorageLocation {
    /// Short directory name used when all locations live under one base.
    fn directory_name(&self) -> &'static str {
        match self {
            StorageLocation::Documents => "documents",
            StorageLocation::Caches => "caches",
            StorageLocation::ApplicationSupport => "application-support",
            StorageLocation::Temporary => "tmp",
            StorageLocation::SharedContainer(_) => "shared",
        }
    }
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageLocation::Documents => write!(f, "Documents Directory"),
            StorageLocation::Caches => write!(f, "Caches Directory"),
            StorageLocation::ApplicationSupport => write!(f, "Application Support Directory"),
            StorageLocation::Temporary => write!(f, "Temporary Directory"),
            StorageLocation::SharedContainer(group) => write!(f, "Shared Container ({})", group),
        }
    }
}

/// Finds the root directory of each [`StorageLocation`].
///
/// Roots are looked up on every call, never cached: they may depend on
/// process or platform state.
pub trait Locator: Send + Sync {
    /// The absolute root directory for `location`.
    fn root(&self, location: &StorageLocation) -> Result<PathBuf>;
}

impl<T: Locator + ?Sized> Locator for Box<T> {
    fn root(&self, location: &StorageLocation) -> Result<PathBuf> {
        self.as_ref().root(location)
    }
}

/// Resolve `location` and join `path` onto its root.
///
/// With no `path` the bare root is returned.
pub fn resolve(
    locator: &dyn Locator,
    location: &StorageLocation,
    path: Option<&ValidPath>,
) -> Result<PathBuf> {
    let root = locator.root(location)?;
    Ok(match path {
        Some(path) => path.resolve_onto(&root),
        None => root,
    })
}

fn absolute(location: &StorageLocation, path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|error| Error::LocationUnavailable {
        location: location.clone(),
        reason: format!("{} cannot be made absolute: {}", path.display(), error),
    })
}

fn unavailable(location: &StorageLocation, reason: impl Into<String>) -> Error {
    Error::LocationUnavailable {
        location: location.clone(),
        reason: reason.into(),
    }
}

#[cfg(target_os = "macos")]
fn platform_group_container(group: &str) -> Option<PathBuf> {
    let container = dirs::home_dir()?
        .join("Library/Group Containers")
        .join(group);
    container.is_dir().then_some(container)
}

#[cfg(not(target_os = "macos"))]
fn platform_group_container(_group: &str) -> Option<PathBuf> {
    None
}

/// Roots from the platform's per-user directories, scoped by application id.
///
/// | Location | Root |
/// |---|---|
/// | `Documents` | `dirs::document_dir()/<app_id>` |
/// | `Caches` | `dirs::cache_dir()/<app_id>` |
/// | `ApplicationSupport` | `dirs::data_dir()/<app_id>` |
/// | `Temporary` | `std::env::temp_dir()/<app_id>` |
/// | `SharedContainer(g)` | configured mapping, else `~/Library/Group Containers/<g>` on macOS |
#[derive(Clone, Debug)]
pub struct PlatformLocator {
    app_id: String,
    shared_containers: BTreeMap<String, PathBuf>,
}

impl PlatformLocator {
    pub fn new(app_id: impl Into<String>) -> Self {
        PlatformLocator {
            app_id: app_id.into(),
            shared_containers: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_shared_containers(mut self, containers: BTreeMap<String, PathBuf>) -> Self {
        self.shared_containers = containers;
        self
    }

    fn platform_dir(&self, location: &StorageLocation, dir: Option<PathBuf>) -> Result<PathBuf> {
        let dir = dir.ok_or_else(|| {
            unavailable(location, "the platform does not provide this directory")
        })?;
        absolute(location, &dir.join(&self.app_id))
    }

    fn shared_container(&self, location: &StorageLocation, group: &str) -> Result<PathBuf> {
        if let Some(path) = self.shared_containers.get(group) {
            return absolute(location, path);
        }

        if let Some(container) = platform_group_container(group) {
            return Ok(container);
        }

        Err(unavailable(
            location,
            format!("could not get access to shared container with app group named {group}"),
        ))
    }
}

impl Locator for PlatformLocator {
    fn root(&self, location: &StorageLocation) -> Result<PathBuf> {
        match location {
            StorageLocation::Documents => self.platform_dir(location, dirs::document_dir()),
            StorageLocation::Caches => self.platform_dir(location, dirs::cache_dir()),
            StorageLocation::ApplicationSupport => self.platform_dir(location, dirs::data_dir()),
            StorageLocation::Temporary => {
                absolute(location, &std::env::temp_dir().join(&self.app_id))
            }
            StorageLocation::SharedContainer(group) => self.shared_container(location, group),
        }
    }
}

/// Every location under one base directory.
///
/// Shared containers resolve only when registered; relative registrations
/// are taken relative to the base.
#[derive(Clone, Debug)]
pub struct DirectoryLocator {
    base: PathBuf,
    shared_containers: BTreeMap<String, PathBuf>,
}

impl DirectoryLocator {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        DirectoryLocator {
            base: base.into(),
            shared_containers: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_shared_containers(mut self, containers: BTreeMap<String, PathBuf>) -> Self {
        self.shared_containers = containers;
        self
    }

    #[must_use]
    pub fn with_shared_container(mut self, group: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.shared_containers.insert(group.into(), path.into());
        self
    }

    pub fn base(&self) -> &Path {
        &self.base
    }
}

impl Locator for DirectoryLocator {
    fn root(&self, location: &StorageLocation) -> Result<PathBuf> {
        let root = match location {
            StorageLocation::SharedContainer(group) => {
                let registered = self.shared_containers.get(group).ok_or_else(|| {
                    unavailable(
                        location,
                        format!("no shared container is registered for app group {group}"),
                    )
                })?;
                self.base.join(location.directory_name()).join(registered)
            }
            _ => self.base.join(location.directory_name()),
        };
        absolute(location, &root)
    }
}
