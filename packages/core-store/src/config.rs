//! Store configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::location::{DirectoryLocator, Locator, PlatformLocator};

pub const DEFAULT_APP_ID: &str = "stowage";
pub const DEFAULT_JPEG_QUALITY: u8 = 100;

/// What saving onto an occupied path does.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverwritePolicy {
    /// Remove what is there first. Collections are replaced, never merged.
    #[default]
    Replace,
    /// Fail with [`Error::AlreadyExists`].
    Reject,
}

/// Configuration for a store.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```rust
/// use stowage_core_store::{OverwritePolicy, StoreConfig};
///
/// let config = StoreConfig::from_json_str(r#"{ "app_id": "notes", "overwrite": "reject" }"#).unwrap();
/// assert_eq!(config.app_id, "notes");
/// assert_eq!(config.overwrite, OverwritePolicy::Reject);
/// assert!(config.base_dir.is_none());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Names the per-application folder inside each platform directory.
    pub app_id: String,
    /// Keep every location under this directory instead of the platform's.
    pub base_dir: Option<PathBuf>,
    /// Shared container roots by app group identifier.
    pub shared_containers: BTreeMap<String, PathBuf>,
    pub overwrite: OverwritePolicy,
    /// Indent JSON records.
    pub pretty_json: bool,
    /// Quality used whenever an image is stored as JPEG, 1 to 100.
    pub jpeg_quality: u8,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            app_id: DEFAULT_APP_ID.to_string(),
            base_dir: None,
            shared_containers: BTreeMap::new(),
            overwrite: OverwritePolicy::default(),
            pretty_json: false,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl StoreConfig {
    pub fn new(app_id: impl Into<String>) -> Self {
        StoreConfig {
            app_id: app_id.into(),
            ..StoreConfig::default()
        }
    }

    /// A configuration keeping every location under `base_dir`.
    pub fn sandboxed(base_dir: impl Into<PathBuf>) -> Self {
        StoreConfig {
            base_dir: Some(base_dir.into()),
            ..StoreConfig::default()
        }
    }

    #[must_use]
    pub fn with_shared_container(mut self, group: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.shared_containers.insert(group.into(), path.into());
        self
    }

    #[must_use]
    pub fn with_overwrite(mut self, overwrite: OverwritePolicy) -> Self {
        self.overwrite = overwrite;
        self
    }

    #[must_use]
    pub fn with_pretty_json(mut self, pretty_json: bool) -> Self {
        self.pretty_json = pretty_json;
        self
    }

    #[must_use]
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: StoreConfig =
            serde_json::from_str(json).map_err(|e| Error::deserialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(Error::io("read", path))?;
        Self::from_json_str(&json).map_err(|e| e.at(path))
    }

    /// Check the fields a locator will rely on.
    pub fn validate(&self) -> Result<()> {
        if self.app_id.is_empty() || self.app_id == "." || self.app_id == ".." {
            return Err(Error::invalid_name(
                &self.app_id,
                "the application id must name a folder",
            ));
        }
        if self.app_id.contains(['/', '\\', ':']) {
            return Err(Error::invalid_name(
                &self.app_id,
                "the application id must be a single path segment",
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(Error::deserialization(format!(
                "jpeg_quality must be between 1 and 100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }

    /// The locator this configuration describes.
    pub fn locator(&self) -> Box<dyn Locator> {
        match &self.base_dir {
            Some(base) => Box::new(
                DirectoryLocator::new(base).with_shared_containers(self.shared_containers.clone()),
            ),
            None => Box::new(
                PlatformLocator::new(&self.app_id)
                    .with_shared_containers(self.shared_containers.clone()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::StorageLocation;

    #[test]
    fn defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.app_id, DEFAULT_APP_ID);
        assert_eq!(config.overwrite, OverwritePolicy::Replace);
        assert_eq!(config.jpeg_quality, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_json_is_default() {
        assert_eq!(StoreConfig::from_json_str("{}").unwrap(), StoreConfig::default());
    }

    #[test]
    fn json_round_trip() {
        let config = StoreConfig::sandboxed("/srv/app")
            .with_shared_container("group.app", "shared")
            .with_overwrite(OverwritePolicy::Reject)
            .with_pretty_json(true);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(StoreConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn bad_app_ids_are_rejected() {
        for app_id in ["", "..", "a/b", "c:d"] {
            let config = StoreConfig::new(app_id);
            assert!(
                matches!(config.validate(), Err(Error::InvalidName { .. })),
                "{app_id:?} should be rejected"
            );
        }
    }

    #[test]
    fn out_of_range_quality_is_rejected() {
        assert!(StoreConfig::from_json_str(r#"{ "jpeg_quality": 0 }"#).is_err());
        assert_eq!(StoreConfig::new("x").with_jpeg_quality(0).jpeg_quality, 1);
        assert_eq!(StoreConfig::new("x").with_jpeg_quality(200).jpeg_quality, 100);
    }

    #[test]
    fn malformed_json_is_a_deserialization_error() {
        assert!(matches!(
            StoreConfig::from_json_str("{ not json"),
            Err(Error::Deserialization { .. })
        ));
    }

    #[test]
    fn from_json_file_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("stowage.json");
        std::fs::write(&file, r#"{ "app_id": "notes" }"#).unwrap();
        assert_eq!(StoreConfig::from_json_file(&file).unwrap().app_id, "notes");
        assert!(matches!(
            StoreConfig::from_json_file(&dir.path().join("missing.json")),
            Err(Error::Io { .. })
        ));
    }

    #[test]
    fn sandboxed_config_uses_base_dir() {
        let config = StoreConfig::sandboxed("/srv/app");
        let root = config.locator().root(&StorageLocation::Caches).unwrap();
        assert_eq!(root, PathBuf::from("/srv/app/caches"));
    }
}
