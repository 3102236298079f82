//! Core stowage: names, places and failures
//!
//! This layer turns what a caller says into something the byte store can act
//! on:
//! - `ValidPath`: a caller-supplied logical path, sanitized into safe segments
//! - `StorageLocation`: one of the fixed roots values live under
//! - `Locator`: finds the concrete root directory of each location
//! - `probe`: finds what a logical path names, file or directory
//! - `Error`: the closed set of ways any of this can fail
//!
//! Nothing here reads or writes values; see `stowage-serde-store` for codecs
//! and the `stowage` crate for the persistence protocol.
//!
//! # Example
//!
//! ```rust
//! use stowage_core_store::{resolve, DirectoryLocator, StorageLocation, ValidPath};
//!
//! let locator = DirectoryLocator::new("/srv/app");
//! let path: ValidPath = "//notes/today.json".parse().unwrap();
//! let concrete = resolve(&locator, &StorageLocation::Documents, Some(&path)).unwrap();
//! assert_eq!(concrete, std::path::Path::new("/srv/app/documents/notes/today.json"));
//! ```

mod config;
mod error;
mod location;
mod path;
pub mod probe;

pub use config::{OverwritePolicy, StoreConfig, DEFAULT_APP_ID, DEFAULT_JPEG_QUALITY};
pub use error::{Error, Result};
pub use location::{resolve, DirectoryLocator, Locator, PlatformLocator, StorageLocation};
pub use path::ValidPath;
pub use probe::{FileExtension, Found, Uniqueness};

// Re-export LL types for convenience
pub use stowage_ll_store::{ByteStore, Bytes, EntryKind, InMemoryStore, LocalDiskStore};
