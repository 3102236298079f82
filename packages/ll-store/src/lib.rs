//! Low-level byte storage for stowage.
//!
//! This is the narrow waist of the stowage stack. Everything at this level is
//! pure bytes at concrete paths - no name sanitizing, no storage locations, no
//! format interpretation.
//!
//! Two stores ship with the crate:
//! - [`LocalDiskStore`]: the local filesystem, with the backup-exclusion flag
//!   kept in an extended attribute.
//! - [`InMemoryStore`]: a map-backed tree for tests and scratch use.
//!
//! # Example
//!
//! ```rust
//! use std::path::Path;
//! use stowage_ll_store::{ByteStore, EntryKind, InMemoryStore};
//!
//! fn is_collection(store: &dyn ByteStore, path: &Path) -> bool {
//!     matches!(store.kind(path), Ok(Some(EntryKind::Directory)))
//! }
//!
//! let store = InMemoryStore::new();
//! store.create_dir_all(Path::new("/album")).unwrap();
//! assert!(is_collection(&store, Path::new("/album")));
//! ```

pub use bytes::Bytes;

mod in_memory;
mod local_disk;
mod traits;

pub use in_memory::InMemoryStore;
pub use local_disk::LocalDiskStore;
pub use traits::{ByteStore, EntryKind};
