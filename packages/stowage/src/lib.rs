//! Stowage: typed values under human names in well-known places.
//!
//! Hand [`Disk`] a value, a [`StorageLocation`] and a name; it sanitizes the
//! name, finds the location's root directory, picks the codec for the value's
//! kind and writes the bytes. Retrieval, appending, moving, renaming and the
//! "do not back up" flag work the same way.
//!
//! The stack underneath is usable on its own:
//! - `stowage-ll-store`: bytes at concrete paths ([`ByteStore`])
//! - `stowage-core-store`: names, locations, probing and errors
//! - `stowage-serde-store`: codecs and value kinds
//!
//! # Example
//!
//! ```rust
//! use stowage::{Bytes, Disk, InMemoryStore, StorageLocation, StoreConfig};
//!
//! let disk = Disk::with_store(InMemoryStore::new(), StoreConfig::sandboxed("/sandbox")).unwrap();
//! let album = vec![Bytes::from_static(b"first"), Bytes::from_static(b"second")];
//!
//! disk.save(&album, &StorageLocation::Caches, "album").unwrap();
//! disk.append(&Bytes::from_static(b"third"), "album", &StorageLocation::Caches).unwrap();
//!
//! let back: Vec<Bytes> = disk.retrieve("album", &StorageLocation::Caches).unwrap();
//! assert_eq!(back.len(), 3);
//! assert!(disk.exists("album/2", &StorageLocation::Caches));
//! ```

mod disk;
mod members;

pub use disk::Disk;

pub use stowage_core_store::{
    probe, resolve, ByteStore, Bytes, DirectoryLocator, EntryKind, Error, FileExtension, Found,
    InMemoryStore, LocalDiskStore, Locator, OverwritePolicy, PlatformLocator, Result,
    StorageLocation, StoreConfig, Uniqueness, ValidPath,
};
pub use stowage_serde_store::{
    image, Appendable, Codecs, DynamicImage, Element, Encoded, ImageCodec, ImageFormat, Json,
    JsonCodec, Member, Persistable, RasterCodec, RecordCodec, Retrievable, Stored, ValueKind,
};
