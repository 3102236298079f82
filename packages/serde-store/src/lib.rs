//! Serde and image integration for stowage
//!
//! This layer decides what stored bytes mean. It adds:
//! - `RecordCodec` / `JsonCodec`: structured records as JSON
//! - `ImageCodec` / `RasterCodec`: images as PNG or JPEG
//! - `Persistable`, `Retrievable`, `Appendable`: how each value kind maps
//!   onto a single file or a directory of numbered members
//! - `Json<T>`: marks any serde type as a record
//!
//! # Example
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use stowage_core_store::ValidPath;
//! use stowage_serde_store::{Codecs, Encoded, Json, Persistable, Retrievable, Stored};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Message {
//!     body: String,
//! }
//!
//! let codecs = Codecs::default();
//! let target = ValidPath::sanitize("messages.json").unwrap();
//! let message = Json(Message { body: "hi".to_string() });
//!
//! let Encoded::File(bytes) = message.encode(&codecs, &target).unwrap() else {
//!     unreachable!()
//! };
//! let back = <Json<Message>>::decode(Stored::File(bytes), &codecs).unwrap();
//! assert_eq!(back, message);
//! ```

pub use bytes::Bytes;
pub use image;
pub use image::DynamicImage;

mod codec;
mod convert;
mod raster;
mod typed;

pub use codec::{JsonCodec, RecordCodec};
pub use convert::{append_records, from_value, to_value};
pub use raster::{ImageCodec, ImageFormat, RasterCodec};
pub use typed::{
    Appendable, Codecs, Element, Encoded, Json, Member, Persistable, Retrievable, Stored,
    ValueKind,
};

// Re-export core types for convenience
pub use stowage_core_store::{Error, Result, ValidPath};
