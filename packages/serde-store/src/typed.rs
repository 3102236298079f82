//! Value kinds and how each one maps onto files.
//!
//! Every persistable type belongs to exactly one [`ValueKind`]. Records and
//! single blobs or images are one file; blob and image collections are a
//! directory holding one member file per element, named by its index.

use std::ops::{Deref, DerefMut};

use bytes::Bytes;
use image::DynamicImage;
use serde::de::DeserializeOwned;
use serde::Serialize;
use stowage_core_store::{Error, Result, StoreConfig, ValidPath};

use crate::codec::{JsonCodec, RecordCodec};
use crate::convert::{from_value, to_value};
use crate::raster::{ImageCodec, ImageFormat, RasterCodec};

/// The codecs a store encodes and decodes with.
pub struct Codecs {
    pub records: Box<dyn RecordCodec>,
    pub images: Box<dyn ImageCodec>,
}

impl Codecs {
    pub fn new(records: impl RecordCodec + 'static, images: impl ImageCodec + 'static) -> Self {
        Codecs {
            records: Box::new(records),
            images: Box::new(images),
        }
    }

    /// JSON and raster codecs set up as `config` says.
    pub fn from_config(config: &StoreConfig) -> Self {
        Codecs::new(
            JsonCodec {
                pretty: config.pretty_json,
            },
            RasterCodec::with_jpeg_quality(config.jpeg_quality),
        )
    }
}

impl Default for Codecs {
    fn default() -> Self {
        Codecs::new(JsonCodec::default(), RasterCodec::default())
    }
}

impl std::fmt::Debug for Codecs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codecs").finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// A serde value, stored as one structured file.
    Record,
    /// Raw bytes, stored verbatim.
    Blob,
    BlobCollection,
    /// One image, stored as PNG or JPEG.
    Image,
    ImageCollection,
}

impl ValueKind {
    /// Whether values of this kind are stored as a directory of members.
    pub fn is_collection(self) -> bool {
        matches!(self, ValueKind::BlobCollection | ValueKind::ImageCollection)
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Record => "record",
            ValueKind::Blob => "blob",
            ValueKind::BlobCollection => "blob collection",
            ValueKind::Image => "image",
            ValueKind::ImageCollection => "image collection",
        }
    }
}

/// One encoded element of a collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Member {
    pub bytes: Bytes,
    /// Extension of the member file, without the dot.
    pub extension: Option<&'static str>,
}

impl Member {
    pub fn blob(bytes: Bytes) -> Self {
        Member {
            bytes,
            extension: None,
        }
    }

    /// The member's file name at position `index`.
    pub fn file_name(&self, index: u64) -> String {
        match self.extension {
            Some(extension) => format!("{}.{}", index, extension),
            None => index.to_string(),
        }
    }
}

/// A value ready to be written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Encoded {
    File(Bytes),
    Members(Vec<Member>),
}

/// What was read back from the store for a value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stored {
    File(Bytes),
    /// Member contents in index order.
    Members(Vec<Bytes>),
}

impl Stored {
    fn into_file(self, kind: ValueKind) -> Result<Bytes> {
        match self {
            Stored::File(bytes) => Ok(bytes),
            Stored::Members(_) => Err(Error::deserialization(format!(
                "a {} is a single file, found a directory",
                kind.name()
            ))),
        }
    }

    fn into_members(self, kind: ValueKind) -> Result<Vec<Bytes>> {
        match self {
            Stored::Members(members) => Ok(members),
            Stored::File(_) => Err(Error::deserialization(format!(
                "a {} is a directory, found a single file",
                kind.name()
            ))),
        }
    }
}

/// A value that can be saved.
pub trait Persistable {
    const KIND: ValueKind;

    /// Encode the whole value. `target` is where it will be stored; single
    /// images take their format from its extension.
    fn encode(&self, codecs: &Codecs, target: &ValidPath) -> Result<Encoded>;
}

/// A value that can be retrieved.
pub trait Retrievable: Sized {
    const KIND: ValueKind;

    fn decode(stored: Stored, codecs: &Codecs) -> Result<Self>;
}

/// One element appended to a stored value.
#[derive(Clone, Debug, PartialEq)]
pub enum Element {
    /// Joins a record file, making it an array.
    Record(serde_json::Value),
    /// Joins a collection directory as the next numbered file.
    Member(Member),
}

/// A value that can be appended to what is already stored.
pub trait Appendable {
    /// The kind of the stored value this element joins.
    const KIND: ValueKind;

    fn element(&self, codecs: &Codecs) -> Result<Element>;
}

/// A record: any serde type, stored through the record codec.
///
/// ```rust
/// use stowage_serde_store::Json;
///
/// let messages = Json(vec!["hi".to_string()]);
/// assert_eq!(messages.len(), 1);
/// assert_eq!(messages.into_inner(), vec!["hi".to_string()]);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> From<T> for Json<T> {
    fn from(value: T) -> Self {
        Json(value)
    }
}

impl<T> Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Json<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: Serialize> Persistable for Json<T> {
    const KIND: ValueKind = ValueKind::Record;

    fn encode(&self, codecs: &Codecs, _target: &ValidPath) -> Result<Encoded> {
        let value = to_value(&self.0)?;
        codecs.records.encode(&value).map(Encoded::File)
    }
}

impl<T: DeserializeOwned> Retrievable for Json<T> {
    const KIND: ValueKind = ValueKind::Record;

    fn decode(stored: Stored, codecs: &Codecs) -> Result<Self> {
        let bytes = stored.into_file(<Self as Retrievable>::KIND)?;
        let value = codecs.records.decode(&bytes)?;
        from_value(value).map(Json)
    }
}

impl<T: Serialize> Appendable for Json<T> {
    const KIND: ValueKind = ValueKind::Record;

    fn element(&self, _codecs: &Codecs) -> Result<Element> {
        to_value(&self.0).map(Element::Record)
    }
}

// Blobs

impl Persistable for [u8] {
    const KIND: ValueKind = ValueKind::Blob;

    fn encode(&self, _codecs: &Codecs, _target: &ValidPath) -> Result<Encoded> {
        Ok(Encoded::File(Bytes::copy_from_slice(self)))
    }
}

impl Persistable for Vec<u8> {
    const KIND: ValueKind = ValueKind::Blob;

    fn encode(&self, codecs: &Codecs, target: &ValidPath) -> Result<Encoded> {
        self.as_slice().encode(codecs, target)
    }
}

impl Persistable for Bytes {
    const KIND: ValueKind = ValueKind::Blob;

    fn encode(&self, _codecs: &Codecs, _target: &ValidPath) -> Result<Encoded> {
        Ok(Encoded::File(self.clone()))
    }
}

impl Retrievable for Bytes {
    const KIND: ValueKind = ValueKind::Blob;

    fn decode(stored: Stored, _codecs: &Codecs) -> Result<Self> {
        stored.into_file(<Self as Retrievable>::KIND)
    }
}

impl Retrievable for Vec<u8> {
    const KIND: ValueKind = ValueKind::Blob;

    fn decode(stored: Stored, _codecs: &Codecs) -> Result<Self> {
        stored.into_file(<Self as Retrievable>::KIND).map(Vec::from)
    }
}

impl Appendable for [u8] {
    const KIND: ValueKind = ValueKind::BlobCollection;

    fn element(&self, _codecs: &Codecs) -> Result<Element> {
        Ok(Element::Member(Member::blob(Bytes::copy_from_slice(self))))
    }
}

impl Appendable for Vec<u8> {
    const KIND: ValueKind = ValueKind::BlobCollection;

    fn element(&self, codecs: &Codecs) -> Result<Element> {
        self.as_slice().element(codecs)
    }
}

impl Appendable for Bytes {
    const KIND: ValueKind = ValueKind::BlobCollection;

    fn element(&self, _codecs: &Codecs) -> Result<Element> {
        Ok(Element::Member(Member::blob(self.clone())))
    }
}

impl Persistable for [Bytes] {
    const KIND: ValueKind = ValueKind::BlobCollection;

    fn encode(&self, _codecs: &Codecs, _target: &ValidPath) -> Result<Encoded> {
        Ok(Encoded::Members(
            self.iter().cloned().map(Member::blob).collect(),
        ))
    }
}

impl Persistable for Vec<Bytes> {
    const KIND: ValueKind = ValueKind::BlobCollection;

    fn encode(&self, codecs: &Codecs, target: &ValidPath) -> Result<Encoded> {
        self.as_slice().encode(codecs, target)
    }
}

impl Retrievable for Vec<Bytes> {
    const KIND: ValueKind = ValueKind::BlobCollection;

    fn decode(stored: Stored, _codecs: &Codecs) -> Result<Self> {
        stored.into_members(<Self as Retrievable>::KIND)
    }
}

// Images

fn image_member(codecs: &Codecs, image: &DynamicImage) -> Result<Member> {
    let (bytes, format) = codecs.images.encode_any(image)?;
    Ok(Member {
        bytes,
        extension: Some(format.extension()),
    })
}

impl Persistable for DynamicImage {
    const KIND: ValueKind = ValueKind::Image;

    fn encode(&self, codecs: &Codecs, target: &ValidPath) -> Result<Encoded> {
        let requested = target
            .extension()
            .and_then(|extension| ImageFormat::from_extension(&extension));
        let bytes = match requested {
            Some(format) => codecs.images.encode(self, format)?,
            None => codecs.images.encode_any(self)?.0,
        };
        Ok(Encoded::File(bytes))
    }
}

impl Retrievable for DynamicImage {
    const KIND: ValueKind = ValueKind::Image;

    fn decode(stored: Stored, codecs: &Codecs) -> Result<Self> {
        codecs.images.decode(&stored.into_file(<Self as Retrievable>::KIND)?)
    }
}

impl Appendable for DynamicImage {
    const KIND: ValueKind = ValueKind::ImageCollection;

    fn element(&self, codecs: &Codecs) -> Result<Element> {
        image_member(codecs, self).map(Element::Member)
    }
}

impl Persistable for [DynamicImage] {
    const KIND: ValueKind = ValueKind::ImageCollection;

    fn encode(&self, codecs: &Codecs, _target: &ValidPath) -> Result<Encoded> {
        self.iter()
            .enumerate()
            .map(|(i, image)| image_member(codecs, image).map_err(|e| e.at_index(i)))
            .collect::<Result<Vec<_>>>()
            .map(Encoded::Members)
    }
}

impl Persistable for Vec<DynamicImage> {
    const KIND: ValueKind = ValueKind::ImageCollection;

    fn encode(&self, codecs: &Codecs, target: &ValidPath) -> Result<Encoded> {
        self.as_slice().encode(codecs, target)
    }
}

impl Retrievable for Vec<DynamicImage> {
    const KIND: ValueKind = ValueKind::ImageCollection;

    fn decode(stored: Stored, codecs: &Codecs) -> Result<Self> {
        let members = stored.into_members(<Self as Retrievable>::KIND)?;
        let mut images = Vec::with_capacity(members.len());
        for (index, bytes) in members.iter().enumerate() {
            match codecs.images.decode(bytes) {
                Ok(image) => images.push(image),
                Err(e) => log::warn!("Skipping member {} of image collection: {}", index, e),
            }
        }
        Ok(images)
    }
}
