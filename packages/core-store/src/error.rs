//! Error types for the stowage stack.

use std::io;
use std::path::{Path, PathBuf};

use crate::location::StorageLocation;

pub type Result<T> = std::result::Result<T, Error>;

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" {}", path.display()),
        None => String::new(),
    }
}

/// Every way a stowage operation can fail.
///
/// The set is closed: each layer surfaces one of these to its caller and
/// nothing is swallowed or retried.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Sanitizing a caller-supplied name left nothing usable.
    #[error("{raw:?} is an invalid name: {reason}")]
    InvalidName { raw: String, reason: String },

    /// Nothing exists where the operation looked.
    #[error("could not find an existing file or folder at {}", .path.display())]
    NotFound { path: PathBuf },

    /// A legacy lookup by bare name matched more than one stored item.
    #[error("{name:?} matches more than one stored item: {candidates:?}")]
    AmbiguousMatch {
        name: String,
        candidates: Vec<PathBuf>,
    },

    /// No root directory could be found for a storage location.
    #[error("{location} is unavailable: {reason}")]
    LocationUnavailable {
        location: StorageLocation,
        reason: String,
    },

    /// The target is occupied and the overwrite policy forbids replacing it.
    #[error("an item already exists at {}", .path.display())]
    AlreadyExists { path: PathBuf },

    /// A value could not be encoded to bytes.
    #[error("could not serialize {what}: {message}")]
    Serialization {
        what: String,
        /// Element of a collection that failed, if any.
        index: Option<usize>,
        message: String,
    },

    /// Stored bytes could not be decoded, or expected content was absent.
    #[error("could not deserialize{}: {message}", display_path(.path))]
    Deserialization {
        path: Option<PathBuf>,
        message: String,
    },

    /// The operation is structurally invalid for what is stored at the path.
    #[error("invalid operation at {}: {message}", .path.display())]
    InvalidOperation { path: PathBuf, message: String },

    /// The byte store failed for reasons outside this crate's control.
    #[error("I/O failure while trying to {operation} {}: {source}", .path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub fn invalid_name(raw: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidName {
            raw: raw.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_operation(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::InvalidOperation {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn deserialization(message: impl Into<String>) -> Self {
        Error::Deserialization {
            path: None,
            message: message.into(),
        }
    }

    pub fn serialization(what: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Serialization {
            what: what.into(),
            index: None,
            message: message.into(),
        }
    }

    /// Build a closure wrapping an [`io::Error`] for `operation` on `path`.
    ///
    /// Meant for `map_err`: `store.read(p).map_err(Error::io("read", p))`.
    pub fn io<'a>(operation: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> Error + 'a {
        move |source| Error::Io {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Attach the file a decode failure came from, if not already known.
    #[must_use]
    pub fn at(self, file: &Path) -> Self {
        match self {
            Error::Deserialization { path: None, message } => Error::Deserialization {
                path: Some(file.to_path_buf()),
                message,
            },
            other => other,
        }
    }

    /// Mark which element of a collection failed to encode.
    #[must_use]
    pub fn at_index(self, i: usize) -> Self {
        match self {
            Error::Serialization { what, message, .. } => Error::Serialization {
                what: format!("{} {}", what, i),
                index: Some(i),
                message,
            },
            other => other,
        }
    }

    /// A stable numeric code for the failure category.
    pub fn code(&self) -> u32 {
        match self {
            Error::NotFound { .. } => 1,
            Error::AmbiguousMatch { .. } => 2,
            Error::Serialization { .. } => 3,
            Error::Deserialization { .. } => 4,
            Error::InvalidName { .. } => 5,
            Error::LocationUnavailable { .. } => 6,
            Error::InvalidOperation { .. } => 7,
            Error::AlreadyExists { .. } => 8,
            Error::Io { .. } => 9,
        }
    }

    /// A short hint for how a caller might recover.
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Error::InvalidName { .. } => "Use another name with alphanumeric characters.",
            Error::NotFound { .. } => {
                "Check that a file or folder exists before operating on it."
            }
            Error::AmbiguousMatch { .. } => {
                "Include the file extension, or a trailing '/' for folders, in the name."
            }
            Error::LocationUnavailable { .. } => {
                "Use a different storage location or check the shared container configuration."
            }
            Error::AlreadyExists { .. } => {
                "Remove the existing item first or use the replacing overwrite policy."
            }
            Error::Serialization { .. } => {
                "Make sure the value is valid, or save it under a different extension."
            }
            Error::Deserialization { .. } => {
                "Retrieve the item as raw bytes and inspect it, or save it again first."
            }
            Error::InvalidOperation { .. } => {
                "Records are single files and blobs or images in folders are numbered files; don't mix them."
            }
            Error::Io { .. } => "Check permissions and free space on the underlying volume.",
        }
    }

    /// Whether this error means the target simply wasn't there.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}
