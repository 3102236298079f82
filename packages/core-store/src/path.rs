//! Sanitized logical paths.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const SEPARATOR: char = '/';

/// Characters that never survive sanitizing.
///
/// Colons, control characters, line and paragraph separators, and Unicode
/// noncharacters.
fn is_unsafe(c: char) -> bool {
    let code = c as u32;
    c == ':'
        || c.is_control()
        || matches!(c, '\u{0085}' | '\u{2028}' | '\u{2029}')
        || (0xFDD0..=0xFDEF).contains(&code)
        || (code & 0xFFFE) == 0xFFFE
}

/// A caller-supplied logical path, sanitized into safe segments.
///
/// Produced by [`ValidPath::sanitize`], which is a pure string transform: it
/// never looks at the filesystem. A trailing separator in the raw string is
/// kept as [`is_directory`](ValidPath::is_directory), the caller's declaration
/// that the path names a folder.
///
/// # Examples
///
/// ```rust
/// use stowage_core_store::ValidPath;
///
/// let path = ValidPath::sanitize("//Folder/Sub:/file.json").unwrap();
/// assert_eq!(path.to_string(), "Folder/Sub/file.json");
/// assert_eq!(path.file_name(), "file.json");
///
/// let album = ValidPath::sanitize("album/").unwrap();
/// assert!(album.is_directory());
///
/// assert!(ValidPath::sanitize("///").is_err());
/// ```
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ValidPath {
    segments: Vec<String>,
    directory: bool,
}

impl ValidPath {
    /// Sanitize a raw logical path.
    ///
    /// Removes unsafe characters, strips leading separators, drops empty and
    /// `.` segments, and fails with [`Error::InvalidName`] when nothing is left
    /// or a segment is `..`.
    pub fn sanitize(raw: &str) -> Result<Self> {
        let cleaned: String = raw.chars().filter(|c| !is_unsafe(*c)).collect();
        let trimmed = cleaned.trim_start_matches(SEPARATOR);

        if trimmed.is_empty() || trimmed == "." {
            return Err(Error::invalid_name(
                raw,
                "nothing usable is left after removing illegal characters",
            ));
        }

        let directory = trimmed.ends_with(SEPARATOR);
        let mut segments = Vec::new();
        for segment in trimmed.split(SEPARATOR) {
            match segment {
                "" | "." => {}
                ".." => {
                    return Err(Error::invalid_name(
                        raw,
                        "'..' would leave the storage location",
                    ))
                }
                other => segments.push(other.to_string()),
            }
        }

        if segments.is_empty() {
            return Err(Error::invalid_name(
                raw,
                "the path does not name any file or folder",
            ));
        }

        Ok(ValidPath {
            segments,
            directory,
        })
    }

    /// Whether the caller declared this path to be a folder.
    pub fn is_directory(&self) -> bool {
        self.directory
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false: a valid path has at least one segment.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The last segment.
    pub fn file_name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// The extension of the last segment, without the dot, lowercased.
    ///
    /// A leading dot alone (`.hidden`) is not an extension.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => None,
            Some(i) if i + 1 < name.len() => Some(name[i + 1..].to_ascii_lowercase()),
            Some(_) => None,
        }
    }

    /// Replace the last segment, keeping every parent segment.
    ///
    /// `name` is sanitized; if it has several segments the whole path is
    /// replaced instead.
    pub fn with_file_name(&self, name: &str) -> Result<ValidPath> {
        let replacement = ValidPath::sanitize(name)?;
        if replacement.len() > 1 {
            return Ok(replacement);
        }

        let mut segments = self.segments.clone();
        segments.pop();
        segments.extend(replacement.segments);
        Ok(ValidPath {
            segments,
            directory: self.directory || replacement.directory,
        })
    }

    /// Append a suffix to the last segment, e.g. an extension.
    #[must_use]
    pub fn with_suffix(&self, suffix: &str) -> ValidPath {
        let mut segments = self.segments.clone();
        if let Some(last) = segments.last_mut() {
            last.push_str(suffix);
        }
        ValidPath {
            segments,
            directory: self.directory,
        }
    }

    /// Join the segments onto `root` without redundant separators.
    pub fn resolve_onto(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        path.extend(&self.segments);
        path
    }

    /// The segments as a relative filesystem path.
    pub fn to_relative_path(&self) -> PathBuf {
        self.segments.iter().collect()
    }
}

impl fmt::Display for ValidPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))?;
        if self.directory {
            write!(f, "/")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for ValidPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ValidPath::sanitize(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(raw: &str) -> String {
        ValidPath::sanitize(raw).unwrap().to_string()
    }

    #[test]
    fn leading_separators_are_stripped() {
        assert_eq!(clean("//////messages.json"), "messages.json");
        assert_eq!(
            ValidPath::sanitize("//////messages.json").unwrap(),
            ValidPath::sanitize("messages.json").unwrap()
        );
    }

    #[test]
    fn unsafe_characters_are_removed() {
        assert_eq!(clean("Cool:Folder/images\n/a\tb.png"), "CoolFolder/images/ab.png");
        assert_eq!(clean("line\u{2028}break"), "linebreak");
        assert_eq!(clean("non\u{FFFF}char\u{FDD0}"), "nonchar");
        assert_eq!(clean("\u{1}\u{7f}ok"), "ok");
    }

    #[test]
    fn internal_separators_make_segments() {
        let path = ValidPath::sanitize("Folder/Sub/file.json").unwrap();
        assert_eq!(path.segments(), ["Folder", "Sub", "file.json"]);
        assert!(!path.is_directory());
    }

    #[test]
    fn trailing_separator_marks_directory() {
        let path = ValidPath::sanitize("album/").unwrap();
        assert!(path.is_directory());
        assert_eq!(path.to_string(), "album/");
        assert_eq!(path.file_name(), "album");
    }

    #[test]
    fn degenerate_names_are_rejected() {
        for raw in ["", "/", "////", ".", "::", "\n\r", "./", "/./."] {
            assert!(
                matches!(ValidPath::sanitize(raw), Err(Error::InvalidName { .. })),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn parent_segments_are_rejected() {
        assert!(matches!(
            ValidPath::sanitize("a/../../etc/passwd"),
            Err(Error::InvalidName { .. })
        ));
    }

    #[test]
    fn odd_but_valid_names_survive() {
        assert_eq!(
            clean("user-messages/saoud*.adf3/jpeg.message.png/.json"),
            "user-messages/saoud*.adf3/jpeg.message.png/.json"
        );
        assert_eq!(clean(".adf/"), ".adf/");
        assert_eq!(clean("a//b/./c"), "a/b/c");
    }

    #[test]
    fn extension_detection() {
        let ext = |raw: &str| ValidPath::sanitize(raw).unwrap().extension();
        assert_eq!(ext("a/photo.PNG"), Some("png".to_string()));
        assert_eq!(ext("a/photo.jpeg"), Some("jpeg".to_string()));
        assert_eq!(ext("a/.json"), None);
        assert_eq!(ext("a/photo"), None);
        assert_eq!(ext("a/photo."), None);
    }

    #[test]
    fn with_file_name_keeps_parents() {
        let path = ValidPath::sanitize("folder/sub/old.json").unwrap();
        assert_eq!(
            path.with_file_name("new.json").unwrap().to_string(),
            "folder/sub/new.json"
        );
        assert_eq!(
            path.with_file_name("/elsewhere/new.json").unwrap().to_string(),
            "elsewhere/new.json"
        );
        assert!(path.with_file_name("::").is_err());
    }

    #[test]
    fn resolve_onto_root() {
        let path = ValidPath::sanitize("a/b.json").unwrap();
        assert_eq!(
            path.resolve_onto(Path::new("/root")),
            PathBuf::from("/root/a/b.json")
        );
        assert_eq!(path.to_relative_path(), PathBuf::from("a/b.json"));
        assert_eq!(
            path.with_suffix(".bak").resolve_onto(Path::new("/root")),
            PathBuf::from("/root/a/b.json.bak")
        );
    }
}
