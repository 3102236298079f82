//! Numbered member files of a collection directory.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;

/// The index a member file name starts with: `12.png` is member 12.
pub(crate) fn member_index(file_name: &str) -> Option<u64> {
    lazy_static! {
        static ref LEADING_INDEX: Regex = Regex::new(r"^[0-9]+").unwrap();
    }

    LEADING_INDEX
        .find(file_name)
        .and_then(|index| index.as_str().parse::<u64>().ok())
}

fn index_of(path: &Path) -> Option<u64> {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(member_index)
}

/// Sort member paths into index order.
///
/// Names without a leading index go last; ties are broken by name.
pub(crate) fn sort_members(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| {
        let order = match (index_of(a), index_of(b)) {
            (Some(a_index), Some(b_index)) => a_index.cmp(&b_index),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        order.then_with(|| a.file_name().cmp(&b.file_name()))
    });
}

/// The index the next appended member gets: one past the largest in use.
/// `None` once `u64::MAX` is taken.
///
/// Scanning and writing are separate steps, so two processes appending to the
/// same collection at once can pick the same index.
pub(crate) fn next_index(paths: &[PathBuf]) -> Option<u64> {
    match paths.iter().filter_map(|path| index_of(path)).max() {
        Some(max) => max.checked_add(1),
        None => Some(0),
    }
}
