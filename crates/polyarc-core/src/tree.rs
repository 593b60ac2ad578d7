//! Directory synthesis and level computation over raw provider output.
//!
//! Formats are free to omit directory records: a zip may contain only
//! `a/b/c.txt`. [`normalize`] restores the ancestor invariant (every entry
//! at level `L > 0` has a folder at level `L - 1` whose path is its own path
//! minus the last segment) and removes duplicates.
//!
//! Entries are keyed on `(level, path)`. A raw entry always wins over a
//! synthesized one; of two raw entries with the same key, the first wins.

use std::collections::BTreeMap;
use std::collections::btree_map;

use crate::entry::ArchiveEntry;
use crate::entry::property;

/// Normalizes an in-archive path.
///
/// Backslashes become `/`, leading `./` and `/` are stripped, empty and `.`
/// segments are dropped, and trailing `/` is removed.
///
/// # Examples
///
/// ```
/// use polyarc_core::tree::normalize_path;
///
/// assert_eq!(normalize_path("./a\\b//c/"), "a/b/c");
/// assert_eq!(normalize_path("/"), "");
/// ```
#[must_use]
pub fn normalize_path(raw: &str) -> String {
    let unified = raw.replace('\\', "/");
    let mut out = String::with_capacity(unified.len());
    for segment in unified.split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(segment);
    }
    out
}

/// Number of `/` separators in a normalized path.
#[must_use]
pub fn level_of(path: &str) -> usize {
    path.bytes().filter(|&b| b == b'/').count()
}

/// The path minus its last segment, or `None` for a top-level path.
#[must_use]
pub fn parent_of(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(parent, _)| parent)
}

/// Converts raw provider output into a complete, duplicate-free entry set.
///
/// The output is ordered by `(level, path)` and indices are reassigned
/// sequentially in that order.
///
/// # Examples
///
/// ```
/// use polyarc_core::ArchiveEntry;
/// use polyarc_core::tree::normalize;
///
/// let entries = normalize(vec![ArchiveEntry::file("a/b.txt")]);
/// assert_eq!(entries.len(), 2);
/// assert_eq!(entries[0].path(), "a");
/// assert!(entries[0].is_folder());
/// assert_eq!(entries[1].path(), "a/b.txt");
/// assert_eq!(entries[1].level(), 1);
/// ```
#[must_use]
pub fn normalize(raw_entries: Vec<ArchiveEntry>) -> Vec<ArchiveEntry> {
    let mut by_key: BTreeMap<(usize, String), ArchiveEntry> = BTreeMap::new();

    for entry in raw_entries {
        if entry.path().is_empty() {
            continue;
        }
        let key = (entry.level(), entry.path().to_string());
        if let btree_map::Entry::Vacant(slot) = by_key.entry(key) {
            slot.insert(entry);
        }
    }

    let mut synthesized = Vec::new();
    for (level, path) in by_key.keys() {
        let mut current = path.as_str();
        for ancestor_level in (0..*level).rev() {
            let Some(parent) = parent_of(current) else {
                break;
            };
            synthesized.push((ancestor_level, parent.to_string()));
            current = parent;
        }
    }
    for key in synthesized {
        by_key
            .entry(key)
            .or_insert_with_key(|(_, path)| ArchiveEntry::folder(path));
    }

    by_key
        .into_values()
        .enumerate()
        .map(|(index, entry)| entry.with_index(index))
        .collect()
}

/// Builds the single entry a compressor-only listing returns.
///
/// `file_name` is the archive's own file name and `suffix` the compressor
/// extension (without the dot). The suffix is stripped case-insensitively;
/// when the name does not end with it, `.out` is appended instead.
///
/// # Examples
///
/// ```
/// use polyarc_core::tree::nested_archive_entry;
///
/// let entry = nested_archive_entry("backup.tar.GZ", "gz", 120, 4096);
/// assert_eq!(entry.path(), "backup.tar");
/// assert!(entry.is_nested_archive());
///
/// let entry = nested_archive_entry("payload", "xz", 10, 0);
/// assert_eq!(entry.path(), "payload.out");
/// ```
#[must_use]
pub fn nested_archive_entry(
    file_name: &str,
    suffix: &str,
    packed_size: u64,
    raw_size: u64,
) -> ArchiveEntry {
    let wrapped = strip_suffix_ignore_case(file_name, suffix)
        .filter(|stem| !stem.is_empty())
        .map_or_else(|| format!("{file_name}.out"), str::to_string);

    ArchiveEntry::file(&wrapped)
        .with_sizes(packed_size, raw_size)
        .with_property(property::NESTED_ARCHIVE, "true")
}

fn strip_suffix_ignore_case<'a>(name: &'a str, suffix: &str) -> Option<&'a str> {
    let split = name.len().checked_sub(suffix.len() + 1)?;
    if !name.is_char_boundary(split) {
        return None;
    }
    let (stem, tail) = name.split_at(split);
    let tail = tail.strip_prefix('.')?;
    tail.eq_ignore_ascii_case(suffix).then_some(stem)
}
