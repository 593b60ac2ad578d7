//! The flattened tree-node representation of one archive item.

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::tree;

/// Well-known keys of the entry property map.
pub mod property {
    /// Icon hint; one of the [`icon`](super::icon) values.
    pub const ICON: &str = "icon";
    /// Local file backing an entry that is being added or created.
    pub const SOURCE_PATH: &str = "source_path";
    /// Set to `"true"` on the synthetic entry of a compressor-only listing.
    pub const NESTED_ARCHIVE: &str = "nested_archive";
    /// Link target of a symbolic link entry.
    pub const SYMLINK_TARGET: &str = "symlink_target";
}

/// Values of the [`property::ICON`] hint.
pub mod icon {
    /// Directory.
    pub const FOLDER: &str = "folder";
    /// Regular file.
    pub const FILE: &str = "file";
    /// A file that is itself an archive.
    pub const ARCHIVE: &str = "archive";
}

/// File name suffixes that get the [`icon::ARCHIVE`] hint.
const ARCHIVE_SUFFIXES: &[&str] = &[
    "zip", "jar", "tar", "tgz", "tbz", "tbz2", "txz", "tzst", "7z", "gz", "bz2", "xz", "zst",
];

/// One node of an archive's flattened, level-annotated tree.
///
/// Entries are immutable snapshots: every list operation produces a fresh
/// set. The path is always normalized (forward slashes, no leading `./` or
/// `/`, no trailing `/`) and `level` is the number of `/` in it.
///
/// # Examples
///
/// ```
/// use polyarc_core::ArchiveEntry;
///
/// let entry = ArchiveEntry::file("./docs\\readme.txt").with_sizes(12, 40);
/// assert_eq!(entry.path(), "docs/readme.txt");
/// assert_eq!(entry.level(), 1);
/// assert_eq!(entry.name(), "readme.txt");
/// assert!(!entry.is_folder());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    index: usize,
    level: usize,
    path: String,
    hash: Option<String>,
    packed_size: u64,
    raw_size: u64,
    modified: Option<SystemTime>,
    accessed: Option<SystemTime>,
    created: Option<SystemTime>,
    user: Option<String>,
    group: Option<String>,
    attributes: u32,
    comment: Option<String>,
    is_folder: bool,
    is_encrypted: bool,
    properties: BTreeMap<String, String>,
}

impl ArchiveEntry {
    fn with_kind(path: &str, is_folder: bool) -> Self {
        let path = tree::normalize_path(path);
        let hint = if is_folder {
            icon::FOLDER
        } else if has_archive_suffix(&path) {
            icon::ARCHIVE
        } else {
            icon::FILE
        };
        let mut properties = BTreeMap::new();
        properties.insert(property::ICON.to_string(), hint.to_string());

        Self {
            index: 0,
            level: tree::level_of(&path),
            path,
            hash: None,
            packed_size: 0,
            raw_size: 0,
            modified: None,
            accessed: None,
            created: None,
            user: None,
            group: None,
            attributes: 0,
            comment: None,
            is_folder,
            is_encrypted: false,
            properties,
        }
    }

    /// Creates a file entry at `path`.
    #[must_use]
    pub fn file(path: &str) -> Self {
        Self::with_kind(path, false)
    }

    /// Creates a folder entry at `path`.
    #[must_use]
    pub fn folder(path: &str) -> Self {
        Self::with_kind(path, true)
    }

    /// Creates a file entry staged from a local file.
    ///
    /// Writers read the entry's content from `source` during `create`/`add`.
    #[must_use]
    pub fn staged(path: &str, source: impl AsRef<Path>) -> Self {
        Self::file(path).with_source_path(source)
    }

    /// Sets the ordinal index.
    #[must_use]
    pub(crate) const fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Sets the content hash.
    #[must_use]
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    /// Sets packed and raw sizes.
    #[must_use]
    pub const fn with_sizes(mut self, packed_size: u64, raw_size: u64) -> Self {
        self.packed_size = packed_size;
        self.raw_size = raw_size;
        self
    }

    /// Sets the last-write timestamp.
    #[must_use]
    pub const fn with_modified(mut self, time: Option<SystemTime>) -> Self {
        self.modified = time;
        self
    }

    /// Sets the last-access timestamp.
    #[must_use]
    pub const fn with_accessed(mut self, time: Option<SystemTime>) -> Self {
        self.accessed = time;
        self
    }

    /// Sets the creation timestamp.
    #[must_use]
    pub const fn with_created(mut self, time: Option<SystemTime>) -> Self {
        self.created = time;
        self
    }

    /// Sets the owning user and group names.
    #[must_use]
    pub fn with_owner(mut self, user: Option<String>, group: Option<String>) -> Self {
        self.user = user;
        self.group = group;
        self
    }

    /// Sets the attribute bits (Unix mode or DOS attributes).
    #[must_use]
    pub const fn with_attributes(mut self, attributes: u32) -> Self {
        self.attributes = attributes;
        self
    }

    /// Sets the comment; empty comments are dropped.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        let comment = comment.into();
        self.comment = (!comment.is_empty()).then_some(comment);
        self
    }

    /// Marks the entry as encrypted.
    #[must_use]
    pub const fn with_encrypted(mut self, is_encrypted: bool) -> Self {
        self.is_encrypted = is_encrypted;
        self
    }

    /// Inserts a property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Sets the staging source file.
    #[must_use]
    pub fn with_source_path(self, source: impl AsRef<Path>) -> Self {
        let source = source.as_ref().to_string_lossy().into_owned();
        self.with_property(property::SOURCE_PATH, source)
    }

    /// Ordinal index within its listing.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Number of `/` separators in the path; 0 for top-level items.
    #[must_use]
    pub const fn level(&self) -> usize {
        self.level
    }

    /// Full slash-separated relative path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last path segment.
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Path of the parent folder, or `None` at level 0.
    #[must_use]
    pub fn parent_path(&self) -> Option<&str> {
        tree::parent_of(&self.path)
    }

    /// Content hash (hex CRC-32 where the format stores one).
    #[must_use]
    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    /// Stored (compressed) size in bytes.
    #[must_use]
    pub const fn packed_size(&self) -> u64 {
        self.packed_size
    }

    /// Uncompressed size in bytes.
    #[must_use]
    pub const fn raw_size(&self) -> u64 {
        self.raw_size
    }

    /// Last-write timestamp.
    #[must_use]
    pub const fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    /// Last-access timestamp.
    #[must_use]
    pub const fn accessed(&self) -> Option<SystemTime> {
        self.accessed
    }

    /// Creation timestamp.
    #[must_use]
    pub const fn created(&self) -> Option<SystemTime> {
        self.created
    }

    /// Owning user name.
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Owning group name.
    #[must_use]
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Attribute bits.
    #[must_use]
    pub const fn attributes(&self) -> u32 {
        self.attributes
    }

    /// Free-text comment.
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Whether this entry is a directory.
    #[must_use]
    pub const fn is_folder(&self) -> bool {
        self.is_folder
    }

    /// Whether the entry's data is encrypted.
    #[must_use]
    pub const fn is_encrypted(&self) -> bool {
        self.is_encrypted
    }

    /// The open-ended property map.
    #[must_use]
    pub const fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Looks up one property.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Staging source file, if the entry carries one.
    #[must_use]
    pub fn source_path(&self) -> Option<PathBuf> {
        self.property(property::SOURCE_PATH).map(PathBuf::from)
    }

    /// Symlink target, if the entry is a link.
    #[must_use]
    pub fn symlink_target(&self) -> Option<&str> {
        self.property(property::SYMLINK_TARGET)
    }

    /// Whether callers should recurse into this entry as an archive.
    #[must_use]
    pub fn is_nested_archive(&self) -> bool {
        self.property(property::NESTED_ARCHIVE) == Some("true")
    }

    /// Returns `true` if `path` is this entry or, for a folder, lies beneath it.
    ///
    /// ```
    /// use polyarc_core::ArchiveEntry;
    ///
    /// let docs = ArchiveEntry::folder("docs");
    /// assert!(docs.covers("docs"));
    /// assert!(docs.covers("docs/a/b.txt"));
    /// assert!(!docs.covers("docs2/a.txt"));
    /// ```
    #[must_use]
    pub fn covers(&self, path: &str) -> bool {
        if path == self.path {
            return true;
        }
        self.is_folder
            && path.len() > self.path.len()
            && path.starts_with(&self.path)
            && path.as_bytes()[self.path.len()] == b'/'
    }

    /// Path of `path` relative to this folder, if `path` lies beneath it.
    #[must_use]
    pub fn relative<'p>(&self, path: &'p str) -> Option<&'p str> {
        if !self.is_folder || path == self.path {
            return None;
        }
        path.strip_prefix(&self.path)?.strip_prefix('/')
    }
}

fn has_archive_suffix(path: &str) -> bool {
    path.rsplit_once('.').is_some_and(|(_, ext)| {
        ARCHIVE_SUFFIXES
            .iter()
            .any(|suffix| ext.eq_ignore_ascii_case(suffix))
    })
}
