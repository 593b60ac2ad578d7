//! Turns local files and directory trees into staged entries for `create`
//! and `add`.
//!
//! A staged entry carries the in-archive path plus the `source_path` property
//! pointing at the file whose bytes are to be stored. A directory source is
//! staged under its own name, so `stage(["photos"])` yields `photos`,
//! `photos/2024`, `photos/2024/a.jpg` and so on.

use std::fs::Metadata;
use std::path::Component;
use std::path::Path;

use walkdir::DirEntry;
use walkdir::WalkDir;

use crate::ArchiveError;
use crate::Result;
use crate::config::StagingOptions;
use crate::entry::ArchiveEntry;
use crate::entry::property;
use crate::tree;

/// Stages `sources` in order; directory contents are sorted by name.
///
/// # Errors
///
/// Returns [`ArchiveError::MissingSource`] if a source does not exist, or an
/// I/O error if a directory cannot be walked.
///
/// # Examples
///
/// ```no_run
/// use polyarc_core::StagingOptions;
/// use polyarc_core::staging::stage;
///
/// let entries = stage(&["./docs"], &StagingOptions::default().with_prefix("manual"))?;
/// assert!(entries.iter().all(|e| e.path().starts_with("manual/docs")));
/// # Ok::<(), polyarc_core::ArchiveError>(())
/// ```
pub fn stage<P: AsRef<Path>>(sources: &[P], options: &StagingOptions) -> Result<Vec<ArchiveEntry>> {
    let mut entries = Vec::new();
    for source in sources {
        stage_one(source.as_ref(), options, &mut entries)?;
    }
    Ok(entries)
}

fn stage_one(source: &Path, options: &StagingOptions, out: &mut Vec<ArchiveEntry>) -> Result<()> {
    if source.symlink_metadata().is_err() {
        return Err(ArchiveError::MissingSource {
            path: source.display().to_string(),
        });
    }
    let base = source.parent().unwrap_or_else(|| Path::new(""));

    let walker = WalkDir::new(source)
        .follow_links(options.follow_symlinks)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !should_skip(entry.path(), options));

    for entry in walker {
        let entry = entry?;
        let relative = entry.path().strip_prefix(base).unwrap_or_else(|_| entry.path());
        let Some(archive_path) = archive_path(relative, options.prefix.as_deref()) else {
            continue;
        };
        out.push(to_entry(&entry, &archive_path)?);
    }
    Ok(())
}

fn to_entry(entry: &DirEntry, archive_path: &str) -> Result<ArchiveEntry> {
    let metadata = entry.metadata()?;
    let staged = if entry.file_type().is_dir() {
        ArchiveEntry::folder(archive_path)
    } else if entry.path_is_symlink() && entry.file_type().is_symlink() {
        let target = std::fs::read_link(entry.path())?;
        ArchiveEntry::staged(archive_path, entry.path())
            .with_property(property::SYMLINK_TARGET, target.to_string_lossy())
    } else {
        ArchiveEntry::staged(archive_path, entry.path()).with_sizes(0, metadata.len())
    };
    Ok(staged
        .with_modified(metadata.modified().ok())
        .with_accessed(metadata.accessed().ok())
        .with_attributes(mode(&metadata)))
}

/// Slash-joined archive path, or `None` if nothing remains.
fn archive_path(relative: &Path, prefix: Option<&str>) -> Option<String> {
    let mut segments: Vec<String> = prefix
        .map(|prefix| {
            tree::normalize_path(prefix)
                .split('/')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            segments.push(part.to_string_lossy().into_owned());
        }
    }
    let joined = segments.join("/");
    (!joined.is_empty()).then_some(joined)
}

fn should_skip(path: &Path, options: &StagingOptions) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    if !options.include_hidden && name.starts_with('.') {
        return true;
    }
    options
        .exclude_patterns
        .iter()
        .any(|pattern| pattern_matches(name, pattern))
}

/// Exact name, `prefix*` or `*suffix`.
fn pattern_matches(name: &str, pattern: &str) -> bool {
    if pattern == name {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix('*') {
        return name.starts_with(prefix);
    }
    if let Some(suffix) = pattern.strip_prefix('*') {
        return name.ends_with(suffix);
    }
    false
}

#[cfg(unix)]
fn mode(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode()
}

#[cfg(not(unix))]
fn mode(_metadata: &Metadata) -> u32 {
    0
}
