//! Rewrite-and-swap protocol for formats without native incremental update.
//!
//! 1. A scratch directory is created next to the archive (same filesystem)
//!    and the successor file is written inside it.
//! 2. The format's [`Rewriter`] streams every surviving entry from the
//!    original into the successor and appends the additions.
//! 3. Only once the successor is complete does it replace the original:
//!    a rename-over, or delete-then-rename where the platform refuses to
//!    rename over an existing file.
//!
//! If anything fails before step 3 the original is never touched, and the
//! scratch directory is removed on every exit path.

use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use log::debug;
use log::warn;

use crate::ArchiveError;
use crate::Result;
use crate::descriptor::ArchiveDescriptor;
use crate::entry::ArchiveEntry;
use crate::events::Session;
use crate::tree;

/// Prefix of scratch directories.
const SCRATCH_PREFIX: &str = ".polyarc-";

/// Membership change applied while rewriting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationDelta {
    removals: Vec<ArchiveEntry>,
    additions: Vec<ArchiveEntry>,
}

impl MutationDelta {
    /// A delta removing `entry` (and its descendants, for a folder).
    #[must_use]
    pub fn delete(entry: &ArchiveEntry) -> Self {
        Self {
            removals: vec![entry.clone()],
            additions: Vec::new(),
        }
    }

    /// A delta adding `entries`.
    #[must_use]
    pub fn add(entries: &[ArchiveEntry]) -> Self {
        Self {
            removals: Vec::new(),
            additions: entries.to_vec(),
        }
    }

    /// Entries to append.
    #[must_use]
    pub fn additions(&self) -> &[ArchiveEntry] {
        &self.additions
    }

    /// Entries to remove.
    #[must_use]
    pub fn removals(&self) -> &[ArchiveEntry] {
        &self.removals
    }

    /// Whether an original entry stored under `raw_path` is dropped.
    ///
    /// It is dropped when a removal covers it or an addition replaces it.
    #[must_use]
    pub fn drops(&self, raw_path: &str) -> bool {
        let path = tree::normalize_path(raw_path);
        self.removals.iter().any(|entry| entry.covers(&path))
            || self.additions.iter().any(|entry| entry.path() == path)
    }

    /// Checks that every non-folder addition has a source file.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::MissingSource`] for the first addition without
    /// one.
    pub fn validate(&self) -> Result<()> {
        match self
            .additions
            .iter()
            .find(|entry| !entry.is_folder() && entry.source_path().is_none())
        {
            Some(entry) => Err(ArchiveError::MissingSource {
                path: entry.path().to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Counts of what a rewrite did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationReport {
    /// Original entries copied unchanged.
    pub kept: usize,
    /// Original entries dropped.
    pub removed: usize,
    /// New entries appended.
    pub added: usize,
}

impl fmt::Display for MutationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} kept, {} removed, {} added",
            self.kept, self.removed, self.added
        )
    }
}

/// The per-format copy step.
pub trait Rewriter {
    /// Writes `successor` from `source` (if any) with `delta` applied.
    ///
    /// `source` is `None` when a new archive is being created.
    ///
    /// # Errors
    ///
    /// Any error aborts the mutation; the original archive stays intact.
    fn rewrite(
        &self,
        session: &Session<'_>,
        descriptor: &ArchiveDescriptor,
        source: Option<&Path>,
        successor: &Path,
        delta: &MutationDelta,
    ) -> Result<MutationReport>;
}

/// Applies `delta` to the existing archive at `descriptor.path()`.
///
/// # Errors
///
/// Returns an error if the delta is invalid, the rewrite fails, a removal
/// matched nothing, or the swap fails.
pub fn apply(
    rewriter: &dyn Rewriter,
    session: &Session<'_>,
    descriptor: &ArchiveDescriptor,
    delta: &MutationDelta,
) -> Result<MutationReport> {
    delta.validate()?;
    if !descriptor.path().is_file() {
        return Err(ArchiveError::io_other(format!(
            "archive {} does not exist",
            descriptor.path().display()
        )));
    }
    rewrite_and_swap(rewriter, session, descriptor, Some(descriptor.path()), delta)
}

/// Builds a new archive at `descriptor.path()` from `entries`.
///
/// Any existing file at the path is replaced only after the new archive is
/// complete.
///
/// # Errors
///
/// Returns an error if an entry lacks a source file, writing fails, or the
/// swap fails.
pub fn create(
    rewriter: &dyn Rewriter,
    session: &Session<'_>,
    descriptor: &ArchiveDescriptor,
    entries: &[ArchiveEntry],
) -> Result<MutationReport> {
    let delta = MutationDelta::add(entries);
    delta.validate()?;
    rewrite_and_swap(rewriter, session, descriptor, None, &delta)
}

fn rewrite_and_swap(
    rewriter: &dyn Rewriter,
    session: &Session<'_>,
    descriptor: &ArchiveDescriptor,
    source: Option<&Path>,
    delta: &MutationDelta,
) -> Result<MutationReport> {
    let target = descriptor.path();
    let scratch = tempfile::Builder::new()
        .prefix(SCRATCH_PREFIX)
        .tempdir_in(parent_dir(target))?;
    let successor = scratch.path().join(descriptor.file_name());

    let report = rewriter.rewrite(session, descriptor, source, &successor, delta)?;
    if let Some(missing) = delta.removals().first()
        && report.removed == 0
    {
        return Err(ArchiveError::EntryNotFound {
            path: missing.path().to_string(),
        });
    }

    swap(&successor, target)?;
    debug!("rewrote {}: {report}", target.display());

    if let Err(e) = scratch.close() {
        warn!("cannot remove scratch directory: {e}");
    }
    Ok(report)
}

fn swap(successor: &Path, target: &Path) -> Result<()> {
    if fs::rename(successor, target).is_ok() {
        return Ok(());
    }
    if target.exists() {
        fs::remove_file(target)?;
    }
    fs::rename(successor, target)?;
    Ok(())
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
