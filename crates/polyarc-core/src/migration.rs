//! Single-slot copy/move/delete staging for an open archive view.
//!
//! The guard does not call providers. The host reads the staged
//! `{kind, entry}`, performs the file operation through the provider
//! contract, and then calls [`MigrationGuard::clear`].

use crate::entry::ArchiveEntry;

/// Kind of pending migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MigrationKind {
    /// Copy an entry into another archive.
    Copy,
    /// Copy, then delete from the source.
    Move,
    /// Delete from the archive.
    Delete,
}

/// Guard state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MigrationState {
    /// Nothing staged.
    #[default]
    None,
    /// A copy is staged.
    Copy,
    /// A move is staged.
    Move,
    /// A delete is staged.
    Delete,
}

impl From<MigrationKind> for MigrationState {
    fn from(kind: MigrationKind) -> Self {
        match kind {
            MigrationKind::Copy => Self::Copy,
            MigrationKind::Move => Self::Move,
            MigrationKind::Delete => Self::Delete,
        }
    }
}

/// At most one pending migration per archive view.
///
/// # Examples
///
/// ```
/// use polyarc_core::ArchiveEntry;
/// use polyarc_core::migration::{MigrationGuard, MigrationKind, MigrationState};
///
/// let mut guard = MigrationGuard::new();
/// assert!(guard.init_migration(MigrationKind::Copy, ArchiveEntry::file("a.txt")));
/// assert!(!guard.init_migration(MigrationKind::Move, ArchiveEntry::file("b.txt")));
/// assert_eq!(guard.state(), MigrationState::Copy);
/// assert_eq!(guard.entry().map(|e| e.path()), Some("a.txt"));
///
/// guard.clear();
/// assert_eq!(guard.state(), MigrationState::None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationGuard {
    state: MigrationState,
    entry: Option<ArchiveEntry>,
}

impl MigrationGuard {
    /// Creates an empty guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages `entry` for `kind`.
    ///
    /// Succeeds only when nothing is staged; otherwise the guard is unchanged
    /// and `false` is returned.
    pub fn init_migration(&mut self, kind: MigrationKind, entry: ArchiveEntry) -> bool {
        if self.state != MigrationState::None {
            return false;
        }
        self.state = kind.into();
        self.entry = Some(entry);
        true
    }

    /// Resets to `None`, from any state.
    pub fn clear(&mut self) {
        self.state = MigrationState::None;
        self.entry = None;
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> MigrationState {
        self.state
    }

    /// Staged entry.
    #[must_use]
    pub const fn entry(&self) -> Option<&ArchiveEntry> {
        self.entry.as_ref()
    }

    /// Whether something is staged.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state != MigrationState::None
    }
}
