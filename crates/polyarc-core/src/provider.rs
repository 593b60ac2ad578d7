//! The operation set every format plugin implements.
//!
//! Contract calls never return `Err`. Providers use [`Result`](crate::Result)
//! and `?` internally; [`guarded`] and [`guarded_list`] sit at the boundary,
//! run the body inside an [`OperationScope`](crate::events::OperationScope),
//! and turn an error into `false` (or an empty listing) plus an error event.

use std::path::Path;

use log::debug;
use log::error;

use crate::ArchiveError;
use crate::Result;
use crate::descriptor::ArchiveDescriptor;
use crate::entry::ArchiveEntry;
use crate::events::ErrorKind;
use crate::events::Session;
use crate::tree;

/// Reading or writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    /// list, extract, test.
    Read,
    /// create, add, delete.
    Write,
}

impl Capability {
    /// Both capabilities, in registration order.
    pub const ALL: [Self; 2] = [Self::Read, Self::Write];
}

/// Read capability of a provider.
pub trait ArchiveReader: Send + Sync {
    /// Extensions (lower-case, without the dot) this reader claims.
    fn extensions(&self) -> &[&'static str];

    /// Lists the archive.
    ///
    /// The result is normalized; on failure it is empty and an error event is
    /// emitted.
    fn list(&self, session: &Session<'_>, descriptor: &ArchiveDescriptor) -> Vec<ArchiveEntry>;

    /// Materializes `entry` at `destination`.
    ///
    /// A file entry is written to `destination`; a folder entry becomes the
    /// directory `destination` with its descendants beneath it. Existing files
    /// are overwritten.
    fn extract(
        &self,
        session: &Session<'_>,
        destination: &Path,
        descriptor: &ArchiveDescriptor,
        entry: &ArchiveEntry,
    ) -> bool;

    /// Verifies every checksum the format stores.
    fn test(&self, session: &Session<'_>, descriptor: &ArchiveDescriptor) -> bool;
}

/// Write capability of a provider.
pub trait ArchiveWriter: Send + Sync {
    /// Extensions (lower-case, without the dot) this writer claims.
    fn extensions(&self) -> &[&'static str];

    /// Builds a new archive from `entries`, replacing any file at the path
    /// only once the new archive is complete.
    fn create(
        &self,
        session: &Session<'_>,
        descriptor: &ArchiveDescriptor,
        entries: &[ArchiveEntry],
    ) -> bool;

    /// Adds `entries`; an entry whose path already exists replaces it.
    fn add(
        &self,
        session: &Session<'_>,
        descriptor: &ArchiveDescriptor,
        entries: &[ArchiveEntry],
    ) -> bool;

    /// Removes `entry` and, for a folder, every descendant.
    fn delete(&self, session: &Session<'_>, descriptor: &ArchiveDescriptor, entry: &ArchiveEntry)
    -> bool;
}

/// A format plugin.
pub trait FormatProvider: Send + Sync {
    /// Stable provider name, used as the priority configuration key.
    fn name(&self) -> &'static str;

    /// Read capability, if supported.
    fn reader(&self) -> Option<&dyn ArchiveReader>;

    /// Write capability, if supported.
    fn writer(&self) -> Option<&dyn ArchiveWriter>;

    /// Format tags this provider handles as single-payload compressors.
    fn compressor_only_formats(&self) -> &[&'static str] {
        &[]
    }

    /// Extensions claimed for `capability`.
    fn extensions(&self, capability: Capability) -> &[&'static str] {
        match capability {
            Capability::Read => self.reader().map(|reader| reader.extensions()),
            Capability::Write => self.writer().map(|writer| writer.extensions()),
        }
        .unwrap_or_default()
    }
}

/// Contract operation names, used for events and error titles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `list`
    List,
    /// `extract`
    Extract,
    /// `test`
    Test,
    /// `create`
    Create,
    /// `add`
    Add,
    /// `delete`
    Delete,
}

impl Operation {
    /// Progress label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::List => "Listing",
            Self::Extract => "Extracting",
            Self::Test => "Testing",
            Self::Create => "Creating",
            Self::Add => "Adding to",
            Self::Delete => "Deleting from",
        }
    }

    /// Lower-case operation name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Extract => "extract",
            Self::Test => "test",
            Self::Create => "create",
            Self::Add => "add",
            Self::Delete => "delete",
        }
    }

    /// Title of the error event when the operation fails.
    #[must_use]
    pub const fn failure_title(self) -> &'static str {
        match self {
            Self::List => "Cannot list archive",
            Self::Extract => "Cannot extract entry",
            Self::Test => "Archive test failed",
            Self::Create => "Cannot create archive",
            Self::Add => "Cannot add to archive",
            Self::Delete => "Cannot delete from archive",
        }
    }

    /// Whether the operation goes through rewrite-and-swap.
    #[must_use]
    pub const fn is_mutation(self) -> bool {
        matches!(self, Self::Create | Self::Add | Self::Delete)
    }

    /// Event kind for a failure of this operation.
    ///
    /// Unsupported stays unsupported; any other failure of a mutating
    /// operation is a mutation failure.
    #[must_use]
    pub const fn error_kind(self, err: &ArchiveError) -> ErrorKind {
        match err.kind() {
            ErrorKind::Unsupported => ErrorKind::Unsupported,
            _ if self.is_mutation() => ErrorKind::Mutation,
            kind => kind,
        }
    }
}

/// Runs a boolean contract operation.
///
/// Emits `Started`, runs `body`, converts an error into `false` plus an
/// error event and a log line, and emits `Completed` on every exit path.
pub fn guarded<F>(
    session: &Session<'_>,
    operation: Operation,
    descriptor: &ArchiveDescriptor,
    body: F,
) -> bool
where
    F: FnOnce() -> Result<()>,
{
    let _scope = session.begin(operation.label(), Some(descriptor));
    debug!("{} {descriptor} (session {})", operation.label(), session.id());
    match body() {
        Ok(()) => true,
        Err(err) => {
            report_failure(session, operation, descriptor, &err);
            false
        }
    }
}

/// Runs a listing; the result is normalized, or empty on failure.
pub fn guarded_list<F>(
    session: &Session<'_>,
    descriptor: &ArchiveDescriptor,
    body: F,
) -> Vec<ArchiveEntry>
where
    F: FnOnce() -> Result<Vec<ArchiveEntry>>,
{
    let _scope = session.begin(Operation::List.label(), Some(descriptor));
    debug!("Listing {descriptor} (session {})", session.id());
    match body() {
        Ok(raw) => tree::normalize(raw),
        Err(err) => {
            report_failure(session, Operation::List, descriptor, &err);
            Vec::new()
        }
    }
}

/// Logs `err` and emits the matching error event.
pub fn report_failure(
    session: &Session<'_>,
    operation: Operation,
    descriptor: &ArchiveDescriptor,
    err: &ArchiveError,
) {
    error!("{} failed for {}: {err}", operation.name(), descriptor.path().display());
    session.error(
        operation.error_kind(err),
        operation.failure_title(),
        err,
        Some(descriptor),
    );
}

/// Error for an operation a provider does not implement.
pub(crate) fn unsupported(operation: Operation, descriptor: &ArchiveDescriptor) -> ArchiveError {
    ArchiveError::Unsupported {
        operation: operation.name(),
        format: descriptor.format().to_string(),
    }
}
