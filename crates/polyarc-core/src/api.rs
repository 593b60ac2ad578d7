//! High-level entry points that resolve a provider from the descriptor's
//! format tag and invoke the contract.
//!
//! When no provider claims the format for the needed capability, the call
//! still behaves like a contract call: it emits `Started`, an `Unsupported`
//! error event and `Completed`, and returns `false` (or an empty listing).

use std::path::Path;

use crate::ArchiveError;
use crate::descriptor::ArchiveDescriptor;
use crate::entry::ArchiveEntry;
use crate::events::Session;
use crate::provider;
use crate::provider::ArchiveReader;
use crate::provider::ArchiveWriter;
use crate::provider::Operation;
use crate::registry::Registry;

fn unsupported_format(descriptor: &ArchiveDescriptor) -> ArchiveError {
    ArchiveError::UnsupportedFormat {
        format: descriptor.format().to_string(),
    }
}

fn reader<'r>(registry: &'r Registry, descriptor: &ArchiveDescriptor) -> Option<&'r dyn ArchiveReader> {
    registry.reader(descriptor.format())
}

fn writer<'r>(registry: &'r Registry, descriptor: &ArchiveDescriptor) -> Option<&'r dyn ArchiveWriter> {
    registry.writer(descriptor.format())
}

/// Lists the archive with the provider registered for its format.
///
/// # Examples
///
/// ```no_run
/// use polyarc_core::events::{NoopSink, Session, SessionId};
/// use polyarc_core::{ArchiveDescriptor, Registry, RegistryConfig, api};
///
/// let registry = Registry::with_default_providers(RegistryConfig::default())?;
/// let sink = NoopSink;
/// let session = Session::new(SessionId::new(1), &sink);
/// for entry in api::list(&registry, &session, &ArchiveDescriptor::new("site.tgz")) {
///     println!("{}", entry.path());
/// }
/// # Ok::<(), polyarc_core::ArchiveError>(())
/// ```
#[must_use]
pub fn list(registry: &Registry, session: &Session<'_>, descriptor: &ArchiveDescriptor) -> Vec<ArchiveEntry> {
    match reader(registry, descriptor) {
        Some(reader) => reader.list(session, descriptor),
        None => provider::guarded_list(session, descriptor, || Err(unsupported_format(descriptor))),
    }
}

/// Extracts `entry` to `destination`.
#[must_use]
pub fn extract(
    registry: &Registry,
    session: &Session<'_>,
    destination: &Path,
    descriptor: &ArchiveDescriptor,
    entry: &ArchiveEntry,
) -> bool {
    match reader(registry, descriptor) {
        Some(reader) => reader.extract(session, destination, descriptor, entry),
        None => provider::guarded(session, Operation::Extract, descriptor, || {
            Err(unsupported_format(descriptor))
        }),
    }
}

/// Verifies the archive's checksums.
#[must_use]
pub fn test(registry: &Registry, session: &Session<'_>, descriptor: &ArchiveDescriptor) -> bool {
    match reader(registry, descriptor) {
        Some(reader) => reader.test(session, descriptor),
        None => provider::guarded(session, Operation::Test, descriptor, || {
            Err(unsupported_format(descriptor))
        }),
    }
}

/// Creates a new archive from staged `entries`.
#[must_use]
pub fn create(
    registry: &Registry,
    session: &Session<'_>,
    descriptor: &ArchiveDescriptor,
    entries: &[ArchiveEntry],
) -> bool {
    match writer(registry, descriptor) {
        Some(writer) => writer.create(session, descriptor, entries),
        None => provider::guarded(session, Operation::Create, descriptor, || {
            Err(unsupported_format(descriptor))
        }),
    }
}

/// Adds staged `entries` to an existing archive.
#[must_use]
pub fn add(
    registry: &Registry,
    session: &Session<'_>,
    descriptor: &ArchiveDescriptor,
    entries: &[ArchiveEntry],
) -> bool {
    match writer(registry, descriptor) {
        Some(writer) => writer.add(session, descriptor, entries),
        None => provider::guarded(session, Operation::Add, descriptor, || {
            Err(unsupported_format(descriptor))
        }),
    }
}

/// Deletes `entry` (and its descendants, for a folder).
#[must_use]
pub fn delete(
    registry: &Registry,
    session: &Session<'_>,
    descriptor: &ArchiveDescriptor,
    entry: &ArchiveEntry,
) -> bool {
    match writer(registry, descriptor) {
        Some(writer) => writer.delete(session, descriptor, entry),
        None => provider::guarded(session, Operation::Delete, descriptor, || {
            Err(unsupported_format(descriptor))
        }),
    }
}
