//! 7z provider (read-only).
//!
//! Listing parses the header only. Extraction and testing go through the
//! `sevenz-rust2` callback API, which decodes every folder in order and
//! hands each member to the callback as a CRC-verifying reader.
//!
//! # Limitations
//!
//! - No write support: 7z is not in this provider's writer set.
//! - Unix symlinks are indistinguishable from regular files and come out as
//!   files holding the link target.

use std::fs;
use std::io;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use sevenz_rust2::Archive;
use sevenz_rust2::Password as SevenZPassword;

use crate::ArchiveError;
use crate::Result;
use crate::descriptor::ArchiveDescriptor;
use crate::entry::ArchiveEntry;
use crate::events::INDETERMINATE;
use crate::events::ProgressReader;
use crate::events::Session;
use crate::formats::common;
use crate::formats::common::CopyBuffer;
use crate::provider;
use crate::provider::ArchiveReader;
use crate::provider::ArchiveWriter;
use crate::provider::FormatProvider;
use crate::provider::Operation;

const EXTENSIONS: &[&str] = &["7z"];

/// Set in `windows_attributes` when the high 16 bits hold a Unix mode.
const FILE_ATTRIBUTE_UNIX_EXTENSION: u32 = 0x8000;

/// 7z archives via `sevenz-rust2`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SevenZProvider;

impl SevenZProvider {
    /// Creates the provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn password(descriptor: &ArchiveDescriptor) -> SevenZPassword {
    descriptor
        .properties()
        .password()
        .map_or_else(SevenZPassword::empty, |password| {
            SevenZPassword::from(password.expose())
        })
}

fn map_error(err: sevenz_rust2::Error) -> ArchiveError {
    match err {
        sevenz_rust2::Error::PasswordRequired => {
            ArchiveError::Encrypted("7z archive needs a password".into())
        }
        sevenz_rust2::Error::MaybeBadPassword(inner) => {
            ArchiveError::Encrypted(format!("wrong password or corrupted data: {inner}"))
        }
        other => {
            let message = other.to_string();
            let lower = message.to_lowercase();
            if lower.contains("checksum") || lower.contains("crc") {
                ArchiveError::IntegrityFailure {
                    path: String::new(),
                    reason: message,
                }
            } else {
                ArchiveError::InvalidArchive(format!("7z error: {message}"))
            }
        }
    }
}

fn to_entry(file: &sevenz_rust2::ArchiveEntry) -> ArchiveEntry {
    let base = if file.is_directory() {
        ArchiveEntry::folder(&file.name)
    } else {
        ArchiveEntry::file(&file.name)
    };
    let attributes = if file.has_windows_attributes {
        if file.windows_attributes & FILE_ATTRIBUTE_UNIX_EXTENSION == 0 {
            file.windows_attributes
        } else {
            file.windows_attributes >> 16
        }
    } else {
        0
    };
    let mut entry = base
        .with_sizes(file.compressed_size, file.size)
        .with_modified(file.has_last_modified_date.then(|| file.last_modified_date.into()))
        .with_created(file.has_creation_date.then(|| file.creation_date.into()))
        .with_accessed(file.has_access_date.then(|| file.access_date.into()))
        .with_attributes(attributes);
    if file.has_crc {
        entry = entry.with_hash(format!("{:08x}", file.crc));
    }
    entry
}

fn list_entries(session: &Session<'_>, descriptor: &ArchiveDescriptor) -> Result<Vec<ArchiveEntry>> {
    let mut source = common::open_archive(descriptor)?;
    let archive = Archive::read(&mut source, &password(descriptor)).map_err(map_error)?;
    let total = i64::try_from(archive.files.len()).unwrap_or(i64::MAX);
    let mut entries = Vec::with_capacity(archive.files.len());
    for (index, file) in archive.files.iter().enumerate() {
        if file.is_anti_item {
            continue;
        }
        session.progress(file.name.as_str(), i64::try_from(index + 1).unwrap_or(total), total);
        entries.push(to_entry(file));
    }
    Ok(entries)
}

/// Runs the decoder over every member, calling `visit` with a verifying
/// reader. The first error `visit` returns wins over the decoder's own.
fn for_each_member<F>(descriptor: &ArchiveDescriptor, destination: &Path, mut visit: F) -> Result<()>
where
    F: FnMut(&sevenz_rust2::ArchiveEntry, &mut dyn Read) -> Result<()>,
{
    let source = common::open_archive(descriptor)?;
    let mut failure: Option<ArchiveError> = None;
    let extract_fn = |entry: &sevenz_rust2::ArchiveEntry,
                      reader: &mut dyn Read,
                      _dest: &PathBuf|
     -> std::result::Result<bool, sevenz_rust2::Error> {
        match visit(entry, reader) {
            Ok(()) => Ok(true),
            Err(err) => {
                let message = err.to_string();
                failure = Some(err);
                Err(sevenz_rust2::Error::Other(message.into()))
            }
        }
    };

    let result = match descriptor.properties().password() {
        Some(password) => sevenz_rust2::decompress_with_extract_fn_and_password(
            source,
            destination,
            SevenZPassword::from(password.expose()),
            extract_fn,
        ),
        None => sevenz_rust2::decompress_with_extract_fn(source, destination, extract_fn),
    };
    match (failure, result) {
        (Some(err), _) => Err(err),
        (None, Err(err)) => Err(map_error(err)),
        (None, Ok(())) => Ok(()),
    }
}

fn extract_entry(
    session: &Session<'_>,
    destination: &Path,
    descriptor: &ArchiveDescriptor,
    selected: &ArchiveEntry,
) -> Result<()> {
    let mut buffer = CopyBuffer::new();
    let mut found = false;
    let scratch_root = destination.parent().unwrap_or(destination);

    for_each_member(descriptor, scratch_root, |member, reader| {
        if member.is_anti_item {
            return Ok(());
        }
        let Some(target) = common::extraction_target(selected, &member.name, destination)? else {
            return Ok(());
        };
        found = true;
        if member.is_directory() {
            fs::create_dir_all(&target)?;
            return Ok(());
        }
        let mut reader = ProgressReader::new(reader, *session, member.name.as_str(), Some(member.size));
        common::write_file(&mut reader, &target, &mut buffer)?;
        Ok(())
    })?;

    if !found {
        return Err(ArchiveError::EntryNotFound {
            path: selected.path().to_string(),
        });
    }
    if selected.is_folder() {
        fs::create_dir_all(destination)?;
    }
    Ok(())
}

fn test_archive(session: &Session<'_>, descriptor: &ArchiveDescriptor) -> Result<()> {
    let mut buffer = CopyBuffer::new();
    let scratch_root = descriptor
        .path()
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    for_each_member(descriptor, &scratch_root, |member, reader| {
        session.progress(member.name.as_str(), INDETERMINATE, INDETERMINATE);
        buffer
            .copy(reader, &mut io::sink())
            .map_err(|e| ArchiveError::IntegrityFailure {
                path: member.name.clone(),
                reason: e.to_string(),
            })?;
        Ok(())
    })
    .map_err(|err| match err {
        ArchiveError::IntegrityFailure { path, reason } if path.is_empty() => {
            ArchiveError::IntegrityFailure {
                path: descriptor.file_name(),
                reason,
            }
        }
        other => other,
    })
}

impl ArchiveReader for SevenZProvider {
    fn extensions(&self) -> &[&'static str] {
        EXTENSIONS
    }

    fn list(&self, session: &Session<'_>, descriptor: &ArchiveDescriptor) -> Vec<ArchiveEntry> {
        provider::guarded_list(session, descriptor, || list_entries(session, descriptor))
    }

    fn extract(
        &self,
        session: &Session<'_>,
        destination: &Path,
        descriptor: &ArchiveDescriptor,
        entry: &ArchiveEntry,
    ) -> bool {
        provider::guarded(session, Operation::Extract, descriptor, || {
            extract_entry(session, destination, descriptor, entry)
        })
    }

    fn test(&self, session: &Session<'_>, descriptor: &ArchiveDescriptor) -> bool {
        provider::guarded(session, Operation::Test, descriptor, || {
            test_archive(session, descriptor)
        })
    }
}

impl FormatProvider for SevenZProvider {
    fn name(&self) -> &'static str {
        "7z"
    }

    fn reader(&self) -> Option<&dyn ArchiveReader> {
        Some(self)
    }

    fn writer(&self) -> Option<&dyn ArchiveWriter> {
        None
    }
}
