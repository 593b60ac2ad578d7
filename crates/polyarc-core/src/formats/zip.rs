//! ZIP provider (read and write).
//!
//! Listing reads the central directory only, so encrypted archives list
//! without a password. Rewrites copy surviving members raw: their bytes,
//! CRCs and encryption are carried over without recompression.

use std::fs::File;
use std::io;
use std::io::Read;
use std::io::Seek;
use std::path::Path;
use std::time::SystemTime;

use chrono::DateTime;
use chrono::NaiveDateTime;
use chrono::Utc;
use zip::AesMode;
use zip::ZipArchive;
use zip::ZipWriter;
use zip::read::ZipFile;
use zip::unstable::write::FileOptionsExt;
use zip::write::FileOptions;

use crate::ArchiveError;
use crate::Result;
use crate::descriptor::ArchiveDescriptor;
use crate::descriptor::CompressionMethod;
use crate::descriptor::EncryptionMethod;
use crate::descriptor::EncryptionStrength;
use crate::entry::ArchiveEntry;
use crate::events::ProgressReader;
use crate::events::Session;
use crate::formats::common;
use crate::formats::common::CopyBuffer;
use crate::mutation;
use crate::mutation::MutationDelta;
use crate::mutation::MutationReport;
use crate::mutation::Rewriter;
use crate::provider;
use crate::provider::ArchiveReader;
use crate::provider::ArchiveWriter;
use crate::provider::FormatProvider;
use crate::provider::Operation;
use crate::tree;

const EXTENSIONS: &[&str] = &["zip"];

const S_IFMT: u32 = 0o170_000;
const S_IFLNK: u32 = 0o120_000;

/// ZIP archives via the `zip` crate.
///
/// # Examples
///
/// ```no_run
/// use polyarc_core::ArchiveDescriptor;
/// use polyarc_core::events::{NoopSink, Session, SessionId};
/// use polyarc_core::formats::ZipProvider;
/// use polyarc_core::provider::ArchiveReader;
///
/// let sink = NoopSink;
/// let session = Session::new(SessionId::new(1), &sink);
/// let entries = ZipProvider::new().list(&session, &ArchiveDescriptor::new("photos.zip"));
/// for entry in &entries {
///     println!("{} {}", entry.level(), entry.path());
/// }
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipProvider;

impl ZipProvider {
    /// Creates the provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn open(descriptor: &ArchiveDescriptor) -> Result<ZipArchive<File>> {
        Ok(ZipArchive::new(common::open_archive(descriptor)?)?)
    }

    fn list_entries(session: &Session<'_>, descriptor: &ArchiveDescriptor) -> Result<Vec<ArchiveEntry>> {
        let mut archive = Self::open(descriptor)?;
        let total = archive.len();
        let mut entries = Vec::with_capacity(total);
        for index in 0..total {
            let file = archive.by_index_raw(index)?;
            entries.push(to_entry(&file));
            session.progress(file.name(), progress_value(index + 1), progress_value(total));
        }
        Ok(entries)
    }

    fn extract_entry(
        session: &Session<'_>,
        destination: &Path,
        descriptor: &ArchiveDescriptor,
        selected: &ArchiveEntry,
    ) -> Result<()> {
        let mut archive = Self::open(descriptor)?;
        let password = descriptor.properties().password();
        let mut buffer = CopyBuffer::new();
        let mut found = false;

        for index in 0..archive.len() {
            let (name, is_dir, encrypted) = {
                let raw = archive.by_index_raw(index)?;
                (raw.name().to_string(), raw.is_dir(), raw.encrypted())
            };
            let Some(target) = common::extraction_target(selected, &name, destination)? else {
                continue;
            };
            found = true;

            if is_dir {
                std::fs::create_dir_all(&target)?;
                continue;
            }

            let mut file = match (encrypted, password) {
                (true, Some(password)) => {
                    archive.by_index_decrypt(index, password.expose().as_bytes())?
                }
                (true, None) => {
                    return Err(ArchiveError::Encrypted(format!(
                        "{name} needs a password"
                    )));
                }
                (false, _) => archive.by_index(index)?,
            };
            let mode = file.unix_mode().unwrap_or(0);
            if mode & S_IFMT == S_IFLNK {
                let mut link = String::new();
                file.read_to_string(&mut link)?;
                common::write_symlink(&link, &target)?;
            } else {
                let size = file.size();
                let mut reader = ProgressReader::new(&mut file, *session, name.as_str(), Some(size));
                common::write_file(&mut reader, &target, &mut buffer)?;
                drop(reader);
                common::apply_mode(&target, mode)?;
            }
        }

        if !found {
            return Err(ArchiveError::EntryNotFound {
                path: selected.path().to_string(),
            });
        }
        if selected.is_folder() {
            std::fs::create_dir_all(destination)?;
        }
        Ok(())
    }

    fn test_archive(session: &Session<'_>, descriptor: &ArchiveDescriptor) -> Result<()> {
        let mut archive = Self::open(descriptor)?;
        let password = descriptor.properties().password();
        let total = archive.len();
        let mut buffer = CopyBuffer::new();

        for index in 0..total {
            let (name, is_dir, encrypted) = {
                let raw = archive.by_index_raw(index)?;
                (raw.name().to_string(), raw.is_dir(), raw.encrypted())
            };
            session.progress(name.as_str(), progress_value(index + 1), progress_value(total));
            if is_dir {
                continue;
            }
            let mut file = match (encrypted, password) {
                (true, Some(password)) => {
                    archive.by_index_decrypt(index, password.expose().as_bytes())?
                }
                (true, None) => {
                    return Err(ArchiveError::Encrypted(format!(
                        "{name} needs a password to be tested"
                    )));
                }
                (false, _) => archive.by_index(index)?,
            };
            buffer
                .copy(&mut file, &mut io::sink())
                .map_err(|e| ArchiveError::IntegrityFailure {
                    path: name.clone(),
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }
}

fn to_entry<R: Read>(file: &ZipFile<'_, R>) -> ArchiveEntry {
    let name = file.name();
    let base = if file.is_dir() {
        ArchiveEntry::folder(name)
    } else {
        ArchiveEntry::file(name)
    };
    let modified = file.last_modified().and_then(system_time);
    base.with_hash(format!("{:08x}", file.crc32()))
        .with_sizes(file.compressed_size(), file.size())
        .with_modified(modified)
        .with_attributes(file.unix_mode().unwrap_or(0))
        .with_comment(file.comment())
        .with_encrypted(file.encrypted())
}

fn progress_value(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

const fn aes_mode(strength: EncryptionStrength) -> AesMode {
    match strength {
        EncryptionStrength::Aes128 => AesMode::Aes128,
        EncryptionStrength::Aes192 => AesMode::Aes192,
        EncryptionStrength::Aes256 => AesMode::Aes256,
    }
}

/// Member options derived from the descriptor.
fn base_options(descriptor: &ArchiveDescriptor) -> FileOptions<'_, ()> {
    let level = descriptor.compression_level();
    let properties = descriptor.properties();
    let mut options: FileOptions<'_, ()> =
        if level == 0 || properties.compression_method == CompressionMethod::Stored {
            FileOptions::default().compression_method(zip::CompressionMethod::Stored)
        } else {
            FileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated)
                .compression_level(Some(i64::from(level)))
        };
    if let Some(password) = properties.write_password() {
        options = match properties.encryption.method {
            EncryptionMethod::Aes => {
                options.with_aes_encryption(aes_mode(properties.encryption.strength), password.expose())
            }
            EncryptionMethod::ZipCrypto => {
                options.with_deprecated_encryption(password.expose().as_bytes())
            }
        };
    }
    options
}

/// Zip stores local time without a zone; it is read and written as UTC.
fn system_time(time: zip::DateTime) -> Option<SystemTime> {
    NaiveDateTime::try_from(time)
        .ok()
        .map(|naive| SystemTime::from(naive.and_utc()))
}

fn zip_time(time: Option<SystemTime>) -> Option<zip::DateTime> {
    let naive = DateTime::<Utc>::from(time?).naive_utc();
    zip::DateTime::try_from(naive).ok()
}

fn append<W: io::Write + Seek>(
    writer: &mut ZipWriter<W>,
    session: &Session<'_>,
    options: FileOptions<'_, ()>,
    entry: &ArchiveEntry,
    buffer: &mut CopyBuffer,
) -> Result<()> {
    let mut options = options;
    if let Some(modified) = zip_time(entry.modified()) {
        options = options.last_modified_time(modified);
    }

    if entry.is_folder() {
        writer.add_directory(format!("{}/", entry.path()), options)?;
        return Ok(());
    }

    if let Some(target) = entry.symlink_target() {
        writer.start_file(entry.path(), options.unix_permissions(S_IFLNK | 0o777))?;
        io::Write::write_all(writer, target.as_bytes())?;
        return Ok(());
    }

    let source = entry.source_path().ok_or_else(|| ArchiveError::MissingSource {
        path: entry.path().to_string(),
    })?;
    let file = File::open(&source)?;
    let metadata = file.metadata()?;
    let mode = if entry.attributes() & 0o777 == 0 {
        0o644
    } else {
        entry.attributes() & 0o7777
    };
    let options = options
        .unix_permissions(mode)
        .large_file(metadata.len() >= u64::from(u32::MAX));
    writer.start_file(entry.path(), options)?;
    let mut reader = ProgressReader::new(file, *session, entry.path(), Some(metadata.len()));
    buffer.copy(&mut reader, writer)?;
    Ok(())
}

impl Rewriter for ZipProvider {
    fn rewrite(
        &self,
        session: &Session<'_>,
        descriptor: &ArchiveDescriptor,
        source: Option<&Path>,
        successor: &Path,
        delta: &MutationDelta,
    ) -> Result<MutationReport> {
        common::reject_split(descriptor)?;
        let mut writer = ZipWriter::new(File::create(successor)?);
        let mut report = MutationReport::default();

        if let Some(source) = source {
            let mut original = ZipArchive::new(File::open(source)?)?;
            let total = original.len();
            for index in 0..total {
                let file = original.by_index_raw(index)?;
                let name = tree::normalize_path(file.name());
                session.progress(name.as_str(), progress_value(index + 1), progress_value(total));
                if delta.drops(&name) {
                    report.removed += 1;
                    continue;
                }
                writer.raw_copy_file(file)?;
                report.kept += 1;
            }
        }

        let options = base_options(descriptor);
        let mut buffer = CopyBuffer::new();
        for entry in delta.additions() {
            append(&mut writer, session, options, entry, &mut buffer)?;
            report.added += 1;
        }

        writer.finish()?.sync_all()?;
        Ok(report)
    }
}

impl ArchiveReader for ZipProvider {
    fn extensions(&self) -> &[&'static str] {
        EXTENSIONS
    }

    fn list(&self, session: &Session<'_>, descriptor: &ArchiveDescriptor) -> Vec<ArchiveEntry> {
        provider::guarded_list(session, descriptor, || Self::list_entries(session, descriptor))
    }

    fn extract(
        &self,
        session: &Session<'_>,
        destination: &Path,
        descriptor: &ArchiveDescriptor,
        entry: &ArchiveEntry,
    ) -> bool {
        provider::guarded(session, Operation::Extract, descriptor, || {
            Self::extract_entry(session, destination, descriptor, entry)
        })
    }

    fn test(&self, session: &Session<'_>, descriptor: &ArchiveDescriptor) -> bool {
        provider::guarded(session, Operation::Test, descriptor, || {
            Self::test_archive(session, descriptor)
        })
    }
}

impl ArchiveWriter for ZipProvider {
    fn extensions(&self) -> &[&'static str] {
        EXTENSIONS
    }

    fn create(
        &self,
        session: &Session<'_>,
        descriptor: &ArchiveDescriptor,
        entries: &[ArchiveEntry],
    ) -> bool {
        provider::guarded(session, Operation::Create, descriptor, || {
            mutation::create(self, session, descriptor, entries).map(drop)
        })
    }

    fn add(
        &self,
        session: &Session<'_>,
        descriptor: &ArchiveDescriptor,
        entries: &[ArchiveEntry],
    ) -> bool {
        provider::guarded(session, Operation::Add, descriptor, || {
            mutation::apply(self, session, descriptor, &MutationDelta::add(entries)).map(drop)
        })
    }

    fn delete(&self, session: &Session<'_>, descriptor: &ArchiveDescriptor, entry: &ArchiveEntry) -> bool {
        provider::guarded(session, Operation::Delete, descriptor, || {
            mutation::apply(self, session, descriptor, &MutationDelta::delete(entry)).map(drop)
        })
    }
}

impl FormatProvider for ZipProvider {
    fn name(&self) -> &'static str {
        "zip"
    }

    fn reader(&self) -> Option<&dyn ArchiveReader> {
        Some(self)
    }

    fn writer(&self) -> Option<&dyn ArchiveWriter> {
        Some(self)
    }
}
