//! Compressor-only formats: `gz`, `bz2`, `xz`, `zst`.
//!
//! These hold exactly one payload and no directory. Listing yields a single
//! synthetic entry, tagged as a nested archive, named after the wrapped file.
//! `create` compresses one input; `add` and `delete` are unsupported.

use std::fs::File;
use std::io;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::path::Path;

use log::warn;

use crate::ArchiveError;
use crate::Result;
use crate::descriptor::ArchiveDescriptor;
use crate::entry::ArchiveEntry;
use crate::events::ProgressReader;
use crate::events::Session;
use crate::formats::common;
use crate::formats::common::CopyBuffer;
use crate::formats::compression::CompressionCodec;
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

const EXTENSIONS: &[&str] = &["gz", "bz2", "xz", "zst"];

/// Single-stream compressors.
///
/// # Examples
///
/// ```no_run
/// use polyarc_core::ArchiveDescriptor;
/// use polyarc_core::events::{NoopSink, Session, SessionId};
/// use polyarc_core::formats::CompressorProvider;
/// use polyarc_core::provider::ArchiveReader;
///
/// let sink = NoopSink;
/// let session = Session::new(SessionId::new(1), &sink);
/// let entries = CompressorProvider::new().list(&session, &ArchiveDescriptor::new("backup.tar.gz"));
/// assert_eq!(entries[0].path(), "backup.tar");
/// assert!(entries[0].is_nested_archive());
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct CompressorProvider;

impl CompressorProvider {
    /// Creates the provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn codec_for(descriptor: &ArchiveDescriptor) -> Result<CompressionCodec> {
    CompressionCodec::from_extension(descriptor.format()).ok_or_else(|| {
        ArchiveError::UnsupportedFormat {
            format: descriptor.format().to_string(),
        }
    })
}

/// Uncompressed size from the gzip `ISIZE` trailer (size mod 2^32).
fn gzip_isize(file: &mut File) -> io::Result<u64> {
    if file.metadata()?.len() < 18 {
        return Ok(0);
    }
    file.seek(SeekFrom::End(-4))?;
    let mut trailer = [0u8; 4];
    file.read_exact(&mut trailer)?;
    Ok(u64::from(u32::from_le_bytes(trailer)))
}

fn payload_entry(descriptor: &ArchiveDescriptor) -> Result<ArchiveEntry> {
    let codec = codec_for(descriptor)?;
    let mut file = common::open_archive(descriptor)?;
    let metadata = file.metadata()?;
    let raw_size = match codec {
        CompressionCodec::Gzip => gzip_isize(&mut file)?,
        _ => 0,
    };
    Ok(tree::nested_archive_entry(
        &descriptor.file_name(),
        descriptor.format(),
        metadata.len(),
        raw_size,
    )
    .with_modified(metadata.modified().ok()))
}

fn extract_payload(
    session: &Session<'_>,
    destination: &Path,
    descriptor: &ArchiveDescriptor,
    selected: &ArchiveEntry,
) -> Result<()> {
    let payload = payload_entry(descriptor)?;
    if selected.path() != payload.path() {
        return Err(ArchiveError::EntryNotFound {
            path: selected.path().to_string(),
        });
    }
    let codec = codec_for(descriptor)?;
    let file = common::open_archive(descriptor)?;
    let packed = ProgressReader::new(
        BufReader::new(file),
        *session,
        payload.path(),
        Some(payload.packed_size()),
    );
    let mut decoder = codec.decoder(packed)?;
    common::write_file(&mut decoder, destination, &mut CopyBuffer::new())?;
    Ok(())
}

fn test_payload(session: &Session<'_>, descriptor: &ArchiveDescriptor) -> Result<()> {
    let codec = codec_for(descriptor)?;
    let file = common::open_archive(descriptor)?;
    let size = file.metadata()?.len();
    let name = descriptor.file_name();
    let packed = ProgressReader::new(BufReader::new(file), *session, name.as_str(), Some(size));
    let mut decoder = codec.decoder(packed)?;
    CopyBuffer::new()
        .copy(&mut decoder, &mut io::sink())
        .map_err(|e| ArchiveError::IntegrityFailure {
            path: name,
            reason: e.to_string(),
        })?;
    Ok(())
}

/// Picks the input to compress: the first non-folder addition.
fn choose_input(additions: &[ArchiveEntry]) -> Option<&ArchiveEntry> {
    let mut files = additions.iter().filter(|entry| !entry.is_folder());
    let first = files.next();
    let ignored = files.count() + additions.iter().filter(|entry| entry.is_folder()).count();
    if ignored > 0 {
        warn!("compressor-only archive takes one input; ignoring {ignored} more");
    }
    first
}

impl Rewriter for CompressorProvider {
    fn rewrite(
        &self,
        session: &Session<'_>,
        descriptor: &ArchiveDescriptor,
        source: Option<&Path>,
        successor: &Path,
        delta: &MutationDelta,
    ) -> Result<MutationReport> {
        if source.is_some() || !delta.removals().is_empty() {
            return Err(provider::unsupported(Operation::Add, descriptor));
        }
        common::reject_split(descriptor)?;
        if descriptor.properties().write_password().is_some() {
            return Err(ArchiveError::Unsupported {
                operation: "encryption",
                format: descriptor.format().to_string(),
            });
        }

        let codec = codec_for(descriptor)?;
        let writer = BufWriter::new(File::create(successor)?);
        let mut encoder = codec.encoder(writer, descriptor.compression_level())?;
        let mut report = MutationReport::default();

        if let Some(input) = choose_input(delta.additions()) {
            let path = input.source_path().ok_or_else(|| ArchiveError::MissingSource {
                path: input.path().to_string(),
            })?;
            let file = File::open(&path)?;
            let size = file.metadata()?.len();
            let mut reader = ProgressReader::new(file, *session, input.path(), Some(size));
            CopyBuffer::new().copy(&mut reader, &mut encoder)?;
            report.added = 1;
        }

        let writer = encoder.finish()?;
        let file = writer.into_inner().map_err(io::IntoInnerError::into_error)?;
        file.sync_all()?;
        Ok(report)
    }
}

impl ArchiveReader for CompressorProvider {
    fn extensions(&self) -> &[&'static str] {
        EXTENSIONS
    }

    fn list(&self, session: &Session<'_>, descriptor: &ArchiveDescriptor) -> Vec<ArchiveEntry> {
        provider::guarded_list(session, descriptor, || {
            payload_entry(descriptor).map(|entry| vec![entry])
        })
    }

    fn extract(
        &self,
        session: &Session<'_>,
        destination: &Path,
        descriptor: &ArchiveDescriptor,
        entry: &ArchiveEntry,
    ) -> bool {
        provider::guarded(session, Operation::Extract, descriptor, || {
            extract_payload(session, destination, descriptor, entry)
        })
    }

    fn test(&self, session: &Session<'_>, descriptor: &ArchiveDescriptor) -> bool {
        provider::guarded(session, Operation::Test, descriptor, || {
            test_payload(session, descriptor)
        })
    }
}

impl ArchiveWriter for CompressorProvider {
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
        _entries: &[ArchiveEntry],
    ) -> bool {
        provider::guarded(session, Operation::Add, descriptor, || {
            Err(provider::unsupported(Operation::Add, descriptor))
        })
    }

    fn delete(&self, session: &Session<'_>, descriptor: &ArchiveDescriptor, _entry: &ArchiveEntry) -> bool {
        provider::guarded(session, Operation::Delete, descriptor, || {
            Err(provider::unsupported(Operation::Delete, descriptor))
        })
    }
}

impl FormatProvider for CompressorProvider {
    fn name(&self) -> &'static str {
        "compressor"
    }

    fn reader(&self) -> Option<&dyn ArchiveReader> {
        Some(self)
    }

    fn writer(&self) -> Option<&dyn ArchiveWriter> {
        Some(self)
    }

    fn compressor_only_formats(&self) -> &[&'static str] {
        EXTENSIONS
    }
}
