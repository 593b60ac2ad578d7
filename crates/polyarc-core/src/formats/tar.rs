//! Tar provider, plain and codec-compressed (`tgz`, `tbz2`, `txz`, `tzst`).
//!
//! Tar has no central directory, so every operation is a single forward pass
//! over the (decompressed) stream. Integrity comes from two layers: each
//! header carries its own checksum, and the outer codec verifies its trailer
//! once the stream is drained to the end.
//!
//! Rewrites carry pax records of untouched members over. A hard link is
//! extracted as a copy of its target, and a delete that would leave a kept
//! hard link without its target is refused.

use std::collections::HashMap;
use std::fs;
use std::fs::File;
use std::io;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use log::debug;
use tar::EntryType;
use tar::Header;

use crate::ArchiveError;
use crate::Result;
use crate::descriptor::ArchiveDescriptor;
use crate::entry::ArchiveEntry;
use crate::entry::property;
use crate::events::INDETERMINATE;
use crate::events::ProgressReader;
use crate::events::Session;
use crate::formats::common;
use crate::formats::common::CopyBuffer;
use crate::formats::compression::CompressionCodec;
use crate::formats::compression::Encoder;
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

const EXTENSIONS: &[&str] = &["tar", "tgz", "tbz2", "tbz", "txz", "tzst"];

/// Tar archives via the `tar` crate, with the outer codec picked from the
/// extension.
#[derive(Debug, Default, Clone, Copy)]
pub struct TarProvider;

impl TarProvider {
    /// Creates the provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn codec_for(descriptor: &ArchiveDescriptor) -> Option<CompressionCodec> {
    CompressionCodec::from_extension(descriptor.format())
}

fn open_stream(path: &Path, codec: Option<CompressionCodec>) -> Result<Box<dyn Read>> {
    let file = File::open(path).map_err(|e| {
        ArchiveError::Io(io::Error::new(
            e.kind(),
            format!("cannot open {}: {e}", path.display()),
        ))
    })?;
    let reader = BufReader::new(file);
    Ok(match codec {
        Some(codec) => codec.decoder(reader)?,
        None => Box::new(reader),
    })
}

fn open_archive(descriptor: &ArchiveDescriptor) -> Result<tar::Archive<Box<dyn Read>>> {
    Ok(tar::Archive::new(open_stream(
        descriptor.path(),
        codec_for(descriptor),
    )?))
}

/// Pax global headers carry no member.
fn is_metadata_only(kind: EntryType) -> bool {
    matches!(kind, EntryType::XGlobalHeader | EntryType::XHeader)
}

fn entry_name<R: Read>(entry: &tar::Entry<'_, R>) -> String {
    String::from_utf8_lossy(&entry.path_bytes()).into_owned()
}

fn to_entry<R: Read>(entry: &tar::Entry<'_, R>) -> ArchiveEntry {
    let header = entry.header();
    let name = entry_name(entry);
    let base = if header.entry_type().is_dir() {
        ArchiveEntry::folder(&name)
    } else {
        ArchiveEntry::file(&name)
    };
    let owner = |value: std::result::Result<Option<&str>, std::str::Utf8Error>| {
        value
            .ok()
            .flatten()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    };
    let size = entry.size();
    let mut out = base
        .with_sizes(size, size)
        .with_modified(header.mtime().ok().and_then(common::from_unix_seconds))
        .with_owner(owner(header.username()), owner(header.groupname()))
        .with_attributes(header.mode().unwrap_or(0));
    if header.entry_type().is_symlink()
        && let Some(target) = entry.link_name_bytes()
    {
        out = out.with_property(property::SYMLINK_TARGET, String::from_utf8_lossy(&target));
    }
    out
}

fn list_entries(session: &Session<'_>, descriptor: &ArchiveDescriptor) -> Result<Vec<ArchiveEntry>> {
    let mut archive = open_archive(descriptor)?;
    let mut entries = Vec::new();
    for entry in archive.entries()? {
        let entry = entry?;
        if is_metadata_only(entry.header().entry_type()) {
            continue;
        }
        let listed = to_entry(&entry);
        session.progress(listed.path(), INDETERMINATE, INDETERMINATE);
        entries.push(listed);
    }
    Ok(entries)
}

fn extract_entry(
    session: &Session<'_>,
    destination: &Path,
    descriptor: &ArchiveDescriptor,
    selected: &ArchiveEntry,
) -> Result<()> {
    let mut archive = open_archive(descriptor)?;
    let mut buffer = CopyBuffer::new();
    let mut written: HashMap<String, PathBuf> = HashMap::new();
    let mut pending: Vec<(String, PathBuf)> = Vec::new();
    let mut found = false;

    for entry in archive.entries()? {
        let mut entry = entry?;
        let kind = entry.header().entry_type();
        if is_metadata_only(kind) {
            continue;
        }
        let name = entry_name(&entry);
        let Some(target) = common::extraction_target(selected, &name, destination)? else {
            continue;
        };
        found = true;

        match kind {
            EntryType::Directory => fs::create_dir_all(&target)?,
            EntryType::Symlink => {
                let link = entry
                    .link_name_bytes()
                    .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                    .unwrap_or_default();
                common::write_symlink(&link, &target)?;
            }
            EntryType::Link => {
                let source = entry
                    .link_name_bytes()
                    .map(|bytes| tree::normalize_path(&String::from_utf8_lossy(&bytes)));
                let Some(source) = source else {
                    return Err(ArchiveError::InvalidArchive(format!(
                        "hard link {name} has no target"
                    )));
                };
                match written.get(&source) {
                    Some(existing) => copy_link(existing, &target)?,
                    None => pending.push((source, target)),
                }
            }
            EntryType::Char | EntryType::Block | EntryType::Fifo => {
                debug!("skipping special file {name}");
            }
            _ => {
                let mode = entry.header().mode().unwrap_or(0);
                let size = entry.size();
                {
                    let mut reader = ProgressReader::new(&mut entry, *session, name.as_str(), Some(size));
                    common::write_file(&mut reader, &target, &mut buffer)?;
                }
                common::apply_mode(&target, mode)?;
                written.insert(tree::normalize_path(&name), target);
            }
        }
    }

    if !found {
        return Err(ArchiveError::EntryNotFound {
            path: selected.path().to_string(),
        });
    }
    resolve_hard_links(session, descriptor, &written, pending)?;
    if selected.is_folder() {
        fs::create_dir_all(destination)?;
    }
    Ok(())
}

fn copy_link(existing: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(existing, target)?;
    Ok(())
}

/// Materializes hard links whose target member was outside the selection.
///
/// Targets written later in the first pass are copied; the rest are streamed
/// from a second pass over the archive.
fn resolve_hard_links(
    session: &Session<'_>,
    descriptor: &ArchiveDescriptor,
    written: &HashMap<String, PathBuf>,
    pending: Vec<(String, PathBuf)>,
) -> Result<()> {
    let mut missing: HashMap<String, Vec<PathBuf>> = HashMap::new();
    for (source, target) in pending {
        match written.get(&source) {
            Some(existing) => copy_link(existing, &target)?,
            None => missing.entry(source).or_default().push(target),
        }
    }
    if missing.is_empty() {
        return Ok(());
    }

    let mut archive = open_archive(descriptor)?;
    let mut buffer = CopyBuffer::new();
    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = entry_name(&entry);
        let Some(targets) = missing.remove(&tree::normalize_path(&name)) else {
            continue;
        };
        let mode = entry.header().mode().unwrap_or(0);
        let size = entry.size();
        let (first, rest) = targets.split_first().ok_or_else(|| ArchiveError::EntryNotFound {
            path: name.clone(),
        })?;
        {
            let mut reader = ProgressReader::new(&mut entry, *session, name.as_str(), Some(size));
            common::write_file(&mut reader, first, &mut buffer)?;
        }
        common::apply_mode(first, mode)?;
        for target in rest {
            copy_link(first, target)?;
        }
        if missing.is_empty() {
            break;
        }
    }

    match missing.into_keys().next() {
        Some(path) => Err(ArchiveError::EntryNotFound { path }),
        None => Ok(()),
    }
}

fn integrity(path: &str, err: &io::Error) -> ArchiveError {
    ArchiveError::IntegrityFailure {
        path: path.to_string(),
        reason: err.to_string(),
    }
}

fn test_archive(session: &Session<'_>, descriptor: &ArchiveDescriptor) -> Result<()> {
    let archive_name = descriptor.file_name();
    let mut archive = open_archive(descriptor)?;
    let mut buffer = CopyBuffer::new();

    {
        let entries = archive
            .entries()
            .map_err(|e| integrity(&archive_name, &e))?;
        for entry in entries {
            let mut entry = entry.map_err(|e| integrity(&archive_name, &e))?;
            let name = entry_name(&entry);
            session.progress(name.as_str(), INDETERMINATE, INDETERMINATE);
            buffer
                .copy(&mut entry, &mut io::sink())
                .map_err(|e| integrity(&name, &e))?;
        }
    }

    // The tar reader stops at the end-of-archive blocks; the codec trailer
    // is only checked once the rest of the stream is consumed.
    let mut rest = archive.into_inner();
    buffer
        .copy(&mut rest, &mut io::sink())
        .map_err(|e| integrity(&archive_name, &e))?;
    Ok(())
}

fn folder_header(entry: &ArchiveEntry) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Directory);
    header.set_size(0);
    header.set_mode(0o755);
    header.set_mtime(entry.modified().and_then(common::unix_seconds).unwrap_or(0));
    header
}

fn append<W: io::Write>(
    builder: &mut tar::Builder<W>,
    session: &Session<'_>,
    entry: &ArchiveEntry,
) -> Result<()> {
    if entry.is_folder() {
        let mut header = folder_header(entry);
        builder.append_data(&mut header, entry.path(), io::empty())?;
        return Ok(());
    }

    if let Some(target) = entry.symlink_target() {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Symlink);
        header.set_size(0);
        header.set_mode(0o777);
        header.set_mtime(entry.modified().and_then(common::unix_seconds).unwrap_or(0));
        builder.append_link(&mut header, entry.path(), target)?;
        return Ok(());
    }

    let source = entry.source_path().ok_or_else(|| ArchiveError::MissingSource {
        path: entry.path().to_string(),
    })?;
    let file = File::open(&source)?;
    let metadata = file.metadata()?;
    let mut header = Header::new_gnu();
    header.set_metadata(&metadata);
    header.set_entry_type(EntryType::Regular);
    header.set_size(metadata.len());
    if entry.attributes() & 0o7777 != 0 {
        header.set_mode(entry.attributes() & 0o7777);
    }
    if let Some(mtime) = entry.modified().and_then(common::unix_seconds) {
        header.set_mtime(mtime);
    }
    let reader = ProgressReader::new(file, *session, entry.path(), Some(metadata.len()));
    builder.append_data(&mut header, entry.path(), reader)?;
    Ok(())
}

/// Pax records of `entry` that the builder does not regenerate from the
/// header and member name (xattrs, sub-second times and the like).
fn pax_records<R: Read>(entry: &mut tar::Entry<'_, R>) -> Result<Vec<(String, Vec<u8>)>> {
    let Some(extensions) = entry.pax_extensions()? else {
        return Ok(Vec::new());
    };
    let mut records = Vec::new();
    for extension in extensions {
        let extension = extension?;
        let Ok(key) = extension.key() else {
            continue;
        };
        if matches!(key, "path" | "linkpath" | "size") {
            continue;
        }
        records.push((key.to_string(), extension.value_bytes().to_vec()));
    }
    Ok(records)
}

/// Whether a removal in `delta` covers the member stored under `raw_path`.
fn removes(delta: &MutationDelta, raw_path: &str) -> bool {
    let path = tree::normalize_path(raw_path);
    delta.removals().iter().any(|entry| entry.covers(&path))
}

impl Rewriter for TarProvider {
    fn rewrite(
        &self,
        session: &Session<'_>,
        descriptor: &ArchiveDescriptor,
        source: Option<&Path>,
        successor: &Path,
        delta: &MutationDelta,
    ) -> Result<MutationReport> {
        common::reject_split(descriptor)?;
        if descriptor.properties().write_password().is_some() {
            return Err(ArchiveError::Unsupported {
                operation: "encryption",
                format: descriptor.format().to_string(),
            });
        }

        let codec = codec_for(descriptor);
        let writer = BufWriter::new(File::create(successor)?);
        let encoder = Encoder::for_codec(codec, writer, descriptor.compression_level())?;
        let mut builder = tar::Builder::new(encoder);
        builder.follow_symlinks(false);
        let mut report = MutationReport::default();

        if let Some(source) = source {
            let mut original = tar::Archive::new(open_stream(source, codec)?);
            for entry in original.entries()? {
                let mut entry = entry?;
                let kind = entry.header().entry_type();
                if is_metadata_only(kind) {
                    continue;
                }
                let name = entry_name(&entry);
                session.progress(name.as_str(), INDETERMINATE, INDETERMINATE);
                if delta.drops(&name) {
                    report.removed += 1;
                    continue;
                }
                let pax = pax_records(&mut entry)?;
                if !pax.is_empty() {
                    builder.append_pax_extensions(
                        pax.iter().map(|(key, value)| (key.as_str(), value.as_slice())),
                    )?;
                }
                let mut header = entry.header().clone();
                if kind.is_symlink() || kind.is_hard_link() {
                    let link = entry
                        .link_name_bytes()
                        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                        .unwrap_or_default();
                    if kind.is_hard_link() && removes(delta, &link) {
                        return Err(ArchiveError::Unsupported {
                            operation: "removing the target of a kept hard link",
                            format: descriptor.format().to_string(),
                        });
                    }
                    builder.append_link(&mut header, &name, &link)?;
                } else {
                    builder.append_data(&mut header, &name, &mut entry)?;
                }
                report.kept += 1;
            }
        }

        for entry in delta.additions() {
            append(&mut builder, session, entry)?;
            report.added += 1;
        }

        let encoder = builder.into_inner()?;
        let writer = encoder.finish()?;
        let file = writer.into_inner().map_err(io::IntoInnerError::into_error)?;
        file.sync_all()?;
        Ok(report)
    }
}

impl ArchiveReader for TarProvider {
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

impl ArchiveWriter for TarProvider {
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

impl FormatProvider for TarProvider {
    fn name(&self) -> &'static str {
        "tar"
    }

    fn reader(&self) -> Option<&dyn ArchiveReader> {
        Some(self)
    }

    fn writer(&self) -> Option<&dyn ArchiveWriter> {
        Some(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::events::NoopSink;
    use crate::events::SessionId;
    use crate::test_utils::TarTestBuilder;
    use tempfile::TempDir;

    fn session(sink: &NoopSink) -> Session<'_> {
        Session::new(SessionId::new(2), sink)
    }

    fn paths(entries: &[ArchiveEntry]) -> Vec<&str> {
        entries.iter().map(ArchiveEntry::path).collect()
    }

    #[test]
    fn test_list_plain_tar() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("plain.tar");
        fs::write(
            &path,
            TarTestBuilder::new()
                .add_directory("docs/")
                .add_file("docs/readme.md", b"# hi")
                .add_symlink("docs/latest", "readme.md")
                .build(),
        )
        .unwrap();
        let sink = NoopSink;

        let entries = TarProvider::new().list(&session(&sink), &ArchiveDescriptor::new(&path));
        assert_eq!(paths(&entries), vec!["docs", "docs/latest", "docs/readme.md"]);
        assert!(entries[0].is_folder());
        assert_eq!(entries[1].symlink_target(), Some("readme.md"));
        assert_eq!(entries[2].raw_size(), 4);
        assert_eq!(entries[2].attributes() & 0o777, 0o644);
    }

    #[test]
    fn test_create_list_delete_tgz() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.txt");
        let b = temp.path().join("b.txt");
        fs::write(&a, b"alpha").unwrap();
        fs::write(&b, b"beta").unwrap();
        let descriptor = ArchiveDescriptor::new(temp.path().join("bundle.tgz"));
        let sink = NoopSink;
        let provider = TarProvider::new();

        assert!(provider.create(
            &session(&sink),
            &descriptor,
            &[
                ArchiveEntry::folder("dir"),
                ArchiveEntry::staged("dir/a.txt", &a),
                ArchiveEntry::staged("b.txt", &b),
            ],
        ));
        let header = fs::read(descriptor.path()).unwrap();
        assert_eq!(CompressionCodec::detect(&header), Some(CompressionCodec::Gzip));

        let listed = provider.list(&session(&sink), &descriptor);
        assert_eq!(paths(&listed), vec!["b.txt", "dir", "dir/a.txt"]);

        assert!(provider.delete(&session(&sink), &descriptor, &ArchiveEntry::folder("dir")));
        let listed = provider.list(&session(&sink), &descriptor);
        assert_eq!(paths(&listed), vec!["b.txt"]);
        assert!(provider.test(&session(&sink), &descriptor));
    }

    #[test]
    fn test_add_replaces_same_path() {
        let temp = TempDir::new().unwrap();
        let v1 = temp.path().join("v1");
        let v2 = temp.path().join("v2");
        fs::write(&v1, b"one").unwrap();
        fs::write(&v2, b"two!").unwrap();
        let descriptor = ArchiveDescriptor::new(temp.path().join("r.tar"));
        let sink = NoopSink;
        let provider = TarProvider::new();

        assert!(provider.create(&session(&sink), &descriptor, &[ArchiveEntry::staged("f", &v1)]));
        assert!(provider.add(&session(&sink), &descriptor, &[ArchiveEntry::staged("f", &v2)]));

        let listed = provider.list(&session(&sink), &descriptor);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].raw_size(), 4);

        let out = temp.path().join("out");
        assert!(provider.extract(&session(&sink), &out, &descriptor, &listed[0]));
        assert_eq!(fs::read(out).unwrap(), b"two!");
    }

    #[test]
    fn test_extract_folder_with_symlink() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("links.tar");
        fs::write(
            &path,
            TarTestBuilder::new()
                .add_file("pkg/bin/tool", b"#!/bin/sh")
                .add_symlink("pkg/current", "bin/tool")
                .build(),
        )
        .unwrap();
        let sink = NoopSink;
        let dest = temp.path().join("pkg-out");

        assert!(TarProvider::new().extract(
            &session(&sink),
            &dest,
            &ArchiveDescriptor::new(&path),
            &ArchiveEntry::folder("pkg"),
        ));
        assert_eq!(fs::read(dest.join("bin/tool")).unwrap(), b"#!/bin/sh");
        #[cfg(unix)]
        assert_eq!(
            fs::read_link(dest.join("current")).unwrap(),
            PathBuf::from("bin/tool")
        );
    }

    fn linked_fixture(dir: &Path) -> ArchiveDescriptor {
        let path = dir.join("linked.tar");
        fs::write(
            &path,
            TarTestBuilder::new()
                .add_file("orig.txt", b"shared bytes")
                .add_hardlink("link.txt", "orig.txt")
                .build(),
        )
        .unwrap();
        ArchiveDescriptor::new(path)
    }

    #[test]
    fn test_extract_hard_link_alone_copies_target() {
        let temp = TempDir::new().unwrap();
        let descriptor = linked_fixture(temp.path());
        let sink = NoopSink;
        let out = temp.path().join("out.txt");

        assert!(TarProvider::new().extract(
            &session(&sink),
            &out,
            &descriptor,
            &ArchiveEntry::file("link.txt"),
        ));
        assert_eq!(fs::read(&out).unwrap(), b"shared bytes");
        assert!(!temp.path().join("orig.txt").exists());
    }

    #[test]
    fn test_extract_hard_link_without_target_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("dangling.tar");
        fs::write(
            &path,
            TarTestBuilder::new().add_hardlink("link.txt", "gone.txt").build(),
        )
        .unwrap();
        let sink = NoopSink;
        let out = temp.path().join("out.txt");

        assert!(!TarProvider::new().extract(
            &session(&sink),
            &out,
            &ArchiveDescriptor::new(&path),
            &ArchiveEntry::file("link.txt"),
        ));
        assert!(!out.exists());
    }

    #[test]
    fn test_delete_hard_link_target_is_refused() {
        let temp = TempDir::new().unwrap();
        let descriptor = linked_fixture(temp.path());
        let before = fs::read(descriptor.path()).unwrap();
        let sink = NoopSink;
        let provider = TarProvider::new();

        assert!(!provider.delete(&session(&sink), &descriptor, &ArchiveEntry::file("orig.txt")));
        assert_eq!(fs::read(descriptor.path()).unwrap(), before);

        assert!(provider.delete(&session(&sink), &descriptor, &ArchiveEntry::file("link.txt")));
        assert_eq!(paths(&provider.list(&session(&sink), &descriptor)), vec!["orig.txt"]);
    }

    #[test]
    fn test_rewrite_keeps_pax_records() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("pax.tar");
        let mut builder = tar::Builder::new(Vec::new());
        builder
            .append_pax_extensions([("SCHILY.xattr.user.tag", b"blue".as_slice())])
            .unwrap();
        for (name, data) in [("tagged.txt", b"keep".as_slice()), ("drop.txt", b"gone".as_slice())] {
            let mut header = Header::new_ustar();
            header.set_entry_type(EntryType::Regular);
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            builder.append_data(&mut header, name, data).unwrap();
        }
        fs::write(&path, builder.into_inner().unwrap()).unwrap();
        let descriptor = ArchiveDescriptor::new(&path);
        let sink = NoopSink;

        assert!(TarProvider::new().delete(&session(&sink), &descriptor, &ArchiveEntry::file("drop.txt")));

        let mut archive = tar::Archive::new(File::open(&path).unwrap());
        let mut entries = archive.entries().unwrap();
        let mut tagged = entries.next().unwrap().unwrap();
        assert_eq!(entry_name(&tagged), "tagged.txt");
        let records: Vec<(String, Vec<u8>)> = tagged
            .pax_extensions()
            .unwrap()
            .unwrap()
            .map(|ext| {
                let ext = ext.unwrap();
                (ext.key().unwrap().to_string(), ext.value_bytes().to_vec())
            })
            .collect();
        assert!(records.contains(&("SCHILY.xattr.user.tag".to_string(), b"blue".to_vec())));
        assert!(entries.next().is_none());
    }

    #[test]
    fn test_corrupted_gzip_trailer_fails_test() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("data.bin");
        fs::write(&source, vec![42u8; 4096]).unwrap();
        let descriptor = ArchiveDescriptor::new(temp.path().join("c.tgz"));
        let sink = NoopSink;
        let provider = TarProvider::new();
        assert!(provider.create(
            &session(&sink),
            &descriptor,
            &[ArchiveEntry::staged("data.bin", &source)],
        ));
        assert!(provider.test(&session(&sink), &descriptor));

        let mut bytes = fs::read(descriptor.path()).unwrap();
        let crc = bytes.len() - 8;
        bytes[crc] ^= 0xff;
        fs::write(descriptor.path(), bytes).unwrap();
        assert!(!provider.test(&session(&sink), &descriptor));
    }

    #[test]
    fn test_corrupted_header_checksum_fails_test() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("h.tar");
        let mut bytes = TarTestBuilder::new().add_file("x.txt", b"x").build();
        bytes[0] ^= 0x01;
        fs::write(&path, bytes).unwrap();
        let sink = NoopSink;

        assert!(!TarProvider::new().test(&session(&sink), &ArchiveDescriptor::new(&path)));
    }

    #[test]
    fn test_encryption_rejected() {
        let temp = TempDir::new().unwrap();
        let mut descriptor = ArchiveDescriptor::new(temp.path().join("e.tar"));
        descriptor.properties_mut().set_password("pw");
        let sink = NoopSink;

        assert!(!TarProvider::new().create(&session(&sink), &descriptor, &[ArchiveEntry::folder("d")]));
        assert!(!descriptor.path().exists());
    }
}
