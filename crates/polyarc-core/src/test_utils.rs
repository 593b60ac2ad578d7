//! Fixture builders for provider tests.
//!
//! The builders produce archive bytes in memory so a test can corrupt them
//! before writing them next to a [`TempDir`](tempfile::TempDir). Paths are
//! written exactly as given, which makes it possible to build archives that
//! omit directory records or carry hostile names.
//!
//! # Panics
//!
//! All functions in this module panic on I/O errors; they are meant for
//! tests only.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::fs;
use std::io::Cursor;
use std::io::Write;
use std::path::Path;

use crate::descriptor::ArchiveDescriptor;
use crate::formats::compression::CompressionCodec;
use crate::formats::compression::Encoder;

/// Writes `bytes` to `dir/name` and returns a descriptor for it.
///
/// # Examples
///
/// ```
/// use polyarc_core::test_utils::{TarTestBuilder, write_fixture};
///
/// let temp = tempfile::TempDir::new().unwrap();
/// let bytes = TarTestBuilder::new().add_file("a.txt", b"a").build();
/// let descriptor = write_fixture(temp.path(), "fixture.tar", &bytes);
/// assert_eq!(descriptor.format(), "tar");
/// ```
#[must_use]
pub fn write_fixture(dir: &Path, name: &str, bytes: &[u8]) -> ArchiveDescriptor {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    ArchiveDescriptor::new(path)
}

/// Builds tar archives entry by entry.
///
/// # Examples
///
/// ```
/// use polyarc_core::formats::compression::CompressionCodec;
/// use polyarc_core::test_utils::TarTestBuilder;
///
/// let tgz = TarTestBuilder::new()
///     .add_directory("site/")
///     .add_file("site/index.html", b"<html>")
///     .add_symlink("site/home.html", "index.html")
///     .build_compressed(CompressionCodec::Gzip);
/// assert_eq!(&tgz[..2], CompressionCodec::Gzip.magic());
/// ```
pub struct TarTestBuilder {
    builder: tar::Builder<Vec<u8>>,
}

impl TarTestBuilder {
    /// Starts an empty archive.
    #[must_use]
    pub fn new() -> Self {
        Self {
            builder: tar::Builder::new(Vec::new()),
        }
    }

    fn append(mut self, path: &str, kind: tar::EntryType, mode: u32, data: &[u8], link: Option<&str>) -> Self {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(kind);
        header.set_size(data.len() as u64);
        header.set_mode(mode);
        header.set_mtime(1_700_000_000);
        if let Some(link) = link {
            header.set_link_name(link).unwrap();
        }
        header.set_cksum();
        self.builder.append_data(&mut header, path, data).unwrap();
        self
    }

    /// Adds a regular file with mode 0644.
    #[must_use]
    pub fn add_file(self, path: &str, data: &[u8]) -> Self {
        self.append(path, tar::EntryType::Regular, 0o644, data, None)
    }

    /// Adds a regular file with `mode`.
    #[must_use]
    pub fn add_file_with_mode(self, path: &str, data: &[u8], mode: u32) -> Self {
        self.append(path, tar::EntryType::Regular, mode, data, None)
    }

    /// Adds a directory record.
    #[must_use]
    pub fn add_directory(self, path: &str) -> Self {
        self.append(path, tar::EntryType::Directory, 0o755, &[], None)
    }

    /// Adds a symlink pointing at `target`.
    #[must_use]
    pub fn add_symlink(self, path: &str, target: &str) -> Self {
        self.append(path, tar::EntryType::Symlink, 0o777, &[], Some(target))
    }

    /// Adds a hardlink to an earlier member `target`.
    #[must_use]
    pub fn add_hardlink(self, path: &str, target: &str) -> Self {
        self.append(path, tar::EntryType::Link, 0o644, &[], Some(target))
    }

    /// Finishes the archive and returns the plain tar bytes.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.builder.into_inner().unwrap()
    }

    /// Finishes the archive and wraps it in `codec`.
    #[must_use]
    pub fn build_compressed(self, codec: CompressionCodec) -> Vec<u8> {
        let tar = self.build();
        let mut encoder = Encoder::for_codec(Some(codec), Vec::new(), 6).unwrap();
        encoder.write_all(&tar).unwrap();
        encoder.finish().unwrap()
    }
}

impl Default for TarTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds zip archives entry by entry. File data is stored uncompressed so
/// tests can find and flip payload bytes.
///
/// # Examples
///
/// ```
/// use polyarc_core::test_utils::ZipTestBuilder;
///
/// let zip = ZipTestBuilder::new()
///     .add_file("a/b/c.txt", b"hello")
///     .add_directory("empty/")
///     .build();
/// assert_eq!(&zip[..4], b"PK\x03\x04");
/// ```
pub struct ZipTestBuilder {
    zip: zip::ZipWriter<Cursor<Vec<u8>>>,
}

impl ZipTestBuilder {
    /// Starts an empty archive.
    #[must_use]
    pub fn new() -> Self {
        Self {
            zip: zip::ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    fn stored(mode: u32) -> zip::write::SimpleFileOptions {
        zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored)
            .unix_permissions(mode)
    }

    /// Adds a stored file with mode 0644.
    #[must_use]
    pub fn add_file(self, path: &str, data: &[u8]) -> Self {
        self.add_file_with_mode(path, data, 0o644)
    }

    /// Adds a stored file with `mode`.
    #[must_use]
    pub fn add_file_with_mode(mut self, path: &str, data: &[u8], mode: u32) -> Self {
        self.zip.start_file(path, Self::stored(mode)).unwrap();
        self.zip.write_all(data).unwrap();
        self
    }

    /// Adds a directory record.
    #[must_use]
    pub fn add_directory(mut self, path: &str) -> Self {
        self.zip.add_directory(path, Self::stored(0o755)).unwrap();
        self
    }

    /// Adds a Unix symlink (mode `S_IFLNK`, target as content).
    #[must_use]
    pub fn add_symlink(mut self, path: &str, target: &str) -> Self {
        self.zip.start_file(path, Self::stored(0o120_777)).unwrap();
        self.zip.write_all(target.as_bytes()).unwrap();
        self
    }

    /// Finishes the archive.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.zip.finish().unwrap().into_inner()
    }
}

impl Default for ZipTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
