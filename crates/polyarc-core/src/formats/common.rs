//! Helpers shared by the format providers.
//!
//! - Mapping an in-archive path onto the extraction destination
//! - Buffered file writes with a reusable copy buffer
//! - Unix-seconds conversion for formats that store epoch timestamps

use std::fs;
use std::fs::File;
use std::io;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use crate::ArchiveError;
use crate::Result;
use crate::descriptor::ArchiveDescriptor;
use crate::entry::ArchiveEntry;
use crate::tree;

/// I/O buffer size (64 KB).
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Reusable heap buffer for stream copies within one operation.
#[derive(Debug)]
pub struct CopyBuffer {
    buf: Vec<u8>,
}

impl CopyBuffer {
    /// Allocates a 64 KB buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: vec![0u8; COPY_BUFFER_SIZE],
        }
    }

    /// Copies `reader` into `writer`, returning the byte count.
    ///
    /// # Errors
    ///
    /// Returns the first read or write error.
    pub fn copy<R: Read + ?Sized, W: Write + ?Sized>(
        &mut self,
        reader: &mut R,
        writer: &mut W,
    ) -> io::Result<u64> {
        let mut total: u64 = 0;
        loop {
            let n = match reader.read(&mut self.buf) {
                Ok(0) => return Ok(total),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            writer.write_all(&self.buf[..n])?;
            total += n as u64;
        }
    }
}

impl Default for CopyBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Opens the archive file a descriptor points at.
///
/// # Errors
///
/// Returns an error if the file cannot be opened.
pub fn open_archive(descriptor: &ArchiveDescriptor) -> Result<File> {
    File::open(descriptor.path()).map_err(|e| {
        ArchiveError::Io(io::Error::new(
            e.kind(),
            format!("cannot open {}: {e}", descriptor.path().display()),
        ))
    })
}

/// Fails when the descriptor asks for a multi-volume archive.
///
/// # Errors
///
/// Returns [`ArchiveError::Unsupported`] if splitting is enabled.
pub fn reject_split(descriptor: &ArchiveDescriptor) -> Result<()> {
    if descriptor.properties().split.enabled {
        return Err(ArchiveError::Unsupported {
            operation: "split volumes",
            format: descriptor.format().to_string(),
        });
    }
    Ok(())
}

/// Converts a normalized in-archive path into a relative filesystem path.
///
/// # Errors
///
/// Returns [`ArchiveError::UnsafePath`] if any segment is `..` or the path
/// is absolute.
pub fn safe_relative(path: &str) -> Result<PathBuf> {
    let candidate = Path::new(path);
    let mut out = PathBuf::new();
    for component in candidate.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ArchiveError::UnsafePath {
                    path: candidate.to_path_buf(),
                });
            }
        }
    }
    Ok(out)
}

/// Where an archive member lands when `selected` is extracted to
/// `destination`.
///
/// Returns `None` when the member is not `selected` and does not lie beneath
/// it.
///
/// # Errors
///
/// Returns [`ArchiveError::UnsafePath`] for members whose path escapes.
pub fn extraction_target(
    selected: &ArchiveEntry,
    raw_path: &str,
    destination: &Path,
) -> Result<Option<PathBuf>> {
    let path = tree::normalize_path(raw_path);
    if path.split('/').any(|segment| segment == "..") {
        if selected.covers(&path) {
            return Err(ArchiveError::UnsafePath {
                path: PathBuf::from(raw_path),
            });
        }
        return Ok(None);
    }
    if path == selected.path() {
        return Ok(Some(destination.to_path_buf()));
    }
    match selected.relative(&path) {
        Some(rest) => Ok(Some(destination.join(safe_relative(rest)?))),
        None => Ok(None),
    }
}

/// Writes `reader` to `path`, creating parents and replacing an existing
/// file or link.
///
/// # Errors
///
/// Returns an error if directory creation, file creation or the copy fails.
pub fn write_file<R: Read + ?Sized>(
    reader: &mut R,
    path: &Path,
    buffer: &mut CopyBuffer,
) -> Result<u64> {
    prepare_target(path)?;
    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(COPY_BUFFER_SIZE, file);
    let written = buffer.copy(reader, &mut writer)?;
    writer.flush()?;
    Ok(written)
}

/// Creates a symbolic link at `path`, replacing whatever is there.
///
/// # Errors
///
/// Returns an error if the link cannot be created, or on platforms without
/// symlink support.
pub fn write_symlink(target: &str, path: &Path) -> Result<()> {
    prepare_target(path)?;
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, path)?;
        Ok(())
    }
    #[cfg(not(unix))]
    {
        Err(ArchiveError::Unsupported {
            operation: "symlink extraction",
            format: target.to_string(),
        })
    }
}

/// Applies Unix permission bits, ignoring a zero mode.
///
/// # Errors
///
/// Returns an error if the permissions cannot be set.
pub fn apply_mode(path: &Path, mode: u32) -> Result<()> {
    #[cfg(unix)]
    if mode & 0o777 != 0 {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))?;
    }
    #[cfg(not(unix))]
    let _ = (path, mode);
    Ok(())
}

fn prepare_target(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    if let Ok(meta) = fs::symlink_metadata(path)
        && !meta.is_dir()
    {
        fs::remove_file(path)?;
    }
    Ok(())
}

/// Seconds since the Unix epoch, or `None` before it.
#[must_use]
pub fn unix_seconds(time: SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}

/// `SystemTime` from Unix seconds; zero means "not recorded".
#[must_use]
pub fn from_unix_seconds(seconds: u64) -> Option<SystemTime> {
    (seconds != 0).then(|| UNIX_EPOCH + Duration::from_secs(seconds))
}
