//! Error types for archive operations.
//!
//! `ArchiveError` is what providers propagate internally with `?`. It never
//! crosses a provider contract call: the boundary turns it into a failed
//! boolean (or an empty listing) plus an [`ErrorEvent`](crate::events::ErrorEvent)
//! whose kind comes from [`ArchiveError::kind`].

use std::path::PathBuf;
use thiserror::Error;

use crate::events::ErrorKind;

/// Result type alias using `ArchiveError`.
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Errors that can occur while reading, writing or rewriting an archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No provider claims the archive's extension.
    #[error("unsupported archive format: {format}")]
    UnsupportedFormat {
        /// The format tag that nobody claims.
        format: String,
    },

    /// The provider exists but cannot perform this operation.
    #[error("{operation} is not supported for {format} archives")]
    Unsupported {
        /// Operation name (e.g. "add").
        operation: &'static str,
        /// The format tag.
        format: String,
    },

    /// Archive is corrupted or cannot be parsed.
    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    /// The requested entry does not exist in the archive.
    #[error("entry not found: {path}")]
    EntryNotFound {
        /// Entry path that was looked up.
        path: String,
    },

    /// A stored checksum did not match the data.
    #[error("integrity check failed for {path}: {reason}")]
    IntegrityFailure {
        /// Entry whose check failed.
        path: String,
        /// What the codec reported.
        reason: String,
    },

    /// An entry staged for writing has no source file.
    #[error("staged entry {path} has no source file")]
    MissingSource {
        /// Entry path inside the archive.
        path: String,
    },

    /// Entry path would escape the extraction destination.
    #[error("refusing unsafe entry path: {path}")]
    UnsafePath {
        /// The offending path.
        path: PathBuf,
    },

    /// The archive is encrypted and no usable password was supplied.
    #[error("archive is encrypted: {0}")]
    Encrypted(String),

    /// A provider was registered without claiming anything.
    #[error("provider {name} declares no extensions")]
    InvalidProvider {
        /// Provider name.
        name: String,
    },
}

impl ArchiveError {
    /// Maps this error onto the error-event taxonomy.
    ///
    /// # Examples
    ///
    /// ```
    /// use polyarc_core::ArchiveError;
    /// use polyarc_core::events::ErrorKind;
    ///
    /// let err = ArchiveError::Unsupported {
    ///     operation: "add",
    ///     format: "gz".into(),
    /// };
    /// assert_eq!(err.kind(), ErrorKind::Unsupported);
    /// ```
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFormat { .. } | Self::Unsupported { .. } | Self::Encrypted(_) => {
                ErrorKind::Unsupported
            }
            Self::IntegrityFailure { .. } => ErrorKind::Integrity,
            Self::Io(_)
            | Self::InvalidArchive(_)
            | Self::EntryNotFound { .. }
            | Self::MissingSource { .. }
            | Self::UnsafePath { .. }
            | Self::InvalidProvider { .. } => ErrorKind::Io,
        }
    }

    /// Returns `true` if this error means the user should decide something
    /// (supply a password, pick another format) rather than retry.
    #[must_use]
    pub const fn needs_user_decision(&self) -> bool {
        matches!(self.kind(), ErrorKind::Unsupported)
    }

    /// Shorthand for an I/O error with a formatted message.
    pub(crate) fn io_other(message: impl Into<String>) -> Self {
        Self::Io(std::io::Error::other(message.into()))
    }
}

impl From<zip::result::ZipError> for ArchiveError {
    fn from(err: zip::result::ZipError) -> Self {
        use zip::result::ZipError;

        match err {
            ZipError::Io(io) => Self::Io(io),
            ZipError::FileNotFound => Self::EntryNotFound {
                path: String::new(),
            },
            ZipError::InvalidPassword => Self::Encrypted("invalid password".into()),
            ZipError::UnsupportedArchive(msg) if msg.contains("Password") => {
                Self::Encrypted(msg.to_string())
            }
            other => Self::InvalidArchive(format!("zip: {other}")),
        }
    }
}

impl From<walkdir::Error> for ArchiveError {
    fn from(err: walkdir::Error) -> Self {
        Self::io_other(format!("walkdir error: {err}"))
    }
}
