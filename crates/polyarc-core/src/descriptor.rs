//! Per-archive identity plus the mutable option bag providers read.
//!
//! A descriptor is created when an archive is opened or about to be created
//! and is mutated in place as options are chosen (for example a password
//! supplied after the first open attempt reported encryption). It is never
//! persisted; the password only ever prints as `***`.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::DescriptorDefaults;

/// Highest accepted compression level.
pub const MAX_COMPRESSION_LEVEL: u8 = 9;

/// Secret string whose `Debug` and `Display` never reveal the value.
///
/// ```
/// use polyarc_core::Password;
///
/// let password = Password::from("correct horse");
/// assert_eq!(format!("{password:?}"), "***");
/// assert_eq!(password.expose(), "correct horse");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    /// Returns the secret. Callers must not log it.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Password {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Password {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

impl fmt::Display for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Default compression method for formats that offer a choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionMethod {
    /// No compression.
    Stored,
    /// Deflate.
    #[default]
    Deflated,
}

impl FromStr for CompressionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stored" | "store" => Ok(Self::Stored),
            "deflated" | "deflate" => Ok(Self::Deflated),
            other => Err(format!("unknown compression method: {other}")),
        }
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stored => "stored",
            Self::Deflated => "deflated",
        })
    }
}

/// Encryption scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EncryptionMethod {
    /// WinZip AES.
    #[default]
    Aes,
    /// Legacy PKWARE stream cipher; weak, offered for compatibility only.
    ZipCrypto,
}

/// AES key strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EncryptionStrength {
    /// 128-bit key.
    Aes128,
    /// 192-bit key.
    Aes192,
    /// 256-bit key.
    #[default]
    Aes256,
}

/// Encryption options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncryptionOptions {
    /// Whether writers should encrypt new entries.
    pub enabled: bool,
    /// Scheme used when writing.
    pub method: EncryptionMethod,
    /// Key strength for AES.
    pub strength: EncryptionStrength,
    /// Password for reading and writing.
    pub password: Option<Password>,
}

/// Split-archive (multi-volume) options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitOptions {
    /// Whether volumes should be split.
    pub enabled: bool,
    /// Volume size in bytes.
    pub volume_size: Option<u64>,
}

/// Format-specific option bag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorProperties {
    /// Default compression method.
    pub compression_method: CompressionMethod,
    /// Encryption settings.
    pub encryption: EncryptionOptions,
    /// Split-archive settings.
    pub split: SplitOptions,
    /// Free-form options not covered above.
    pub extra: BTreeMap<String, String>,
}

impl DescriptorProperties {
    /// Supplies a password and enables encryption.
    pub fn set_password(&mut self, password: impl Into<Password>) {
        self.encryption.password = Some(password.into());
        self.encryption.enabled = true;
    }

    /// Removes the password and disables encryption.
    pub fn clear_password(&mut self) {
        self.encryption.password = None;
        self.encryption.enabled = false;
    }

    /// The password, if one was supplied.
    #[must_use]
    pub const fn password(&self) -> Option<&Password> {
        self.encryption.password.as_ref()
    }

    /// Password to encrypt new entries with, when encryption is enabled.
    #[must_use]
    pub fn write_password(&self) -> Option<&Password> {
        self.encryption
            .enabled
            .then_some(self.encryption.password.as_ref())
            .flatten()
    }
}

/// Identity and options of one archive instance.
///
/// # Examples
///
/// ```
/// use polyarc_core::ArchiveDescriptor;
///
/// let mut descriptor = ArchiveDescriptor::new("/data/Backup.ZIP").with_compression_level(12);
/// assert_eq!(descriptor.format(), "zip");
/// assert_eq!(descriptor.compression_level(), 9);
///
/// descriptor.properties_mut().set_password("s3cret");
/// assert!(!format!("{descriptor:?}").contains("s3cret"));
/// assert_eq!(descriptor.to_string(), "/data/Backup.ZIP (zip)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveDescriptor {
    path: PathBuf,
    format: String,
    compression_level: u8,
    properties: DescriptorProperties,
}

impl ArchiveDescriptor {
    /// Creates a descriptor with the default options.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_defaults(path, &DescriptorDefaults::default())
    }

    /// Creates a descriptor whose options come from `defaults`.
    #[must_use]
    pub fn with_defaults(path: impl Into<PathBuf>, defaults: &DescriptorDefaults) -> Self {
        let path = path.into();
        let format = format_tag(&path).unwrap_or_default();
        Self {
            path,
            format,
            compression_level: defaults.compression_level.min(MAX_COMPRESSION_LEVEL),
            properties: DescriptorProperties {
                compression_method: defaults.compression_method,
                ..DescriptorProperties::default()
            },
        }
    }

    /// Overrides the format tag.
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into().to_ascii_lowercase();
        self
    }

    /// Sets the compression level, clamped to 0-9.
    #[must_use]
    pub fn with_compression_level(mut self, level: u8) -> Self {
        self.set_compression_level(level);
        self
    }

    /// Sets the compression level in place, clamped to 0-9.
    pub fn set_compression_level(&mut self, level: u8) {
        self.compression_level = level.min(MAX_COMPRESSION_LEVEL);
    }

    /// Archive path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Format tag (lower-case extension by default).
    #[must_use]
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Compression level, 0-9.
    #[must_use]
    pub const fn compression_level(&self) -> u8 {
        self.compression_level
    }

    /// Format-specific options.
    #[must_use]
    pub const fn properties(&self) -> &DescriptorProperties {
        &self.properties
    }

    /// Mutable format-specific options.
    pub fn properties_mut(&mut self) -> &mut DescriptorProperties {
        &mut self.properties
    }

    /// The archive's file name, or the whole path when it has none.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path.file_name().map_or_else(
            || self.path.to_string_lossy().into_owned(),
            |name| name.to_string_lossy().into_owned(),
        )
    }
}

impl fmt::Display for ArchiveDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path.display(), self.format)
    }
}

/// Lower-cased substring after the final `.` of the file name.
///
/// ```
/// use polyarc_core::descriptor::format_tag;
/// use std::path::Path;
///
/// assert_eq!(format_tag(Path::new("a/b.TAR.GZ")).as_deref(), Some("gz"));
/// assert_eq!(format_tag(Path::new("README")), None);
/// ```
#[must_use]
pub fn format_tag(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let (_, ext) = name.rsplit_once('.')?;
    (!ext.is_empty()).then(|| ext.to_ascii_lowercase())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ArchiveDescriptor::new("x.7Z").format(), "7z");
        assert_eq!(ArchiveDescriptor::new("noext").format(), "");
        assert_eq!(ArchiveDescriptor::new("x.zip").with_format("TZST").format(), "tzst");
    }

    #[test]
    fn test_default_level_from_defaults() {
        let defaults = DescriptorDefaults::default().with_compression_level(3);
        assert_eq!(ArchiveDescriptor::with_defaults("a.zip", &defaults).compression_level(), 3);
        assert_eq!(ArchiveDescriptor::new("a.zip").compression_level(), 6);
    }

    #[test]
    fn test_password_never_printed() {
        let mut descriptor = ArchiveDescriptor::new("secret.zip");
        descriptor.properties_mut().set_password(String::from("hunter2"));
        let debug = format!("{descriptor:?}");
        let display = descriptor.to_string();
        assert!(!debug.contains("hunter2"));
        assert!(!display.contains("hunter2"));
        assert_eq!(descriptor.properties().password().unwrap().expose(), "hunter2");
    }

    #[test]
    fn test_write_password_requires_enabled() {
        let mut properties = DescriptorProperties::default();
        properties.set_password("pw");
        assert!(properties.write_password().is_some());
        properties.encryption.enabled = false;
        assert!(properties.write_password().is_none());
        assert!(properties.password().is_some());
        properties.clear_password();
        assert!(properties.password().is_none());
    }

    #[test]
    fn test_compression_method_parse() {
        assert_eq!("Stored".parse::<CompressionMethod>().unwrap(), CompressionMethod::Stored);
        assert_eq!("deflate".parse::<CompressionMethod>().unwrap(), CompressionMethod::Deflated);
        assert!("lzma".parse::<CompressionMethod>().is_err());
    }

    #[test]
    fn test_file_name() {
        assert_eq!(ArchiveDescriptor::new("/a/b/c.tar").file_name(), "c.tar");
    }
}
