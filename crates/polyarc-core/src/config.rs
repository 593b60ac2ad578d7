//! Registry, descriptor and staging configuration.

use std::collections::HashMap;

use log::warn;

use crate::descriptor::CompressionMethod;

/// Priority a provider gets when it already holds an extension.
pub const DEFAULT_HOLDER_PRIORITY: i64 = 1;

/// Priority a provider gets when it tries to take over an extension.
pub const DEFAULT_NEWCOMER_PRIORITY: i64 = 0;

/// Per-provider priority values, as an external properties source supplies
/// them.
///
/// Values are kept as raw strings and parsed on use, so a malformed value
/// only affects the comparisons it takes part in.
///
/// # Examples
///
/// ```
/// use polyarc_core::RegistryConfig;
///
/// let config = RegistryConfig::default()
///     .with_priority("zip", "5")
///     .with_priority("broken", "high");
///
/// assert_eq!(config.priority("zip", 0), Some(5));
/// assert_eq!(config.priority("tar", 0), Some(0));
/// assert_eq!(config.priority("broken", 0), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Raw priority value per provider name.
    pub priorities: HashMap<String, String>,
}

impl RegistryConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the raw priority value of one provider.
    #[must_use]
    pub fn with_priority(mut self, provider: impl Into<String>, value: impl Into<String>) -> Self {
        self.priorities.insert(provider.into(), value.into());
        self
    }

    /// Effective priority of `provider`.
    ///
    /// Returns `default` when no value is configured and `None` when the
    /// configured value does not parse.
    #[must_use]
    pub fn priority(&self, provider: &str, default: i64) -> Option<i64> {
        let Some(raw) = self.priorities.get(provider) else {
            return Some(default);
        };
        match raw.trim().parse::<i64>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("malformed priority {raw:?} for provider {provider}: {e}");
                None
            }
        }
    }
}

/// Defaults applied to newly created descriptors.
///
/// # Examples
///
/// ```
/// use polyarc_core::DescriptorDefaults;
/// use polyarc_core::descriptor::CompressionMethod;
///
/// let defaults = DescriptorDefaults::default()
///     .with_compression_level(9)
///     .with_compression_method(CompressionMethod::Stored);
/// assert_eq!(defaults.compression_level, 9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorDefaults {
    /// Compression level (0-9).
    ///
    /// Default: `6`.
    pub compression_level: u8,

    /// Compression method for formats that offer a choice.
    ///
    /// Default: deflated.
    pub compression_method: CompressionMethod,
}

impl Default for DescriptorDefaults {
    fn default() -> Self {
        Self {
            compression_level: 6,
            compression_method: CompressionMethod::Deflated,
        }
    }
}

impl DescriptorDefaults {
    /// Sets the compression level.
    #[must_use]
    pub const fn with_compression_level(mut self, level: u8) -> Self {
        self.compression_level = level;
        self
    }

    /// Sets the compression method.
    #[must_use]
    pub const fn with_compression_method(mut self, method: CompressionMethod) -> Self {
        self.compression_method = method;
        self
    }
}

/// Controls how local files become staged entries.
///
/// # Examples
///
/// ```
/// use polyarc_core::StagingOptions;
///
/// let options = StagingOptions::default()
///     .with_include_hidden(false)
///     .with_exclude_pattern("*.tmp")
///     .with_prefix("backup/2024");
/// assert_eq!(options.prefix.as_deref(), Some("backup/2024"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingOptions {
    /// Follow symlinks instead of staging them as links.
    ///
    /// Default: `false`.
    pub follow_symlinks: bool,

    /// Include files whose name starts with `.`.
    ///
    /// Default: `true`.
    pub include_hidden: bool,

    /// Name patterns to skip: exact names, `*suffix` or `prefix*`.
    ///
    /// Default: empty.
    pub exclude_patterns: Vec<String>,

    /// Folder inside the archive that staged entries go under.
    ///
    /// Default: `None` (archive root).
    pub prefix: Option<String>,
}

impl Default for StagingOptions {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            include_hidden: true,
            exclude_patterns: Vec::new(),
            prefix: None,
        }
    }
}

impl StagingOptions {
    /// Sets whether symlinks are followed.
    #[must_use]
    pub const fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Sets whether hidden files are staged.
    #[must_use]
    pub const fn with_include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Adds an exclude pattern.
    #[must_use]
    pub fn with_exclude_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }

    /// Sets the in-archive folder prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}
