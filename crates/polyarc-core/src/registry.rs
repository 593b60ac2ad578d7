//! Format-to-provider resolution with priority override.
//!
//! The registry is an explicit value owned by the host application. Providers
//! are registered once at startup; each claims extensions per capability.
//! When two providers claim the same extension the newcomer takes over only if
//! its configured priority is strictly greater than the holder's. A priority
//! value that does not parse keeps the current holder.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::hash_map;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use log::debug;

use crate::ArchiveError;
use crate::Result;
use crate::config::DEFAULT_HOLDER_PRIORITY;
use crate::config::DEFAULT_NEWCOMER_PRIORITY;
use crate::config::RegistryConfig;
use crate::descriptor::format_tag;
use crate::formats::CompressorProvider;
use crate::formats::SevenZProvider;
use crate::formats::TarProvider;
use crate::formats::ZipProvider;
use crate::provider::ArchiveReader;
use crate::provider::ArchiveWriter;
use crate::provider::Capability;
use crate::provider::FormatProvider;

/// Maps file extensions to providers, per capability.
///
/// # Examples
///
/// ```
/// use polyarc_core::Registry;
/// use polyarc_core::RegistryConfig;
/// use polyarc_core::provider::Capability;
/// use std::path::Path;
///
/// let registry = Registry::with_default_providers(RegistryConfig::default())?;
/// let zip = registry.resolve_path(Capability::Write, Path::new("photos.ZIP"));
/// assert_eq!(zip.map(|p| p.name()), Some("zip"));
/// assert!(registry.is_compressor_only("gz"));
/// assert!(registry.resolve(Capability::Write, "7z").is_none());
/// # Ok::<(), polyarc_core::ArchiveError>(())
/// ```
pub struct Registry {
    config: RegistryConfig,
    providers: Vec<Arc<dyn FormatProvider>>,
    claims: HashMap<(Capability, String), usize>,
    compressor_only: BTreeSet<String>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            providers: Vec::new(),
            claims: HashMap::new(),
            compressor_only: BTreeSet::new(),
        }
    }

    /// Creates a registry holding the built-in providers, registered in the
    /// order zip, tar, 7z, compressor.
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in provider claims no extension.
    pub fn with_default_providers(config: RegistryConfig) -> Result<Self> {
        let mut registry = Self::new(config);
        registry.register(Arc::new(ZipProvider::new()))?;
        registry.register(Arc::new(TarProvider::new()))?;
        registry.register(Arc::new(SevenZProvider::new()))?;
        registry.register(Arc::new(CompressorProvider::new()))?;
        Ok(registry)
    }

    /// Registers a provider and claims its extensions.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidProvider`] if the provider claims no
    /// extension for any capability.
    pub fn register(&mut self, provider: Arc<dyn FormatProvider>) -> Result<()> {
        let name = provider.name();
        if Capability::ALL
            .iter()
            .all(|&capability| provider.extensions(capability).is_empty())
        {
            return Err(ArchiveError::InvalidProvider {
                name: name.to_string(),
            });
        }

        let index = self.providers.len();
        for capability in Capability::ALL {
            for extension in provider.extensions(capability) {
                let key = (capability, extension.to_ascii_lowercase());
                match self.claims.entry(key) {
                    hash_map::Entry::Vacant(slot) => {
                        slot.insert(index);
                    }
                    hash_map::Entry::Occupied(mut slot) => {
                        let holder = self.providers[*slot.get()].name();
                        if Self::takes_over(&self.config, holder, name) {
                            debug!("{name} overrides {holder} for {capability:?} .{extension}");
                            slot.insert(index);
                        }
                    }
                }
            }
        }

        self.compressor_only.extend(
            provider
                .compressor_only_formats()
                .iter()
                .map(|format| format.to_ascii_lowercase()),
        );
        debug!("registered provider {name}");
        self.providers.push(provider);
        Ok(())
    }

    fn takes_over(config: &RegistryConfig, holder: &str, newcomer: &str) -> bool {
        let holder_priority = config.priority(holder, DEFAULT_HOLDER_PRIORITY);
        let newcomer_priority = config.priority(newcomer, DEFAULT_NEWCOMER_PRIORITY);
        matches!(
            (holder_priority, newcomer_priority),
            (Some(held), Some(challenger)) if challenger > held
        )
    }

    /// Provider claiming `extension` for `capability`.
    #[must_use]
    pub fn resolve(&self, capability: Capability, extension: &str) -> Option<&Arc<dyn FormatProvider>> {
        self.claims
            .get(&(capability, extension.to_ascii_lowercase()))
            .map(|&index| &self.providers[index])
    }

    /// Provider claiming the extension of `path` for `capability`.
    #[must_use]
    pub fn resolve_path(
        &self,
        capability: Capability,
        path: &Path,
    ) -> Option<&Arc<dyn FormatProvider>> {
        self.resolve(capability, &format_tag(path)?)
    }

    /// Reader for `extension`.
    #[must_use]
    pub fn reader(&self, extension: &str) -> Option<&dyn ArchiveReader> {
        self.resolve(Capability::Read, extension)?.reader()
    }

    /// Writer for `extension`.
    #[must_use]
    pub fn writer(&self, extension: &str) -> Option<&dyn ArchiveWriter> {
        self.resolve(Capability::Write, extension)?.writer()
    }

    /// Whether `format` is a single-payload compressor format.
    #[must_use]
    pub fn is_compressor_only(&self, format: &str) -> bool {
        self.compressor_only.contains(&format.to_ascii_lowercase())
    }

    /// Union of compressor-only tags across all registered providers.
    #[must_use]
    pub const fn compressor_only_formats(&self) -> &BTreeSet<String> {
        &self.compressor_only
    }

    /// Claimed extensions for `capability`, sorted.
    #[must_use]
    pub fn supported_extensions(&self, capability: Capability) -> Vec<&str> {
        let mut extensions: Vec<&str> = self
            .claims
            .keys()
            .filter(|(claimed, _)| *claimed == capability)
            .map(|(_, extension)| extension.as_str())
            .collect();
        extensions.sort_unstable();
        extensions
    }

    /// Registered providers in registration order.
    #[must_use]
    pub fn providers(&self) -> &[Arc<dyn FormatProvider>] {
        &self.providers
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.providers.iter().map(|p| p.name()).collect();
        f.debug_struct("Registry")
            .field("providers", &names)
            .field("compressor_only", &self.compressor_only)
            .finish_non_exhaustive()
    }
}
