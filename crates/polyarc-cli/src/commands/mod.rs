//! Subcommand implementations.
//!
//! Every command builds descriptors through [`App`], runs core operations
//! through the [`Runner`] and turns failed outcomes into contextual errors.

pub mod add;
pub mod completion;
pub mod create;
pub mod extract;
pub mod formats;
pub mod list;
pub mod migrate;
pub mod remove;
pub mod verify;

use crate::cli::StagingArgs;
use crate::error::convert_error_events;
use crate::output::OutputFormatter;
use crate::progress::Runner;
use anyhow::Result;
use anyhow::anyhow;
use polyarc_core::tree::normalize_path;
use polyarc_core::{
    ArchiveDescriptor, ArchiveEntry, DescriptorDefaults, Registry, StagingOptions, api,
};
use std::path::Path;

/// Everything a command needs: the registry, output and session runner.
pub struct App {
    pub registry: Registry,
    pub formatter: Box<dyn OutputFormatter>,
    pub runner: Runner,
    pub password: Option<String>,
}

impl App {
    /// Descriptor for `path` with the global password applied.
    pub fn descriptor(&self, path: &Path, defaults: &DescriptorDefaults) -> ArchiveDescriptor {
        let mut descriptor = ArchiveDescriptor::with_defaults(path, defaults);
        if let Some(password) = &self.password {
            descriptor.properties_mut().set_password(password.as_str());
        }
        descriptor
    }

    /// Lists `descriptor`, failing if the listing reported an error.
    pub fn list(&self, descriptor: &ArchiveDescriptor) -> Result<Vec<ArchiveEntry>> {
        let outcome = self
            .runner
            .run("Reading", |session| api::list(&self.registry, session, descriptor));
        if outcome.errors.is_empty() {
            Ok(outcome.value)
        } else {
            Err(convert_error_events(&outcome.errors, descriptor.path(), &self.registry))
        }
    }

    /// Finds the entry at `raw_path` in a fresh listing.
    pub fn find_entry(&self, descriptor: &ArchiveDescriptor, raw_path: &str) -> Result<ArchiveEntry> {
        let wanted = normalize_path(raw_path);
        self.list(descriptor)?
            .into_iter()
            .find(|entry| entry.path() == wanted)
            .ok_or_else(|| {
                anyhow!(
                    "Entry '{wanted}' not found in '{}'\n\
                     HINT: Run `polyarc list {}` to see the entry paths.",
                    descriptor.path().display(),
                    descriptor.path().display()
                )
            })
    }
}

/// Staging options from the shared flags.
pub fn staging_options(args: &StagingArgs, prefix: Option<&str>) -> StagingOptions {
    let mut options = StagingOptions::default()
        .with_follow_symlinks(args.follow_symlinks)
        .with_include_hidden(!args.no_hidden);
    for pattern in &args.exclude {
        options = options.with_exclude_pattern(pattern.as_str());
    }
    if let Some(prefix) = prefix {
        options = options.with_prefix(prefix);
    }
    options
}
