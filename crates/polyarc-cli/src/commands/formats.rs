//! Formats command implementation

use super::App;
use crate::output::FormatRow;
use anyhow::Result;
use polyarc_core::{Capability, Registry};
use std::collections::BTreeSet;

pub fn execute(app: &App) -> Result<()> {
    app.formatter.format_formats(&rows(&app.registry))
}

/// One row per extension any provider reads or writes.
fn rows(registry: &Registry) -> Vec<FormatRow> {
    let extensions: BTreeSet<&str> = registry
        .supported_extensions(Capability::Read)
        .into_iter()
        .chain(registry.supported_extensions(Capability::Write))
        .collect();

    extensions
        .into_iter()
        .map(|extension| FormatRow {
            extension: extension.to_string(),
            reader: registry
                .resolve(Capability::Read, extension)
                .map(|provider| provider.name().to_string()),
            writer: registry
                .resolve(Capability::Write, extension)
                .map(|provider| provider.name().to_string()),
            compressor_only: registry.is_compressor_only(extension),
        })
        .collect()
}
