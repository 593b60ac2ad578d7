//! Error conversion utilities for CLI.
//!
//! Core operations never return errors; they report failures as error events
//! and a `false`/empty result. This module turns those events into
//! user-friendly contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use polyarc_core::events::ErrorEvent;
use polyarc_core::events::ErrorKind;
use polyarc_core::{Capability, Registry};
use std::path::Path;

use crate::progress::Outcome;

/// Converts the error events of a failed operation into one anyhow error.
pub fn convert_error_events(errors: &[ErrorEvent], archive: &Path, registry: &Registry) -> anyhow::Error {
    let Some(first) = errors.first() else {
        return anyhow!("Operation on '{}' failed", archive.display());
    };
    let mut message = format!("{}: '{}'\n{}", first.title, archive.display(), first.body);
    for extra in &errors[1..] {
        message.push_str(&format!("\n{}", extra.body));
    }
    if let Some(hint) = hint(first, registry) {
        message.push_str("\nHINT: ");
        message.push_str(&hint);
    }
    anyhow!(message)
}

fn hint(event: &ErrorEvent, registry: &Registry) -> Option<String> {
    match event.kind {
        ErrorKind::Unsupported if event.body.contains("encrypted") => {
            Some("Pass the archive password with --password.".to_string())
        }
        ErrorKind::Unsupported => Some(format!(
            "Readable formats: {}. Writable formats: {}.",
            registry.supported_extensions(Capability::Read).join(", "),
            registry.supported_extensions(Capability::Write).join(", ")
        )),
        ErrorKind::Integrity => {
            Some("The archive is corrupted; restore it from a known-good copy.".to_string())
        }
        ErrorKind::Mutation => Some("The original archive was left unchanged.".to_string()),
        ErrorKind::Io if event.body.contains("entry not found") => {
            Some("Run `polyarc list` to see the entry paths.".to_string())
        }
        ErrorKind::Io => None,
    }
}

/// Fails unless `ok` is true and no error event was emitted.
pub fn ensure_success(outcome: &Outcome<bool>, archive: &Path, registry: &Registry) -> anyhow::Result<()> {
    if outcome.value && outcome.errors.is_empty() {
        Ok(())
    } else {
        Err(convert_error_events(&outcome.errors, archive, registry))
    }
}
