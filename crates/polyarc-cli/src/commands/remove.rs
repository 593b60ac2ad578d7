//! Rm command implementation

use super::App;
use crate::cli::RmArgs;
use crate::error::ensure_success;
use anyhow::Result;
use anyhow::bail;
use polyarc_core::{DescriptorDefaults, MigrationGuard, MigrationKind, api};

pub fn execute(args: &RmArgs, app: &App) -> Result<()> {
    let descriptor = app.descriptor(&args.archive, &DescriptorDefaults::default());
    let entry = app.find_entry(&descriptor, &args.entry)?;

    let mut guard = MigrationGuard::new();
    if !guard.init_migration(MigrationKind::Delete, entry) {
        bail!("Another operation is already pending on '{}'", args.archive.display());
    }

    let outcome = app.runner.run("Removing", |session| {
        guard
            .entry()
            .is_some_and(|entry| api::delete(&app.registry, session, &descriptor, entry))
    });
    let removed = guard.entry().map(|entry| entry.path().to_string());
    guard.clear();
    ensure_success(&outcome, &args.archive, &app.registry)?;

    app.formatter
        .format_outcome("Removed", &args.archive, removed.as_deref().unwrap_or_default())
}
