//! Copy and move commands.
//!
//! The entry is staged in a [`MigrationGuard`], extracted into a scratch
//! directory, restaged under its original parent path and written into the
//! destination archive. A move then deletes it from the source. The guard is
//! cleared whether or not the transfer succeeds.

use super::App;
use crate::cli::MigrateArgs;
use crate::error::ensure_success;
use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use polyarc_core::{
    ArchiveEntry, DescriptorDefaults, MigrationGuard, MigrationKind, StagingOptions, api, staging,
};
use std::path::Path;

pub fn execute(args: &MigrateArgs, kind: MigrationKind, app: &App) -> Result<()> {
    if same_file(&args.source, &args.destination) {
        bail!(
            "Source and destination are the same archive: '{}'",
            args.source.display()
        );
    }

    let source = app.descriptor(&args.source, &DescriptorDefaults::default());
    let entry = app.find_entry(&source, &args.entry)?;

    let mut guard = MigrationGuard::new();
    if !guard.init_migration(kind, entry) {
        bail!("Another operation is already pending on '{}'", args.source.display());
    }
    let result = match guard.entry() {
        Some(entry) => transfer(args, kind, entry, app),
        None => Ok(()),
    };
    let path = guard.entry().map(|entry| entry.path().to_string());
    guard.clear();
    result?;

    let operation = match kind {
        MigrationKind::Move => "Moved",
        MigrationKind::Copy | MigrationKind::Delete => "Copied",
    };
    app.formatter.format_outcome(
        operation,
        &args.destination,
        &format!(
            "{} from {}",
            path.as_deref().unwrap_or_default(),
            args.source.display()
        ),
    )
}

fn transfer(args: &MigrateArgs, kind: MigrationKind, entry: &ArchiveEntry, app: &App) -> Result<()> {
    let source = app.descriptor(&args.source, &DescriptorDefaults::default());
    let destination = app.descriptor(&args.destination, &DescriptorDefaults::default());

    let scratch = tempfile::tempdir().context("Failed to create scratch directory")?;
    let extracted = scratch.path().join(entry.name());
    let outcome = app.runner.run("Extracting", |session| {
        api::extract(&app.registry, session, &extracted, &source, entry)
    });
    ensure_success(&outcome, &args.source, &app.registry)?;

    let mut options = StagingOptions::default();
    if let Some(parent) = entry.parent_path() {
        options = options.with_prefix(parent);
    }
    let staged = staging::stage(&[&extracted], &options).context("Failed to stage extracted entry")?;
    log::debug!("staged {} entries from '{}'", staged.len(), entry.path());

    let outcome = if args.destination.exists() {
        app.runner.run("Adding", |session| {
            api::add(&app.registry, session, &destination, &staged)
        })
    } else {
        app.runner.run("Creating", |session| {
            api::create(&app.registry, session, &destination, &staged)
        })
    };
    ensure_success(&outcome, &args.destination, &app.registry)?;

    if kind == MigrationKind::Move {
        let outcome = app.runner.run("Removing", |session| {
            api::delete(&app.registry, session, &source, entry)
        });
        ensure_success(&outcome, &args.source, &app.registry)?;
    }
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
