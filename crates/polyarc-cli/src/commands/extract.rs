//! Extract command implementation

use super::App;
use crate::cli::ExtractArgs;
use crate::error::ensure_success;
use anyhow::Context;
use anyhow::Result;
use polyarc_core::{DescriptorDefaults, api};
use std::env;

pub fn execute(args: &ExtractArgs, app: &App) -> Result<()> {
    let descriptor = app.descriptor(&args.archive, &DescriptorDefaults::default());
    let entry = app.find_entry(&descriptor, &args.entry)?;

    let destination = match &args.dest {
        Some(dest) => dest.clone(),
        None => env::current_dir()
            .context("Failed to resolve the current directory")?
            .join(entry.name()),
    };
    log::debug!("extracting '{}' to {}", entry.path(), destination.display());

    let outcome = app.runner.run("Extracting", |session| {
        api::extract(&app.registry, session, &destination, &descriptor, &entry)
    });
    ensure_success(&outcome, &args.archive, &app.registry)?;

    app.formatter.format_outcome(
        "Extracted",
        &args.archive,
        &format!("{} -> {}", entry.path(), destination.display()),
    )
}
