//! Add command implementation

use super::App;
use super::staging_options;
use crate::cli::AddArgs;
use crate::error::ensure_success;
use anyhow::Context;
use anyhow::Result;
use polyarc_core::{DescriptorDefaults, api, staging};

pub fn execute(args: &AddArgs, app: &App) -> Result<()> {
    let descriptor = app.descriptor(&args.archive, &DescriptorDefaults::default());
    let options = staging_options(&args.staging, args.prefix.as_deref());
    let entries = staging::stage(&args.sources, &options).context("Failed to stage sources")?;

    let outcome = app.runner.run("Adding", |session| {
        api::add(&app.registry, session, &descriptor, &entries)
    });
    ensure_success(&outcome, &args.archive, &app.registry)?;

    app.formatter.format_outcome(
        "Added",
        &args.archive,
        &format!("{} entries", entries.len()),
    )
}
