//! Create command implementation

use super::App;
use super::staging_options;
use crate::cli::CreateArgs;
use crate::cli::MethodArg;
use crate::error::ensure_success;
use anyhow::Context;
use anyhow::Result;
use polyarc_core::{CompressionMethod, DescriptorDefaults, api, staging};

pub fn execute(args: &CreateArgs, app: &App) -> Result<()> {
    let mut defaults = DescriptorDefaults::default();
    if let Some(level) = args.compression_level {
        defaults = defaults.with_compression_level(level);
    }
    if let Some(method) = args.method {
        defaults = defaults.with_compression_method(match method {
            MethodArg::Stored => CompressionMethod::Stored,
            MethodArg::Deflated => CompressionMethod::Deflated,
        });
    }
    let descriptor = app.descriptor(&args.archive, &defaults);

    if args.sources.is_empty() {
        app.formatter
            .format_warning("No sources given; creating an empty archive");
    }
    let options = staging_options(&args.staging, args.prefix.as_deref());
    let entries = staging::stage(&args.sources, &options).context("Failed to stage sources")?;
    log::debug!("staged {} entries for {descriptor}", entries.len());

    let outcome = app.runner.run("Creating", |session| {
        api::create(&app.registry, session, &descriptor, &entries)
    });
    ensure_success(&outcome, &args.archive, &app.registry)?;

    app.formatter.format_outcome(
        "Created",
        &args.archive,
        &format!("{} entries", entries.len()),
    )
}
