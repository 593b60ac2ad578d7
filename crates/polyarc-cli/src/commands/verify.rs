//! Test command implementation

use super::App;
use crate::cli::TestArgs;
use crate::error::ensure_success;
use anyhow::Result;
use polyarc_core::{DescriptorDefaults, api};

pub fn execute(args: &TestArgs, app: &App) -> Result<()> {
    let descriptor = app.descriptor(&args.archive, &DescriptorDefaults::default());

    let outcome = app
        .runner
        .run("Testing", |session| api::test(&app.registry, session, &descriptor));
    ensure_success(&outcome, &args.archive, &app.registry)?;

    app.formatter
        .format_outcome("Tested", &args.archive, "All checksums match")
}
