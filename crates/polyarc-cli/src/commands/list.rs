//! List command implementation

use super::App;
use crate::cli::ListArgs;
use anyhow::Result;
use polyarc_core::DescriptorDefaults;

pub fn execute(args: &ListArgs, app: &App) -> Result<()> {
    let descriptor = app.descriptor(&args.archive, &DescriptorDefaults::default());
    let entries = app.list(&descriptor)?;
    log::debug!("{} entries in {descriptor}", entries.len());

    app.formatter
        .format_entries(&args.archive, &entries, args.long, args.human_readable)
}
