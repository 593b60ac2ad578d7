//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "polyarc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output and debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Provider priority override, e.g. `zip=5` (can be repeated)
    #[arg(long = "priority", global = true, value_name = "NAME=VALUE", value_parser = parse_priority)]
    pub priorities: Vec<(String, String)>,

    /// Archive password (read and write)
    #[arg(long, global = true, value_name = "PASSWORD")]
    pub password: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List archive contents as a tree
    List(ListArgs),
    /// Extract one entry (file or folder) from an archive
    Extract(ExtractArgs),
    /// Verify archive checksums
    Test(TestArgs),
    /// Create a new archive
    Create(CreateArgs),
    /// Add files to an existing archive
    Add(AddArgs),
    /// Remove an entry (and its contents) from an archive
    Rm(RmArgs),
    /// Copy an entry from one archive into another
    Copy(MigrateArgs),
    /// Move an entry from one archive into another
    Move(MigrateArgs),
    /// Show registered formats and their providers
    Formats,
    /// Generate shell completions
    Completion(CompletionArgs),
}

#[derive(clap::Args)]
pub struct ListArgs {
    /// Path to the archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Show sizes, hashes and modes
    #[arg(short, long)]
    pub long: bool,

    /// Show sizes in human-readable format
    #[arg(short = 'H', long)]
    pub human_readable: bool,
}

#[derive(clap::Args)]
pub struct ExtractArgs {
    /// Path to the archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Entry path inside the archive
    #[arg(value_name = "ENTRY")]
    pub entry: String,

    /// Where the entry is materialized (default: its name in the current
    /// directory)
    #[arg(value_name = "DEST")]
    pub dest: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct TestArgs {
    /// Path to the archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MethodArg {
    Stored,
    Deflated,
}

#[derive(clap::Args)]
pub struct StagingArgs {
    /// Follow symbolic links instead of storing them as links
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Skip hidden files and directories
    #[arg(long)]
    pub no_hidden: bool,

    /// Exclude pattern: exact name, `prefix*` or `*suffix` (can be repeated)
    #[arg(long = "exclude", short = 'x', value_name = "PATTERN")]
    pub exclude: Vec<String>,
}

#[derive(clap::Args)]
pub struct CreateArgs {
    /// Output archive file path
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Source files or directories to archive
    #[arg(value_name = "SOURCE")]
    pub sources: Vec<PathBuf>,

    /// Compression level (0-9)
    #[arg(short = 'l', long, value_parser = clap::value_parser!(u8).range(0..=9))]
    pub compression_level: Option<u8>,

    /// Compression method (zip only)
    #[arg(long, value_enum)]
    pub method: Option<MethodArg>,

    /// Directory inside the archive to place sources under
    #[arg(long, value_name = "DIR")]
    pub prefix: Option<String>,

    #[command(flatten)]
    pub staging: StagingArgs,
}

#[derive(clap::Args)]
pub struct AddArgs {
    /// Path to the archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Source files or directories to add
    #[arg(value_name = "SOURCE", required = true)]
    pub sources: Vec<PathBuf>,

    /// Directory inside the archive to place sources under
    #[arg(long, value_name = "DIR")]
    pub prefix: Option<String>,

    #[command(flatten)]
    pub staging: StagingArgs,
}

#[derive(clap::Args)]
pub struct RmArgs {
    /// Path to the archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Entry path inside the archive
    #[arg(value_name = "ENTRY")]
    pub entry: String,
}

#[derive(clap::Args)]
pub struct MigrateArgs {
    /// Archive to take the entry from
    #[arg(value_name = "SRC_ARCHIVE")]
    pub source: PathBuf,

    /// Entry path inside the source archive
    #[arg(value_name = "ENTRY")]
    pub entry: String,

    /// Archive to put the entry into (created if missing)
    #[arg(value_name = "DST_ARCHIVE")]
    pub destination: PathBuf,
}

#[derive(clap::Args)]
pub struct CompletionArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Parse a `NAME=VALUE` provider priority.
///
/// The value is kept as text; the registry decides whether it is a number.
fn parse_priority(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got: {s}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing provider name in: {s}"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
