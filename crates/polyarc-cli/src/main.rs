//! polyarc - browse, mutate and verify archives from the command line.

mod cli;
mod commands;
mod error;
mod logger;
mod output;
mod progress;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use commands::App;
use polyarc_core::{MigrationKind, Registry, RegistryConfig};
use progress::Runner;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    logger::init(cli.verbose, cli.quiet);

    let formatter = output::create_formatter(cli.json, cli.verbose, cli.quiet);
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            formatter.format_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &cli::Cli) -> Result<()> {
    let config = cli
        .priorities
        .iter()
        .fold(RegistryConfig::new(), |config, (name, value)| {
            config.with_priority(name.as_str(), value.as_str())
        });
    let registry =
        Registry::with_default_providers(config).context("Failed to register format providers")?;

    let app = App {
        registry,
        formatter: output::create_formatter(cli.json, cli.verbose, cli.quiet),
        runner: Runner::new(!cli.quiet && !cli.json && Runner::should_show()),
        password: cli.password.clone(),
    };

    match &cli.command {
        cli::Commands::List(args) => commands::list::execute(args, &app),
        cli::Commands::Extract(args) => commands::extract::execute(args, &app),
        cli::Commands::Test(args) => commands::verify::execute(args, &app),
        cli::Commands::Create(args) => commands::create::execute(args, &app),
        cli::Commands::Add(args) => commands::add::execute(args, &app),
        cli::Commands::Rm(args) => commands::remove::execute(args, &app),
        cli::Commands::Copy(args) => commands::migrate::execute(args, MigrationKind::Copy, &app),
        cli::Commands::Move(args) => commands::migrate::execute(args, MigrationKind::Move, &app),
        cli::Commands::Formats => commands::formats::execute(&app),
        cli::Commands::Completion(args) => {
            commands::completion::execute(args.shell);
            Ok(())
        }
    }
}
