//! `rollcall` - CLI for the attendance tracker
//!
//! Runs the interactive menu by default, or a single store operation when a
//! subcommand is given.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use rollcall::cli::{self, Cli, Command};
use rollcall::{init_logging, Storage};

fn main() -> anyhow::Result<ExitCode> {
    let args = Cli::parse();

    init_logging(args.verbosity());

    let config_path = args.config.clone();
    let database = args.database.clone();
    let command = args.command_or_default();

    // Config commands run before the strict load so `validate` can report
    // on a broken file.
    if let Command::Config(cmd) = command {
        let outcome = cli::run_config(config_path, database, cmd, &mut io::stdout().lock())?;
        return Ok(outcome.into());
    }

    let config = cli::load_config(config_path, database).context("loading configuration")?;

    let db_path = config.database_path();
    let mut storage = Storage::open(&db_path)
        .with_context(|| format!("opening attendance database {}", db_path.display()))?;

    let result = cli::run(
        &mut storage,
        &config,
        command,
        io::stdin().lock(),
        &mut io::stdout().lock(),
    );
    storage.close().context("closing attendance database")?;

    let outcome = cli::finish(result, &mut io::stderr().lock())?;
    Ok(outcome.into())
}
