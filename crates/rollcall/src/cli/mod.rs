//! Command-line interface for rollcall.
//!
//! This module provides the CLI structure for the `rollcall` binary. With
//! no subcommand the interactive session runs.

mod commands;
mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, LectureCommand, MarkCommand, ReportCommand, StatusCommand, StudentCommand,
};
pub use run::{finish, load_config, run, run_config, Outcome};

use crate::logging::Verbosity;

/// rollcall - Track lecture attendance
///
/// Register students, start lectures, mark attendance and print attendance
/// rates. Run without a command for the interactive menu.
#[derive(Debug, Parser)]
#[command(name = "rollcall")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path to the attendance database (overrides configuration)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub database: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the interactive menu (default)
    Session,

    /// Manage students
    #[command(subcommand)]
    Student(StudentCommand),

    /// Manage lectures
    #[command(subcommand)]
    Lecture(LectureCommand),

    /// Mark a student present for the current lecture
    Mark(MarkCommand),

    /// Print the attendance report
    Report(ReportCommand),

    /// Show database status
    Status(StatusCommand),

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::Trace,
            }
        }
    }

    /// The command to run, defaulting to the interactive session.
    #[must_use]
    pub fn command_or_default(self) -> Command {
        self.command.unwrap_or(Command::Session)
    }
}
