//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::config::ReportFormat;

/// Student management commands.
#[derive(Debug, Subcommand)]
pub enum StudentCommand {
    /// Register a new student
    Add {
        /// Student ID (badge or card number)
        id: String,
        /// Display name
        name: String,
    },

    /// List registered students
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Lecture management commands.
#[derive(Debug, Subcommand)]
pub enum LectureCommand {
    /// Start a new lecture; it becomes the current lecture
    Start {
        /// Lecture topic (defaults to the configured topic)
        topic: Option<String>,
    },

    /// Show the current lecture
    Current,

    /// List all lectures
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show who attended a lecture
    Show {
        /// Lecture ID
        id: i64,
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Mark command arguments.
#[derive(Debug, Args)]
pub struct MarkCommand {
    /// Student ID to mark present for the current lecture
    pub student_id: String,
}

/// Report command arguments.
#[derive(Debug, Args)]
pub struct ReportCommand {
    /// Output format (defaults to `report.default_format`)
    #[arg(short, long, value_enum)]
    pub format: Option<ReportFormat>,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
