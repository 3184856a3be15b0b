//! Command execution.
//!
//! The binary parses arguments and owns the terminal; everything between
//! parsing and the exit code lives here so it can run against an in-memory
//! store and plain buffers.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use tracing::debug;

use super::{
    Command, ConfigCommand, LectureCommand, MarkCommand, ReportCommand, StatusCommand,
    StudentCommand,
};
use crate::config::{Config, ReportFormat};
use crate::error::{Error, Result};
use crate::model::display_time;
use crate::session::{check_student_input, user_message, Session};
use crate::storage::Storage;

/// How a command finished, as seen by the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The command did what was asked.
    Success,
    /// The command was refused for a reason the user can act on.
    Failure,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => ExitCode::SUCCESS,
            Outcome::Failure => ExitCode::FAILURE,
        }
    }
}

/// Load configuration and apply the `--database` override.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or is invalid.
pub fn load_config(config_path: Option<PathBuf>, database: Option<PathBuf>) -> Result<Config> {
    let mut config = Config::load_from(config_path)?;
    if let Some(database) = database {
        config.storage.database_path = Some(database);
    }
    Ok(config)
}

/// Run a store command against an open database.
///
/// `input` is only read by the interactive session.
///
/// # Errors
///
/// Returns recoverable domain errors as well as fatal ones; pass the result
/// to [`finish`] to turn it into an [`Outcome`].
pub fn run<R: BufRead, W: Write>(
    storage: &mut Storage,
    config: &Config,
    command: Command,
    input: R,
    out: &mut W,
) -> Result<()> {
    match command {
        Command::Session => Session::new(storage, input, out)
            .with_config(config)?
            .run(),
        Command::Student(cmd) => handle_student(storage, config, cmd, out),
        Command::Lecture(cmd) => handle_lecture(storage, config, cmd, out),
        Command::Mark(cmd) => handle_mark(storage, &cmd, out),
        Command::Report(cmd) => handle_report(storage, config, &cmd, out),
        Command::Status(cmd) => handle_status(storage, &cmd, out),
        Command::Config(_) => Err(Error::internal(
            "config commands run without opening the database",
        )),
    }
}

/// Classify a command result.
///
/// Recoverable errors are written to `err_out` and yield
/// [`Outcome::Failure`]; fatal errors are returned.
///
/// # Errors
///
/// Returns the original error if it is not recoverable, or an I/O error if
/// `err_out` cannot be written.
pub fn finish<W: Write>(result: Result<()>, err_out: &mut W) -> Result<Outcome> {
    match result {
        Ok(()) => Ok(Outcome::Success),
        Err(err) if err.is_recoverable() => {
            debug!("Command refused: {}", err);
            writeln!(err_out, "{}", user_message(&err))?;
            Ok(Outcome::Failure)
        }
        Err(err) => Err(err),
    }
}

/// Run a `config` subcommand.
///
/// Runs before any configuration is loaded, so `validate` can report on a
/// broken file instead of failing to start.
///
/// # Errors
///
/// Returns an error if `show` cannot load the configuration or output fails.
pub fn run_config<W: Write>(
    config_path: Option<PathBuf>,
    database: Option<PathBuf>,
    cmd: ConfigCommand,
    out: &mut W,
) -> Result<Outcome> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = load_config(config_path, database)?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&config)?)?;
            } else {
                write_config(&config, out)?;
            }
        }
        ConfigCommand::Path => {
            let path = config_path.unwrap_or_else(Config::default_config_path);
            writeln!(out, "{}", path.display())?;
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            writeln!(out, "Validating configuration: {}", path.display())?;
            if let Err(err) = Config::load_from(Some(path)) {
                writeln!(out, "Configuration error: {err}")?;
                return Ok(Outcome::Failure);
            }
            writeln!(out, "Configuration is valid.")?;
        }
    }
    Ok(Outcome::Success)
}

fn write_config<W: Write>(config: &Config, out: &mut W) -> Result<()> {
    writeln!(out, "Current Configuration")?;
    writeln!(out, "=====================")?;
    writeln!(out)?;
    writeln!(out, "[Storage]")?;
    writeln!(out, "  Database path:    {}", config.database_path().display())?;
    writeln!(out)?;
    writeln!(out, "[Students]")?;
    writeln!(
        out,
        "  ID pattern:       {}",
        config.students.id_pattern.as_deref().unwrap_or("(any)")
    )?;
    writeln!(out)?;
    writeln!(out, "[Lectures]")?;
    writeln!(out, "  Default topic:    {}", config.lectures.default_topic)?;
    writeln!(out)?;
    writeln!(out, "[Report]")?;
    writeln!(out, "  Default format:   {:?}", config.report.default_format)?;
    Ok(())
}

fn handle_student<W: Write>(
    storage: &mut Storage,
    config: &Config,
    cmd: StudentCommand,
    out: &mut W,
) -> Result<()> {
    match cmd {
        StudentCommand::Add { id, name } => {
            let (id, name) = (id.trim(), name.trim());
            check_student_input(id, name, config.student_id_pattern()?.as_ref())?;
            let student = storage.add_student(id, name)?;
            writeln!(out, "Added student {} ({})", student.id, student.name)?;
        }
        StudentCommand::List { json } => {
            let students = storage.list_students()?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&students)?)?;
            } else if students.is_empty() {
                writeln!(out, "No students registered.")?;
            } else {
                writeln!(out, "{:<12} | {:<20} | Registered", "ID", "Name")?;
                writeln!(out, "{}", "-".repeat(56))?;
                for student in students {
                    writeln!(
                        out,
                        "{:<12} | {:<20} | {}",
                        student.id,
                        student.name,
                        display_time(&student.created_at)
                    )?;
                }
            }
        }
    }
    Ok(())
}

fn handle_lecture<W: Write>(
    storage: &mut Storage,
    config: &Config,
    cmd: LectureCommand,
    out: &mut W,
) -> Result<()> {
    match cmd {
        LectureCommand::Start { topic } => {
            let topic = topic
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| config.lectures.default_topic.clone());
            let lecture = storage.start_lecture(&topic)?;
            writeln!(
                out,
                "New Lecture Started (ID: {}) - Topic: {}",
                lecture.id, lecture.topic
            )?;
        }
        LectureCommand::Current => match storage.current_lecture()? {
            Some(lecture) => writeln!(
                out,
                "Current lecture: {} - {} (started {})",
                lecture.id,
                lecture.topic,
                display_time(&lecture.started_at)
            )?,
            None => writeln!(out, "No lectures started yet.")?,
        },
        LectureCommand::List { json } => {
            let lectures = storage.list_lectures()?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&lectures)?)?;
            } else if lectures.is_empty() {
                writeln!(out, "No lectures started yet.")?;
            } else {
                writeln!(out, "{:<6} | {:<24} | Started", "ID", "Topic")?;
                writeln!(out, "{}", "-".repeat(56))?;
                for lecture in lectures {
                    writeln!(
                        out,
                        "{:<6} | {:<24} | {}",
                        lecture.id,
                        lecture.topic,
                        display_time(&lecture.started_at)
                    )?;
                }
            }
        }
        LectureCommand::Show { id, json } => {
            let lecture = storage
                .get_lecture(id)?
                .ok_or_else(|| Error::invalid_input("lecture ID", format!("no lecture {id}")))?;
            let records = storage.lecture_attendance(id)?;
            if json {
                let value = serde_json::json!({ "lecture": lecture, "attendance": records });
                writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
            } else {
                writeln!(out, "Lecture {} - {}", lecture.id, lecture.topic)?;
                writeln!(out, "Started: {}", display_time(&lecture.started_at))?;
                writeln!(out, "Present: {}", records.len())?;
                for record in records {
                    let name = storage
                        .get_student(&record.student_id)?
                        .map_or_else(|| record.student_id.clone(), |s| s.name);
                    writeln!(
                        out,
                        "  {:<12} {:<20} {}",
                        record.student_id,
                        name,
                        display_time(&record.marked_at)
                    )?;
                }
            }
        }
    }
    Ok(())
}

fn handle_mark<W: Write>(storage: &mut Storage, cmd: &MarkCommand, out: &mut W) -> Result<()> {
    let record = storage.mark_attendance(cmd.student_id.trim())?;
    let name = storage
        .get_student(&record.student_id)?
        .map_or_else(|| record.student_id.clone(), |s| s.name);
    writeln!(
        out,
        "Attendance marked for {name} (lecture {}) at {}",
        record.lecture_id,
        display_time(&record.marked_at)
    )?;
    Ok(())
}

fn handle_report<W: Write>(
    storage: &Storage,
    config: &Config,
    cmd: &ReportCommand,
    out: &mut W,
) -> Result<()> {
    let report = storage.report()?;
    match cmd.format.unwrap_or(config.report.default_format) {
        ReportFormat::Table => write!(out, "{}", report.render_table())?,
        ReportFormat::Json => writeln!(out, "{}", report.to_json()?)?,
    }
    Ok(())
}

fn handle_status<W: Write>(storage: &Storage, cmd: &StatusCommand, out: &mut W) -> Result<()> {
    let stats = storage.stats()?;
    if cmd.json {
        let status = serde_json::json!({
            "database_path": storage.path(),
            "stats": stats,
        });
        writeln!(out, "{}", serde_json::to_string_pretty(&status)?)?;
    } else {
        writeln!(out, "rollcall status")?;
        writeln!(out, "---------------")?;
        writeln!(out, "Database:        {}", storage.path().display())?;
        writeln!(out, "Size:            {} bytes", stats.db_size_bytes)?;
        writeln!(out, "Students:        {}", stats.students)?;
        writeln!(out, "Lectures:        {}", stats.lectures)?;
        writeln!(out, "Marks:           {}", stats.attendance_records)?;
        match stats.current_lecture_id {
            Some(id) => writeln!(out, "Current lecture: {id}")?,
            None => writeln!(out, "Current lecture: none")?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};

    fn exec(storage: &mut Storage, config: &Config, command: Command) -> (Result<()>, String) {
        let mut out = Vec::new();
        let result = run(storage, config, command, io::empty(), &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_outcome_exit_codes() {
        assert_eq!(
            format!("{:?}", ExitCode::from(Outcome::Success)),
            format!("{:?}", ExitCode::SUCCESS)
        );
        assert_eq!(
            format!("{:?}", ExitCode::from(Outcome::Failure)),
            format!("{:?}", ExitCode::FAILURE)
        );
    }

    #[test]
    fn test_lecture_start_without_topic_uses_configured_default() {
        let mut storage = Storage::open_in_memory().unwrap();
        let mut config = Config::default();
        config.lectures.default_topic = "Lab".to_string();

        let (result, out) = exec(
            &mut storage,
            &config,
            Command::Lecture(LectureCommand::Start { topic: None }),
        );
        result.unwrap();
        assert_eq!(out, "New Lecture Started (ID: 1) - Topic: Lab\n");

        let (result, _) = exec(
            &mut storage,
            &config,
            Command::Lecture(LectureCommand::Start {
                topic: Some("   ".to_string()),
            }),
        );
        result.unwrap();
        assert_eq!(storage.get_lecture(2).unwrap().unwrap().topic, "Lab");
    }

    #[test]
    fn test_duplicate_mark_is_a_failure_outcome() {
        let mut storage = Storage::open_in_memory().unwrap();
        let config = Config::default();
        storage.add_student("S1", "Alice").unwrap();
        storage.start_lecture("Physics").unwrap();

        let mark = || {
            Command::Mark(MarkCommand {
                student_id: " S1 ".to_string(),
            })
        };

        let (result, out) = exec(&mut storage, &config, mark());
        assert!(out.starts_with("Attendance marked for Alice (lecture 1) at "));
        let mut err_out = Vec::new();
        assert_eq!(finish(result, &mut err_out).unwrap(), Outcome::Success);
        assert!(err_out.is_empty());

        let (result, out) = exec(&mut storage, &config, mark());
        assert!(out.is_empty());
        let mut err_out = Vec::new();
        assert_eq!(finish(result, &mut err_out).unwrap(), Outcome::Failure);
        assert_eq!(
            String::from_utf8(err_out).unwrap(),
            "Warning: S1 is already marked present for this lecture.\n"
        );
    }

    #[test]
    fn test_mark_without_lecture_is_a_failure_outcome() {
        let mut storage = Storage::open_in_memory().unwrap();
        let (result, _) = exec(
            &mut storage,
            &Config::default(),
            Command::Mark(MarkCommand {
                student_id: "S1".to_string(),
            }),
        );

        let mut err_out = Vec::new();
        assert_eq!(finish(result, &mut err_out).unwrap(), Outcome::Failure);
        assert_eq!(
            String::from_utf8(err_out).unwrap(),
            "Error: No lectures started yet.\n"
        );
    }

    #[test]
    fn test_fatal_error_is_returned_by_finish() {
        let mut err_out = Vec::new();
        let err = finish(Err(Error::internal("boom")), &mut err_out).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
        assert!(err_out.is_empty());
    }

    #[test]
    fn test_student_add_checks_input() {
        let mut storage = Storage::open_in_memory().unwrap();
        let mut config = Config::default();
        config.students.id_pattern = Some(r"S\d+".to_string());

        let add = |id: &str| {
            Command::Student(StudentCommand::Add {
                id: id.to_string(),
                name: "Alice".to_string(),
            })
        };

        let (result, _) = exec(&mut storage, &config, add("X1"));
        assert!(matches!(result, Err(Error::InvalidInput { .. })));

        let (result, out) = exec(&mut storage, &config, add(" S1 "));
        result.unwrap();
        assert_eq!(out, "Added student S1 (Alice)\n");

        let (result, _) = exec(&mut storage, &config, add("S1"));
        assert!(matches!(result, Err(Error::StudentExists { .. })));
    }

    #[test]
    fn test_lecture_show() {
        let mut storage = Storage::open_in_memory().unwrap();
        let config = Config::default();
        storage.add_student("S1", "Alice").unwrap();
        storage.add_student("S2", "Bob").unwrap();
        let lecture = storage.start_lecture("Physics").unwrap();
        storage.mark_attendance("S2").unwrap();

        let (result, out) = exec(
            &mut storage,
            &config,
            Command::Lecture(LectureCommand::Show {
                id: lecture.id,
                json: false,
            }),
        );
        result.unwrap();
        assert!(out.starts_with("Lecture 1 - Physics\n"));
        assert!(out.contains("Present: 1\n"));
        assert!(out.contains("Bob"));
        assert!(!out.contains("Alice"));

        let (result, out) = exec(
            &mut storage,
            &config,
            Command::Lecture(LectureCommand::Show {
                id: lecture.id,
                json: true,
            }),
        );
        result.unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["lecture"]["topic"], "Physics");
        assert_eq!(value["attendance"][0]["student_id"], "S2");
    }

    #[test]
    fn test_lecture_show_unknown_id_is_recoverable() {
        let mut storage = Storage::open_in_memory().unwrap();
        let (result, _) = exec(
            &mut storage,
            &Config::default(),
            Command::Lecture(LectureCommand::Show { id: 7, json: false }),
        );

        let err = result.unwrap_err();
        assert!(err.is_recoverable());
        assert!(user_message(&err).contains("no lecture 7"));
    }

    #[test]
    fn test_report_uses_configured_format() {
        let mut storage = Storage::open_in_memory().unwrap();
        let mut config = Config::default();
        config.report.default_format = ReportFormat::Json;
        storage.add_student("S1", "Alice").unwrap();
        storage.start_lecture("Physics").unwrap();

        let (result, out) = exec(
            &mut storage,
            &config,
            Command::Report(ReportCommand { format: None }),
        );
        result.unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["rows"][0]["status"], "CRITICAL");

        let (result, out) = exec(
            &mut storage,
            &config,
            Command::Report(ReportCommand {
                format: Some(ReportFormat::Table),
            }),
        );
        result.unwrap();
        assert!(out.contains("Total Lectures Conducted: 1"));
    }

    #[test]
    fn test_status() {
        let mut storage = Storage::open_in_memory().unwrap();
        storage.start_lecture("Physics").unwrap();

        let (result, out) = exec(
            &mut storage,
            &Config::default(),
            Command::Status(StatusCommand { json: true }),
        );
        result.unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["stats"]["lectures"], 1);
        assert_eq!(value["stats"]["current_lecture_id"], 1);
    }

    #[test]
    fn test_session_command_reads_input() {
        let mut storage = Storage::open_in_memory().unwrap();
        let mut out = Vec::new();
        run(
            &mut storage,
            &Config::default(),
            Command::Session,
            Cursor::new("1\nS1\nAlice\n5\n"),
            &mut out,
        )
        .unwrap();

        assert!(String::from_utf8(out).unwrap().ends_with("System Shutdown.\n"));
        assert!(storage.get_student("S1").unwrap().is_some());
    }

    #[test]
    fn test_config_command_rejected_by_run() {
        let mut storage = Storage::open_in_memory().unwrap();
        let (result, _) = exec(
            &mut storage,
            &Config::default(),
            Command::Config(ConfigCommand::Path),
        );
        assert!(matches!(result, Err(Error::Internal(_))));
    }

    #[test]
    fn test_validate_reports_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        let bad = write_file(&dir, "bad.toml", "[students]\nid_pattern = \"(unclosed\"\n");

        let mut out = Vec::new();
        let outcome = run_config(
            None,
            None,
            ConfigCommand::Validate {
                file: Some(bad.clone()),
            },
            &mut out,
        )
        .unwrap();

        assert_eq!(outcome, Outcome::Failure);
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains(&format!("Validating configuration: {}", bad.display())));
        assert!(out.contains("Configuration error:"));
        assert!(!out.contains("Configuration is valid."));
    }

    #[test]
    fn test_validate_falls_back_to_config_flag() {
        let dir = tempfile::tempdir().unwrap();
        let bad = write_file(&dir, "bad.toml", "[lectures]\ndefault_topic = \"  \"\n");
        let good = write_file(&dir, "good.toml", "[lectures]\ndefault_topic = \"Lab\"\n");

        let mut out = Vec::new();
        let outcome = run_config(
            Some(bad.clone()),
            None,
            ConfigCommand::Validate { file: None },
            &mut out,
        )
        .unwrap();
        assert_eq!(outcome, Outcome::Failure);

        // An explicit file wins over a broken `--config`.
        let mut out = Vec::new();
        let outcome = run_config(
            Some(bad),
            None,
            ConfigCommand::Validate { file: Some(good) },
            &mut out,
        )
        .unwrap();
        assert_eq!(outcome, Outcome::Success);
        assert!(String::from_utf8(out)
            .unwrap()
            .ends_with("Configuration is valid.\n"));
    }

    #[test]
    fn test_config_show_applies_database_override() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(&dir, "config.toml", "[lectures]\ndefault_topic = \"Lab\"\n");

        let mut out = Vec::new();
        let outcome = run_config(
            Some(file),
            Some(PathBuf::from("/tmp/override.db")),
            ConfigCommand::Show { json: true },
            &mut out,
        )
        .unwrap();

        assert_eq!(outcome, Outcome::Success);
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["storage"]["database_path"], "/tmp/override.db");
        assert_eq!(value["lectures"]["default_topic"], "Lab");
    }

    #[test]
    fn test_config_show_fails_on_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        let bad = write_file(&dir, "bad.toml", "[students]\nid_pattern = \"(unclosed\"\n");

        let err = run_config(Some(bad), None, ConfigCommand::Show { json: false }, &mut Vec::new())
            .unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));
    }
}
