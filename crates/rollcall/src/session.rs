//! Interactive menu loop.
//!
//! A [`Session`] borrows the store for its lifetime and drives it from a
//! line-oriented reader. Expected failures (duplicates, unknown students,
//! no lecture yet) are printed and the loop continues; storage and I/O
//! failures end the session with an error.

use std::io::{BufRead, Write};

use regex::Regex;
use tracing::debug;

use crate::config::{Config, DEFAULT_LECTURE_TOPIC};
use crate::error::{Error, Result};
use crate::model::display_time;
use crate::storage::Storage;

const MENU: &[&str] = &[
    "1. Add Student",
    "2. Start New Lecture",
    "3. Mark Attendance",
    "4. Analytics Report",
    "5. Exit",
];

/// Whether the loop should keep going after a menu action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// An interactive attendance session.
#[derive(Debug)]
pub struct Session<'s, R, W> {
    storage: &'s mut Storage,
    input: R,
    output: W,
    default_topic: String,
    id_pattern: Option<Regex>,
}

impl<'s, R: BufRead, W: Write> Session<'s, R, W> {
    /// Create a session with default settings.
    pub fn new(storage: &'s mut Storage, input: R, output: W) -> Self {
        Self {
            storage,
            input,
            output,
            default_topic: DEFAULT_LECTURE_TOPIC.to_string(),
            id_pattern: None,
        }
    }

    /// Apply lecture and student settings from the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured student id pattern is invalid.
    pub fn with_config(mut self, config: &Config) -> Result<Self> {
        self.default_topic.clone_from(&config.lectures.default_topic);
        self.id_pattern = config.student_id_pattern()?;
        Ok(self)
    }

    /// Run the menu loop until the user exits or input ends.
    ///
    /// # Errors
    ///
    /// Returns the first non-recoverable error (storage or I/O failure).
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.print_menu()?;
            let Some(choice) = self.prompt("Select Option: ")? else {
                break;
            };

            let flow = match choice.as_str() {
                "1" => self.add_student()?,
                "2" => self.start_lecture()?,
                "3" => self.mark_attendance()?,
                "4" => self.show_report()?,
                "5" => Flow::Exit,
                other => {
                    writeln!(self.output, "Invalid option: {other}")?;
                    Flow::Continue
                }
            };

            if flow == Flow::Exit {
                break;
            }
        }

        writeln!(self.output, "System Shutdown.")?;
        self.output.flush()?;
        Ok(())
    }

    fn print_menu(&mut self) -> Result<()> {
        writeln!(self.output)?;
        for line in MENU {
            writeln!(self.output, "{line}")?;
        }
        Ok(())
    }

    /// Write a prompt and read one trimmed line. `None` means end of input.
    ///
    /// Bytes that are not UTF-8 become U+FFFD, so a garbled scan is rejected
    /// like any other bad input instead of ending the session.
    fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.output, "{label}")?;
        self.output.flush()?;

        let mut line = Vec::new();
        if self.input.read_until(b'\n', &mut line)? == 0 {
            debug!("Input closed at prompt {:?}", label);
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&line).trim().to_string()))
    }

    fn add_student(&mut self) -> Result<Flow> {
        let Some(id) = self.prompt("Enter ID: ")? else {
            return Ok(Flow::Exit);
        };
        let Some(name) = self.prompt("Enter Name: ")? else {
            return Ok(Flow::Exit);
        };

        let result = check_student_input(&id, &name, self.id_pattern.as_ref())
            .and_then(|()| self.storage.add_student(&id, &name));
        match result {
            Ok(student) => writeln!(
                self.output,
                "Success: Student {} added to database.",
                student.name
            )?,
            Err(err) => self.print_recoverable(err)?,
        }
        Ok(Flow::Continue)
    }

    fn start_lecture(&mut self) -> Result<Flow> {
        let Some(topic) = self.prompt("Enter Lecture Topic (e.g., Physics, Calculus): ")? else {
            return Ok(Flow::Exit);
        };
        let topic = if topic.is_empty() {
            self.default_topic.clone()
        } else {
            topic
        };

        let lecture = self.storage.start_lecture(&topic)?;
        writeln!(
            self.output,
            "New Lecture Started (ID: {}) - Topic: {}",
            lecture.id, lecture.topic
        )?;
        Ok(Flow::Continue)
    }

    fn mark_attendance(&mut self) -> Result<Flow> {
        let Some(student_id) = self.prompt("Scan Student ID: ")? else {
            return Ok(Flow::Exit);
        };

        match self.storage.mark_attendance(&student_id) {
            Ok(record) => {
                let name = self.student_name(&student_id)?;
                writeln!(
                    self.output,
                    "Success: Attendance marked for {name} at {}",
                    display_time(&record.marked_at)
                )?;
            }
            Err(Error::AlreadyMarked { student_id, .. }) => {
                let name = self.student_name(&student_id)?;
                writeln!(
                    self.output,
                    "Warning: {name} is already marked present for this lecture."
                )?;
            }
            Err(err) => self.print_recoverable(err)?,
        }
        Ok(Flow::Continue)
    }

    fn show_report(&mut self) -> Result<Flow> {
        let report = self.storage.report()?;
        write!(self.output, "{}", report.render_table())?;
        Ok(Flow::Continue)
    }

    fn student_name(&self, id: &str) -> Result<String> {
        Ok(self
            .storage
            .get_student(id)?
            .map_or_else(|| id.to_string(), |s| s.name))
    }

    /// Print a recoverable error, or hand a fatal one back to the caller.
    fn print_recoverable(&mut self, err: Error) -> Result<()> {
        if !err.is_recoverable() {
            return Err(err);
        }
        writeln!(self.output, "{}", user_message(&err))?;
        Ok(())
    }
}

/// Check a student id and name before they reach storage.
///
/// Both must be non-empty after trimming, and the id must match `id_pattern`
/// when one is configured.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] naming the rejected field.
pub fn check_student_input(id: &str, name: &str, id_pattern: Option<&Regex>) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::invalid_input("student ID", "must not be empty"));
    }
    if name.trim().is_empty() {
        return Err(Error::invalid_input("name", "must not be empty"));
    }
    if let Some(pattern) = id_pattern {
        if !pattern.is_match(id) {
            return Err(Error::invalid_input(
                "student ID",
                format!("{id} does not match the required format"),
            ));
        }
    }
    Ok(())
}

/// The line shown to the user for a recoverable error.
#[must_use]
pub fn user_message(err: &Error) -> String {
    match err {
        Error::StudentExists { id } => format!("Error: Student ID {id} already exists!"),
        Error::StudentNotFound { id } => {
            format!("Error: Student ID {id} not found in database.")
        }
        Error::NoActiveLecture => "Error: No lectures started yet.".to_string(),
        Error::AlreadyMarked { student_id, .. } => {
            format!("Warning: {student_id} is already marked present for this lecture.")
        }
        other => format!("Error: {other}"),
    }
}
