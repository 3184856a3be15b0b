//! Error types for rollcall.
//!
//! Errors fall into two groups. Domain outcomes such as a duplicate student
//! or a second mark for the same lecture are expected and recoverable: the
//! caller reports them and carries on. Everything else comes from the
//! storage, configuration or I/O layers and is treated as fatal.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for rollcall operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Domain Outcomes ===
    /// A student with this id is already registered.
    #[error("student ID {id} already exists")]
    StudentExists {
        /// The duplicate student id.
        id: String,
    },

    /// The student is already marked present for the current lecture.
    #[error("student {student_id} is already marked present for lecture {lecture_id}")]
    AlreadyMarked {
        /// The student that was marked.
        student_id: String,
        /// The lecture the mark was attempted for.
        lecture_id: i64,
    },

    /// Attendance was marked before any lecture was started.
    #[error("no lectures started yet")]
    NoActiveLecture,

    /// The student id is not registered.
    #[error("student ID {id} not found")]
    StudentNotFound {
        /// The unknown student id.
        id: String,
    },

    /// User-supplied input was rejected before reaching storage.
    #[error("invalid {field}: {message}")]
    InvalidInput {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        message: String,
    },

    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system or terminal operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for rollcall operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create an invalid input error for the named field.
    #[must_use]
    pub fn invalid_input(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            message: message.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is an expected outcome the user can act on.
    ///
    /// Recoverable errors never abort a session; everything else is fatal.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::StudentExists { .. }
                | Self::AlreadyMarked { .. }
                | Self::NoActiveLecture
                | Self::StudentNotFound { .. }
                | Self::InvalidInput { .. }
        )
    }

    /// Check if this error reports a duplicate (student or attendance mark).
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::StudentExists { .. } | Self::AlreadyMarked { .. })
    }
}

/// Returns true if the rusqlite error is a UNIQUE or PRIMARY KEY violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
    )
}
