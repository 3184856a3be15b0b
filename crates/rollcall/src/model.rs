//! Core record types for rollcall.
//!
//! Students, lectures and attendance marks are immutable once stored; the
//! storage layer is the only place that creates them from database rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    /// Externally supplied identifier (badge or card number).
    pub id: String,
    /// Display name.
    pub name: String,
    /// When the student was registered.
    pub created_at: DateTime<Utc>,
}

impl Student {
    /// Create a new student registered now.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// A lecture session.
///
/// The lecture with the greatest id is the current lecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lecture {
    /// Sequential identifier assigned by storage.
    pub id: i64,
    /// Topic or subject label.
    pub topic: String,
    /// When the lecture was started.
    pub started_at: DateTime<Utc>,
}

/// The fact that a student was present at a lecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// The student that was marked.
    pub student_id: String,
    /// The lecture the student attended.
    pub lecture_id: i64,
    /// When the mark was recorded.
    pub marked_at: DateTime<Utc>,
}

/// Format a timestamp for terminal output in the local timezone.
#[must_use]
pub fn display_time(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
