//! `SQLite` schema definitions for rollcall.

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// SQL statement to create the students table.
pub const CREATE_STUDENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS students (
    student_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL
)
";

/// SQL statement to create the lectures table.
///
/// `AUTOINCREMENT` keeps ids strictly increasing, so the newest lecture
/// always has the greatest id.
pub const CREATE_LECTURES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS lectures (
    lecture_id INTEGER PRIMARY KEY AUTOINCREMENT,
    topic TEXT NOT NULL,
    started_at TEXT NOT NULL
)
";

/// SQL statement to create the attendance join table.
pub const CREATE_ATTENDANCE_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS attendance (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    student_id TEXT NOT NULL REFERENCES students(student_id),
    lecture_id INTEGER NOT NULL REFERENCES lectures(lecture_id),
    marked_at TEXT NOT NULL,
    UNIQUE(student_id, lecture_id)
)
";

/// SQL statement to index attendance by lecture for per-lecture listings.
pub const CREATE_ATTENDANCE_LECTURE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_attendance_lecture ON attendance(lecture_id)
";

/// Statements that make up schema version 1.
pub const V1_STATEMENTS: &[&str] = &[
    CREATE_STUDENTS_TABLE,
    CREATE_LECTURES_TABLE,
    CREATE_ATTENDANCE_TABLE,
];

/// Statements that make up schema version 2.
pub const V2_STATEMENTS: &[&str] = &[CREATE_ATTENDANCE_LECTURE_INDEX];
