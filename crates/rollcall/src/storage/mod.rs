//! Storage layer for rollcall.
//!
//! This module provides `SQLite`-based persistent storage for students,
//! lectures and attendance marks, plus the aggregation behind the report.
//! Every mutation runs in its own transaction and is committed before the
//! call returns.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{is_unique_violation, Error, Result};
use crate::model::{AttendanceRecord, Lecture, Student};
use crate::report::{Report, ReportRow};

/// The attendance store.
///
/// Owns the single database connection for a session. Dropping the handle
/// releases the connection; [`Storage::close`] does the same but reports
/// any error from the close itself.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create an attendance database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist,
    /// then brings the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let mut conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // FULL: a commit is on disk before the call returns.
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL; PRAGMA foreign_keys=ON;",
        )?;
        migrations::initialize_schema(&mut conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::initialize_schema(&mut conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the underlying connection.
    ///
    /// # Errors
    ///
    /// Returns an error if `SQLite` fails to close the connection cleanly.
    pub fn close(self) -> Result<()> {
        let path = self.path;
        self.conn.close().map_err(|(_, err)| Error::from(err))?;
        info!("Database closed at {}", path.display());
        Ok(())
    }

    /// Register a new student.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StudentExists`] if the id is already registered (the
    /// existing record is left untouched), or a storage error.
    pub fn add_student(&mut self, id: &str, name: &str) -> Result<Student> {
        let student = Student::new(id, name);

        let tx = self.conn.transaction()?;
        let inserted = tx.execute(
            "INSERT INTO students (student_id, name, created_at) VALUES (?1, ?2, ?3)",
            params![student.id, student.name, student.created_at.to_rfc3339()],
        );
        match inserted {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                debug!("Rejected duplicate student id {}", id);
                return Err(Error::StudentExists { id: id.to_string() });
            }
            Err(err) => return Err(err.into()),
        }
        tx.commit()?;

        info!("Added student {} ({})", student.id, student.name);
        Ok(student)
    }

    /// Get a student by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_student(&self, id: &str) -> Result<Option<Student>> {
        let student = self
            .conn
            .query_row(
                "SELECT student_id, name, created_at FROM students WHERE student_id = ?1",
                [id],
                row_to_student,
            )
            .optional()?;
        Ok(student)
    }

    /// List all students in registration order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_students(&self) -> Result<Vec<Student>> {
        let mut stmt = self
            .conn
            .prepare("SELECT student_id, name, created_at FROM students ORDER BY rowid")?;
        let students = stmt
            .query_map([], row_to_student)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(students)
    }

    /// Start a new lecture, which becomes the current lecture.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn start_lecture(&mut self, topic: &str) -> Result<Lecture> {
        let started_at = Utc::now();

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO lectures (topic, started_at) VALUES (?1, ?2)",
            params![topic, started_at.to_rfc3339()],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        info!("Started lecture {} ({})", id, topic);
        Ok(Lecture {
            id,
            topic: topic.to_string(),
            started_at,
        })
    }

    /// Id of the current lecture (the greatest id), or `None` if no lecture
    /// has been started.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn current_lecture_id(&self) -> Result<Option<i64>> {
        current_lecture_id(&self.conn)
    }

    /// The current lecture, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn current_lecture(&self) -> Result<Option<Lecture>> {
        match self.current_lecture_id()? {
            Some(id) => self.get_lecture(id),
            None => Ok(None),
        }
    }

    /// Get a lecture by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_lecture(&self, id: i64) -> Result<Option<Lecture>> {
        let lecture = self
            .conn
            .query_row(
                "SELECT lecture_id, topic, started_at FROM lectures WHERE lecture_id = ?1",
                [id],
                row_to_lecture,
            )
            .optional()?;
        Ok(lecture)
    }

    /// List all lectures, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_lectures(&self) -> Result<Vec<Lecture>> {
        let mut stmt = self
            .conn
            .prepare("SELECT lecture_id, topic, started_at FROM lectures ORDER BY lecture_id")?;
        let lectures = stmt
            .query_map([], row_to_lecture)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(lectures)
    }

    /// Mark a student present for the current lecture.
    ///
    /// The lecture lookup, the student check and the insert share one
    /// transaction; a rejected mark leaves nothing behind.
    ///
    /// # Errors
    ///
    /// - [`Error::NoActiveLecture`] if no lecture has been started.
    /// - [`Error::StudentNotFound`] if the student is not registered.
    /// - [`Error::AlreadyMarked`] if the student is already marked for the
    ///   current lecture.
    /// - A storage error if the database operation fails.
    pub fn mark_attendance(&mut self, student_id: &str) -> Result<AttendanceRecord> {
        let tx = self.conn.transaction()?;

        let Some(lecture_id) = current_lecture_id(&tx)? else {
            return Err(Error::NoActiveLecture);
        };

        let registered: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM students WHERE student_id = ?1)",
            [student_id],
            |row| row.get(0),
        )?;
        if !registered {
            debug!("Mark rejected: unknown student {}", student_id);
            return Err(Error::StudentNotFound {
                id: student_id.to_string(),
            });
        }

        let marked_at = Utc::now();
        let inserted = tx.execute(
            "INSERT INTO attendance (student_id, lecture_id, marked_at) VALUES (?1, ?2, ?3)",
            params![student_id, lecture_id, marked_at.to_rfc3339()],
        );
        match inserted {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                debug!(
                    "Student {} already marked for lecture {}",
                    student_id, lecture_id
                );
                return Err(Error::AlreadyMarked {
                    student_id: student_id.to_string(),
                    lecture_id,
                });
            }
            Err(err) => return Err(err.into()),
        }
        tx.commit()?;

        info!("Marked {} present for lecture {}", student_id, lecture_id);
        Ok(AttendanceRecord {
            student_id: student_id.to_string(),
            lecture_id,
            marked_at,
        })
    }

    /// Attendance records for one lecture, in the order they were marked.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn lecture_attendance(&self, lecture_id: i64) -> Result<Vec<AttendanceRecord>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT student_id, lecture_id, marked_at
            FROM attendance WHERE lecture_id = ?1
            ORDER BY id
            ",
        )?;
        let records = stmt
            .query_map([lecture_id], row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Build the attendance report.
    ///
    /// Returns an empty report when no lectures exist. Otherwise there is
    /// one row per registered student, in registration order, including
    /// students who never attended.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn report(&self) -> Result<Report> {
        let total_lectures = to_count(self.count("lectures")?)?;
        if total_lectures == 0 {
            debug!("Report requested with no lectures");
            return Ok(Report::empty());
        }

        let mut stmt = self.conn.prepare(
            r"
            SELECT s.student_id, s.name, COUNT(DISTINCT a.lecture_id)
            FROM students s
            LEFT JOIN attendance a ON a.student_id = s.student_id
            GROUP BY s.student_id
            ORDER BY MIN(s.rowid)
            ",
        )?;
        let counts = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let rows = counts
            .into_iter()
            .map(|(id, name, attended)| {
                Ok(ReportRow::new(id, name, to_count(attended)?, total_lectures))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Report {
            total_lectures,
            rows,
        })
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            students: self.count("students")?,
            lectures: self.count("lectures")?,
            attendance_records: self.count("attendance")?,
            current_lecture_id: self.current_lecture_id()?,
            db_size_bytes,
        })
    }

    fn count(&self, table: &'static str) -> Result<i64> {
        let count = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }
}

/// Statistics about the store.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StorageStats {
    /// Number of registered students.
    pub students: i64,
    /// Number of lectures ever started.
    pub lectures: i64,
    /// Number of attendance marks.
    pub attendance_records: i64,
    /// Id of the current lecture, if any.
    pub current_lecture_id: Option<i64>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

fn current_lecture_id(conn: &Connection) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT lecture_id FROM lectures ORDER BY lecture_id DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

fn to_count(value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::internal(format!("count out of range: {value}")))
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

fn row_to_student(row: &rusqlite::Row) -> rusqlite::Result<Student> {
    let created_at: String = row.get(2)?;
    Ok(Student {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: parse_timestamp(2, &created_at)?,
    })
}

fn row_to_lecture(row: &rusqlite::Row) -> rusqlite::Result<Lecture> {
    let started_at: String = row.get(2)?;
    Ok(Lecture {
        id: row.get(0)?,
        topic: row.get(1)?,
        started_at: parse_timestamp(2, &started_at)?,
    })
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<AttendanceRecord> {
    let marked_at: String = row.get(2)?;
    Ok(AttendanceRecord {
        student_id: row.get(0)?,
        lecture_id: row.get(1)?,
        marked_at: parse_timestamp(2, &marked_at)?,
    })
}
