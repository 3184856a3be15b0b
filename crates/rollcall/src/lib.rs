//! `rollcall` - A single-user lecture attendance tracker
//!
//! This library provides the attendance store (students, lectures and
//! per-lecture presence marks in `SQLite`), the attendance report, and the
//! interactive session that drives them.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod report;
pub mod session;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use model::{AttendanceRecord, Lecture, Student};
pub use report::{AttendanceStatus, Report, ReportRow};
pub use session::Session;
pub use storage::{Storage, StorageStats};
