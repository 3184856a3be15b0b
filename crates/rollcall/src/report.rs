//! Attendance report types and rendering.
//!
//! The storage layer computes the raw counts; this module classifies each
//! student's rate and renders the result as a text table or JSON.

use std::fmt::Write as _;

use serde::Serialize;

use crate::error::Result;

/// Rate below which a student is flagged critical.
pub const CRITICAL_BELOW: f64 = 50.0;

/// Rate at or above which attendance is considered good.
pub const GOOD_FROM: f64 = 75.0;

const BANNER_WIDTH: usize = 40;
const TABLE_WIDTH: usize = 60;

/// Classification of a student's attendance rate.
///
/// Serializes as its [`label`](Self::label), so the JSON report and the
/// table agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AttendanceStatus {
    /// Below 50%.
    #[serde(rename = "CRITICAL")]
    Critical,
    /// From 50% up to, but excluding, 75%.
    #[serde(rename = "Low Attendance")]
    Low,
    /// 75% and above.
    #[serde(rename = "Good")]
    Good,
}

impl AttendanceStatus {
    /// Classify an attendance percentage.
    #[must_use]
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage < CRITICAL_BELOW {
            Self::Critical
        } else if percentage < GOOD_FROM {
            Self::Low
        } else {
            Self::Good
        }
    }

    /// Human readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::Low => "Low Attendance",
            Self::Good => "Good",
        }
    }
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One student's line in the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    /// Student identifier.
    pub student_id: String,
    /// Student display name.
    pub name: String,
    /// Number of distinct lectures attended.
    pub attended: u32,
    /// Number of lectures ever started.
    pub total_lectures: u32,
    /// `attended / total_lectures * 100`, unrounded.
    pub percentage: f64,
    /// Classification of `percentage`.
    pub status: AttendanceStatus,
}

impl ReportRow {
    /// Build a row, computing the percentage and status.
    ///
    /// `total_lectures` must be non-zero.
    #[must_use]
    pub fn new(
        student_id: impl Into<String>,
        name: impl Into<String>,
        attended: u32,
        total_lectures: u32,
    ) -> Self {
        let percentage = attendance_rate(attended, total_lectures);
        Self {
            student_id: student_id.into(),
            name: name.into(),
            attended,
            total_lectures,
            percentage,
            status: AttendanceStatus::from_percentage(percentage),
        }
    }
}

/// Attendance rate as a percentage.
#[must_use]
pub fn attendance_rate(attended: u32, total_lectures: u32) -> f64 {
    f64::from(attended) / f64::from(total_lectures) * 100.0
}

/// The aggregated attendance report.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Report {
    /// Count of all lectures ever started.
    pub total_lectures: u32,
    /// One row per registered student; empty when no lectures exist.
    pub rows: Vec<ReportRow>,
}

impl Report {
    /// An empty report, produced when no lectures have been started.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// True if no lectures have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_lectures == 0
    }

    /// Render the report as a fixed-width text table.
    #[must_use]
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        let banner = "=".repeat(BANNER_WIDTH);
        let rule = "-".repeat(TABLE_WIDTH);

        let _ = writeln!(out, "{banner}");
        let _ = writeln!(out, "ATTENDANCE ANALYTICS");
        let _ = writeln!(out, "{banner}");

        if self.is_empty() {
            let _ = writeln!(out, "No lectures recorded yet.");
            return out;
        }

        let _ = writeln!(out, "Total Lectures Conducted: {}", self.total_lectures);
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{:<20} | {:<10} | {:<10} | Status",
            "Name", "Attended", "Rate"
        );
        let _ = writeln!(out, "{rule}");
        for row in &self.rows {
            let attended = format!("{}/{}", row.attended, row.total_lectures);
            let rate = format!("{:.1}%", row.percentage);
            let _ = writeln!(
                out,
                "{:<20} | {:<10} | {:<10} | {}",
                row.name, attended, rate, row.status
            );
        }
        let _ = writeln!(out, "{rule}");
        out
    }

    /// Render the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
