//! Schedule validation output for `canteiro check`
//!
//! Findings are printed rustc-style to stderr, or collected as JSON.
//!
//! ## Exit Code Semantics
//!
//! | Exit Code | Meaning |
//! |-----------|---------|
//! | 0 | Success: no errors (warnings allowed) |
//! | 1 | Failure: one or more errors found |

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use canteiro_core::{ProjectSchedule, ScheduleError, TaskUid};
use serde::Serialize;

// ============================================================================
// Exit Code
// ============================================================================

/// Exit codes for CLI operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success: no errors (warnings allowed)
    Success = 0,
    /// Failure: one or more errors found
    Failure = 1,
}

impl ExitCode {
    pub fn from_error_count(count: usize) -> Self {
        if count > 0 {
            ExitCode::Failure
        } else {
            ExitCode::Success
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Success)
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code as u8)
    }
}

// ============================================================================
// Findings
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

/// One problem found in an input schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub code: &'static str,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskUid>,
}

impl Finding {
    fn error(code: &'static str, message: String, task: TaskUid) -> Self {
        Self {
            code,
            severity: Severity::Error,
            message,
            task: Some(task),
        }
    }

    fn warning(code: &'static str, message: String, task: Option<TaskUid>) -> Self {
        Self {
            code,
            severity: Severity::Warning,
            message,
            task,
        }
    }
}

impl From<&ScheduleError> for Finding {
    fn from(error: &ScheduleError) -> Self {
        match error {
            ScheduleError::DuplicateUid(uid) => Finding::error("E001", error.to_string(), *uid),
            ScheduleError::DanglingPredecessor { task, .. } => {
                Finding::error("E002", error.to_string(), *task)
            }
            ScheduleError::InvalidDateRange { task, .. } => {
                Finding::error("E003", error.to_string(), *task)
            }
        }
    }
}

/// Structural errors plus warnings the optimizer would silently tolerate
pub fn check_schedule(schedule: &ProjectSchedule) -> Vec<Finding> {
    let mut findings: Vec<Finding> = schedule.validate().iter().map(Finding::from).collect();

    if schedule.leaf_tasks().next().is_none() {
        findings.push(Finding::warning("W001", "schedule has no work tasks".into(), None));
    }
    for uid in &schedule.critical_path {
        if schedule.find_task(*uid).is_none() {
            findings.push(Finding::warning(
                "W002",
                format!("critical path references unknown task {uid}"),
                Some(*uid),
            ));
        }
    }

    findings
}

// ============================================================================
// Emitters
// ============================================================================

/// Writes findings rustc-style
pub struct TerminalEmitter<W: Write> {
    writer: W,
    file: PathBuf,
    error_count: usize,
    warning_count: usize,
}

impl<W: Write> TerminalEmitter<W> {
    pub fn new(writer: W, file: &Path) -> Self {
        Self {
            writer,
            file: file.to_path_buf(),
            error_count: 0,
            warning_count: 0,
        }
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from_error_count(self.error_count)
    }

    pub fn emit(&mut self, finding: &Finding) -> std::io::Result<()> {
        match finding.severity {
            Severity::Error => self.error_count += 1,
            Severity::Warning => self.warning_count += 1,
        }

        writeln!(
            self.writer,
            "{}[{}]: {}",
            finding.severity.as_str(),
            finding.code,
            finding.message
        )?;
        match finding.task {
            Some(uid) => writeln!(self.writer, "  --> {} (task {})", self.file.display(), uid)?,
            None => writeln!(self.writer, "  --> {}", self.file.display())?,
        }
        writeln!(self.writer)
    }
}

/// Machine-readable check result
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub file: String,
    pub errors: usize,
    pub warnings: usize,
    pub findings: &'a [Finding],
}

impl<'a> JsonReport<'a> {
    pub fn new(file: &Path, findings: &'a [Finding]) -> Self {
        Self {
            file: file.display().to_string(),
            errors: findings
                .iter()
                .filter(|f| f.severity == Severity::Error)
                .count(),
            warnings: findings
                .iter()
                .filter(|f| f.severity == Severity::Warning)
                .count(),
            findings,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from_error_count(self.errors)
    }
}
