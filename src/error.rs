//! Error taxonomy for the report pipeline and job controller.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the report pipeline and the job controller.
///
/// `EmptyReport` is special: the run aborts, but callers treat it as a
/// "nothing to do" outcome rather than a failure. `EscalationSend` is
/// logged and recorded in the run summary, never fatal.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Source file missing, locked, or unreadable. Detected before any
    /// work starts.
    #[error("cannot access {path}: {reason}")]
    FileAccess { path: PathBuf, reason: String },

    /// The workbook opened but its content could not be read.
    #[error("workbook {path}: {reason}")]
    Workbook { path: PathBuf, reason: String },

    /// A required canonical column was not found in the worksheet.
    #[error("worksheet '{worksheet}': {message}")]
    Schema { worksheet: String, message: String },

    /// No actionable rows survived filtering.
    #[error("worksheet '{worksheet}': {message}")]
    EmptyReport { worksheet: String, message: String },

    /// An output artifact could not be rendered.
    #[error("failed to render {artifact}: {reason}")]
    Render { artifact: String, reason: String },

    /// An output artifact could not be written.
    #[error("failed to write {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    /// Escalation notice could not be validated or dispatched.
    #[error("escalation notice not sent: {0}")]
    EscalationSend(String),

    /// The controller watchdog stopped the job.
    #[error("job timed out after {elapsed_secs}s (ceiling {ceiling_secs}s)")]
    Timeout { elapsed_secs: u64, ceiling_secs: u64 },

    /// The caller cancelled the job before any artifact was produced.
    #[error("job cancelled")]
    Cancelled,

    /// Another job is already running on this controller.
    #[error("another report job is already running")]
    ControllerBusy,

    /// Internal error: broken channel, panicked worker.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ReportError {
    /// Build a `FileAccess` error from any displayable cause.
    pub fn file_access(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        ReportError::FileAccess {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a `Write` error from any displayable cause.
    pub fn write(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        ReportError::Write {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error represents a "nothing to do" outcome rather
    /// than a genuine failure.
    pub fn is_empty_report(&self) -> bool {
        matches!(self, ReportError::EmptyReport { .. })
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
