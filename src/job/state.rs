//! Job identity, state machine, and run outcomes.

use std::fmt;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};

use crate::config::Tuning;
use crate::report::EscalationOutcome;

/// Which report command a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Standard,
    Special,
    Batch,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Standard => write!(f, "standard"),
            JobKind::Special => write!(f, "special"),
            JobKind::Batch => write!(f, "batch"),
        }
    }
}

/// Per-sheet report form. Batch runs pick one per worksheet name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFlavor {
    Standard,
    Special,
}

impl ReportFlavor {
    /// Label used in artifact file names.
    pub fn label(self) -> &'static str {
        match self {
            ReportFlavor::Standard => "standard",
            ReportFlavor::Special => "special",
        }
    }
}

/// Lifecycle of one submitted job.
///
/// `Pending -> Running -> {Completed | Failed | TimedOut}`, with
/// `Cancelling` interposed while a cancellation request waits for the
/// worker to notice. Transitions are one-way; the watchdog can still
/// time out a job stuck in `Cancelling`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Cancelling,
    Completed,
    Failed,
    TimedOut,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::TimedOut
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Pending => write!(f, "pending"),
            JobState::Running => write!(f, "running"),
            JobState::Cancelling => write!(f, "cancelling"),
            JobState::Completed => write!(f, "completed"),
            JobState::Failed => write!(f, "failed"),
            JobState::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Everything a job needs, fixed at submission time. The worker gets a
/// copy and shares nothing mutable with the caller.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub kind: JobKind,
    pub source: PathBuf,
    /// Target worksheet. `None` for batch runs.
    pub worksheet: Option<String>,
    pub output_dir: PathBuf,
    /// Report recipients, carried for the mail collaborator.
    pub recipients: Vec<String>,
    pub escalation_recipients: Vec<String>,
    pub escalation_days: u32,
    /// Run date used for due-day math and artifact names.
    pub today: NaiveDate,
    /// Run timestamp used for the report footer and archive name.
    pub generated_at: NaiveDateTime,
    pub tuning: Tuning,
}

impl ReportRequest {
    /// Request for a single-header-row worksheet.
    pub fn standard(
        source: impl Into<PathBuf>,
        worksheet: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        recipients: Vec<String>,
        escalation_recipients: Vec<String>,
        escalation_days: u32,
    ) -> Self {
        // One clock sample, so a run straddling midnight keeps `today`
        // and `generated_at` on the same date.
        let generated_at = now();
        Self {
            kind: JobKind::Standard,
            source: source.into(),
            worksheet: Some(worksheet.into()),
            output_dir: output_dir.into(),
            recipients,
            escalation_recipients,
            escalation_days,
            today: generated_at.date(),
            generated_at,
            tuning: Tuning::default(),
        }
    }

    /// Request for a multi-table worksheet.
    pub fn special(
        source: impl Into<PathBuf>,
        worksheet: impl Into<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        let generated_at = now();
        Self {
            kind: JobKind::Special,
            source: source.into(),
            worksheet: Some(worksheet.into()),
            output_dir: output_dir.into(),
            recipients: Vec::new(),
            escalation_recipients: Vec::new(),
            escalation_days: 7,
            today: generated_at.date(),
            generated_at,
            tuning: Tuning::default(),
        }
    }

    /// Request covering every worksheet in the workbook.
    pub fn batch(source: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        let generated_at = now();
        Self {
            kind: JobKind::Batch,
            source: source.into(),
            worksheet: None,
            output_dir: output_dir.into(),
            recipients: Vec::new(),
            escalation_recipients: Vec::new(),
            escalation_days: 7,
            today: generated_at.date(),
            generated_at,
            tuning: Tuning::default(),
        }
    }

    pub fn with_tuning(mut self, tuning: Tuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Pin the run clock. Tests use this to make due-day math and
    /// artifact names reproducible.
    pub fn with_run_timestamp(mut self, at: NaiveDateTime) -> Self {
        self.today = at.date();
        self.generated_at = at;
        self
    }
}

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Result of one worksheet's run inside a job.
#[derive(Debug)]
pub struct SheetReport {
    pub worksheet: String,
    pub flavor: ReportFlavor,
    /// Rows in the rendered report.
    pub rows: usize,
    /// Rows past the escalation threshold.
    pub escalated: usize,
    pub html_path: Option<PathBuf>,
    pub export_path: Option<PathBuf>,
    /// Per-artifact failures. Artifacts are attempted independently.
    pub artifact_errors: Vec<String>,
    pub escalation: EscalationOutcome,
}

/// What a finished job hands back to the caller.
#[derive(Debug, Default)]
pub struct ReportOutput {
    pub sheets: Vec<SheetReport>,
    /// Batch: worksheets with nothing to report, with the reason.
    pub skipped: Vec<(String, String)>,
    pub archive_path: Option<PathBuf>,
    pub warnings: Vec<String>,
    /// Set when a cancellation stopped the run after partial output.
    pub partial: bool,
}

/// Terminal non-error outcome of a job.
#[derive(Debug)]
pub enum JobOutcome {
    Finished(ReportOutput),
    /// The run aborted before producing artifacts because there was
    /// nothing to report. Not a failure.
    NothingToDo { worksheet: String, reason: String },
}

impl JobOutcome {
    /// One-line human-readable summary for the caller.
    pub fn summary(&self) -> String {
        match self {
            JobOutcome::Finished(output) => {
                let rows: usize = output.sheets.iter().map(|s| s.rows).sum();
                let escalated: usize = output.sheets.iter().map(|s| s.escalated).sum();
                let mut parts = vec![format!(
                    "{} sheet(s), {} row(s), {} escalated",
                    output.sheets.len(),
                    rows,
                    escalated
                )];
                if !output.skipped.is_empty() {
                    parts.push(format!("{} skipped", output.skipped.len()));
                }
                if output.partial {
                    parts.push("partial (cancelled)".to_string());
                }
                if !output.warnings.is_empty() {
                    parts.push(format!("{} warning(s)", output.warnings.len()));
                }
                parts.join(", ")
            }
            JobOutcome::NothingToDo { worksheet, reason } => {
                format!("nothing to do for '{worksheet}': {reason}")
            }
        }
    }
}
