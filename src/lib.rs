//! Release Status Reports
//!
//! Pipeline that turns release-tracking spreadsheets into shareable status
//! reports: an HTML document for mail bodies, a spreadsheet export for
//! archival, and escalation notices for rows past their target date.
//!
//! # Architecture
//!
//! The pipeline consists of:
//!
//! - **Sheet**: Workbook access and raw cell extraction via calamine
//! - **Schema**: Column alias resolution, date parsing, multi-table header scanning
//! - **Report**: Row filtering and sorting, escalation, HTML and xlsx artifacts
//! - **Job**: Async job control with progress, cancellation, and a watchdog timeout
//!
//! # Usage
//!
//! ```no_run
//! use relstat::{ControllerConfig, JobController, ReportRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let controller = JobController::new(ControllerConfig::default());
//!     let request = ReportRequest::standard(
//!         "status.xlsx",
//!         "Tracking",
//!         "reports",
//!         vec!["pm@example.com".to_string()],
//!         vec![],
//!         7,
//!     );
//!     let mut job = controller.submit(request)?;
//!     let outcome = job.wait().await?;
//!     println!("{}", outcome.summary());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod job;
pub mod report;
pub mod schema;
pub mod sheet;

pub use config::{Settings, Tuning};
pub use error::{ReportError, Result};
pub use job::{
    ControllerConfig, JobController, JobKind, JobOutcome, JobState, ReportJob, ReportRequest,
};
pub use report::{EscalationNotice, EscalationOutcome, LogMailSender, MailSender};

/// Run a single report job to completion on a fresh controller.
///
/// Convenience wrapper for callers that do not need progress updates or
/// cancellation. Callers that do drive [`JobController`] directly.
pub async fn run_report(config: ControllerConfig, request: ReportRequest) -> Result<JobOutcome> {
    let controller = JobController::new(config);
    let mut job = controller.submit(request)?;
    job.wait().await
}

/// Build a Tokio runtime with the specified configuration.
pub fn build_runtime(worker_threads: Option<usize>) -> anyhow::Result<tokio::runtime::Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();

    if let Some(threads) = worker_threads {
        builder.worker_threads(threads);
    }

    builder.enable_all();

    Ok(builder.build()?)
}
