//! Job control: submission, supervision, progress, and the pipeline runner.

mod controller;
mod progress;
mod runner;
mod state;

#[cfg(test)]
mod pipeline_integration_tests;

pub use controller::{ControllerConfig, JobController, ReportJob};
pub use progress::{ProgressReporter, ProgressSink, ProgressUpdate};
pub use runner::execute;
pub use state::{
    JobKind, JobOutcome, JobState, ReportFlavor, ReportOutput, ReportRequest, SheetReport,
};
