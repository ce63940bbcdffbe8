//! End-to-end tests for the report pipeline at its interface boundaries.
//!
//! Tests cover:
//! 1. Standard report from a workbook on disk: filtering, due-day math,
//!    escalation, artifact naming, archive copy
//! 2. All-complete sheet: nothing to report, no artifacts
//! 3. Multi-table sheet: one section per stacked header block
//! 4. Batch run over mixed worksheets
//! 5. Schema and file-access failures
//! 6. Cancellation before and during a run
//! 7. The controller and the one-call wrapper driving the full pipeline

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use rust_xlsxwriter::Workbook;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::ReportError;
use crate::job::progress::{ProgressSink, ProgressUpdate};
use crate::job::runner;
use crate::job::state::{JobOutcome, ReportFlavor, ReportRequest};
use crate::job::{ControllerConfig, JobController, JobState};
use crate::report::escalation::test_support::RecordingMailSender;
use crate::report::escalation::{EscalationNotice, EscalationOutcome, LogMailSender, MailSender};

/// Pinned run clock: 2024-01-10 08:30:00.
fn run_stamp() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 10)
        .unwrap()
        .and_hms_opt(8, 30, 0)
        .unwrap()
}

fn write_workbook(path: &Path, sheets: &[(&str, Vec<Vec<&str>>)]) {
    let mut workbook = Workbook::new();
    for (name, rows) in sheets {
        let sheet = workbook.add_worksheet();
        sheet.set_name(*name).unwrap();
        for (r, row) in rows.iter().enumerate() {
            for (c, text) in row.iter().enumerate() {
                if !text.is_empty() {
                    sheet.write_string(r as u32, c as u16, *text).unwrap();
                }
            }
        }
    }
    workbook.save(path).unwrap();
}

/// Standard tracking sheet: one open dated row, one complete row, one
/// blank row, one open undated row.
fn tracking_rows() -> Vec<Vec<&'static str>> {
    vec![
        vec!["Component", "Status", "Owner", "Target Date"],
        vec!["Build", "Pending", "Alice", "2024-01-01"],
        vec!["Docs", "Complete", "Bob", "2024-01-05"],
        vec!["", "", "", ""],
        vec!["Deploy", "In Progress", "Carol", "tbd"],
    ]
}

/// Multi-table sheet: a preamble line, then two header blocks with two
/// data rows each and no blank separators.
fn checklist_rows() -> Vec<Vec<&'static str>> {
    vec![
        vec!["Release 1.2 readiness", "", "", ""],
        vec!["Component", "Status", "Owner", "Target Date"],
        vec!["Build", "Complete", "Alice", "2024-01-05"],
        vec!["Sign-off", "Pending", "Bob", "2024-01-20"],
        vec!["Deliverable", "Readiness", "DRI", "Due Date"],
        vec!["Runbook", "Draft", "Carol", "2024-01-15"],
        vec!["Comms", "Ready", "Dan", "tbd"],
    ]
}

fn execute_with(
    request: ReportRequest,
    mailer: &dyn MailSender,
) -> (crate::error::Result<JobOutcome>, ProgressUpdate) {
    let (tx, rx) = watch::channel(ProgressUpdate::default());
    let result = runner::execute(request, ProgressSink::new(tx), CancellationToken::new(), mailer);
    let last = rx.borrow().clone();
    (result, last)
}

fn finished(result: crate::error::Result<JobOutcome>) -> crate::job::state::ReportOutput {
    match result.unwrap() {
        JobOutcome::Finished(output) => output,
        other => panic!("expected a finished job, got {other:?}"),
    }
}

/// Test 1: the standard happy path, from a workbook on disk to both
/// artifacts plus the archive copy and an escalation notice.
#[test]
fn test_standard_report_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("status.xlsx");
    write_workbook(&source, &[("Tracking", tracking_rows())]);
    let out = dir.path().join("reports");

    let mailer = RecordingMailSender::default();
    let request = ReportRequest::standard(
        &source,
        "Tracking",
        &out,
        vec!["pm@example.com".to_string()],
        vec!["director@example.com".to_string()],
        7,
    )
    .with_run_timestamp(run_stamp());

    let (result, last) = execute_with(request, &mailer);
    let output = finished(result);

    assert_eq!(output.sheets.len(), 1);
    assert!(!output.partial);
    let report = &output.sheets[0];
    // Docs is complete and the blank row is skipped; Build and Deploy stay.
    assert_eq!(report.rows, 2);
    assert_eq!(report.escalated, 1);
    assert!(report.artifact_errors.is_empty());
    assert_eq!(last.percent, 100);

    let html_path = out.join("standard_Tracking_2024-01-10.html");
    assert_eq!(report.html_path.as_deref(), Some(html_path.as_path()));
    let html = std::fs::read_to_string(&html_path).unwrap();
    assert!(html.contains("Build"));
    assert!(html.contains("<td>-9</td>"), "due-day cell missing: {html}");
    assert!(!html.contains("Docs"), "complete rows must not render");
    // Dated rows sort ahead of undated ones.
    assert!(html.find("Build").unwrap() < html.find("Deploy").unwrap());

    assert!(out.join("standard_Tracking_2024-01-10.xlsx").is_file());

    let archive = out.join("Archives").join("status_20240110_083000.xlsx");
    assert_eq!(output.archive_path.as_deref(), Some(archive.as_path()));
    assert!(archive.is_file());

    assert_eq!(
        report.escalation,
        EscalationOutcome::Sent {
            recipients: 1,
            rows: 1
        }
    );
    let notices = mailer.notices.lock().unwrap();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].items.len(), 1);
    assert_eq!(notices[0].items[0].component, "Build");
    assert_eq!(notices[0].items[0].days_overdue, 9);
}

/// Test 2: a sheet where everything is complete reports nothing and
/// writes no artifacts.
#[test]
fn test_all_complete_sheet_reports_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("status.xlsx");
    write_workbook(
        &source,
        &[(
            "Tracking",
            vec![
                vec!["Component", "Status", "Owner", "Target Date"],
                vec!["Build", "Complete", "Alice", "2024-01-01"],
                vec!["Docs", "done", "Bob", "2024-01-05"],
            ],
        )],
    );
    let out = dir.path().join("reports");

    let request = ReportRequest::standard(&source, "Tracking", &out, vec![], vec![], 7)
        .with_run_timestamp(run_stamp());
    let (result, _) = execute_with(request, &LogMailSender);
    match result.unwrap() {
        JobOutcome::NothingToDo { worksheet, reason } => {
            assert_eq!(worksheet, "Tracking");
            assert!(reason.contains("complete"), "reason: {reason}");
        }
        other => panic!("expected nothing-to-do, got {other:?}"),
    }

    // Only the archive copy of the source exists under the output dir.
    let stray: Vec<_> = std::fs::read_dir(&out)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.is_file())
        .collect();
    assert!(stray.is_empty(), "unexpected artifacts: {stray:?}");
}

/// Test 3: a multi-table sheet renders one section per header block,
/// keeps completed rows, and ignores preamble lines.
#[test]
fn test_special_sheet_renders_stacked_tables() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("release.xlsx");
    write_workbook(&source, &[("Release Checklist", checklist_rows())]);
    let out = dir.path().join("reports");

    let request =
        ReportRequest::special(&source, "Release Checklist", &out).with_run_timestamp(run_stamp());
    let (result, _) = execute_with(request, &LogMailSender);
    let output = finished(result);

    let report = &output.sheets[0];
    assert_eq!(report.flavor, ReportFlavor::Special);
    assert_eq!(report.rows, 4);

    let html = std::fs::read_to_string(report.html_path.as_ref().unwrap()).unwrap();
    assert!(html.contains("Table 1"));
    assert!(html.contains("Table 2"));
    assert!(html.contains("Build"), "checklist reports keep completed rows");
    assert!(html.contains("Runbook"));
    assert!(
        !html.contains("Release 1.2 readiness"),
        "preamble rows are not data"
    );

    assert!(out.join("special_Release_Checklist_2024-01-10.xlsx").is_file());
}

/// Test 4: batch runs every worksheet, picks the layout per sheet name,
/// and skips sheets with nothing to report.
#[test]
fn test_batch_run_over_mixed_worksheets() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("status.xlsx");
    write_workbook(
        &source,
        &[
            ("Tracking", tracking_rows()),
            ("Release Checklist", checklist_rows()),
            (
                "Done",
                vec![
                    vec!["Component", "Status"],
                    vec!["Everything", "closed"],
                ],
            ),
        ],
    );
    let out = dir.path().join("reports");

    let request = ReportRequest::batch(&source, &out).with_run_timestamp(run_stamp());
    let (result, last) = execute_with(request, &LogMailSender);
    let output = finished(result);

    assert!(!output.partial);
    assert_eq!(output.sheets.len(), 2);
    assert_eq!(output.skipped.len(), 1);
    assert_eq!(output.skipped[0].0, "Done");

    let flavors: Vec<_> = output
        .sheets
        .iter()
        .map(|s| (s.worksheet.as_str(), s.flavor))
        .collect();
    assert!(flavors.contains(&("Tracking", ReportFlavor::Standard)));
    assert!(flavors.contains(&("Release Checklist", ReportFlavor::Special)));

    assert!(out.join("standard_Tracking_2024-01-10.html").is_file());
    assert!(out.join("special_Release_Checklist_2024-01-10.html").is_file());
    assert_eq!(last.percent, 100);
}

/// Test 5: a sheet without a recognizable status column is a schema
/// error, not an empty report.
#[test]
fn test_missing_status_column_is_a_schema_error() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("status.xlsx");
    write_workbook(
        &source,
        &[(
            "Tracking",
            vec![
                vec!["Component", "Owner"],
                vec!["Build", "Alice"],
            ],
        )],
    );
    let out = dir.path().join("reports");

    let request = ReportRequest::standard(&source, "Tracking", &out, vec![], vec![], 7)
        .with_run_timestamp(run_stamp());
    let (result, _) = execute_with(request, &LogMailSender);
    match result.unwrap_err() {
        ReportError::Schema { worksheet, message } => {
            assert_eq!(worksheet, "Tracking");
            assert!(message.contains("status"), "message: {message}");
        }
        other => panic!("expected a schema error, got {other:?}"),
    }
    assert!(!out.join("standard_Tracking_2024-01-10.html").exists());
}

/// Test 6: a missing source workbook fails before anything is created.
#[test]
fn test_missing_source_is_a_file_access_error() {
    let dir = tempfile::tempdir().unwrap();
    let request = ReportRequest::standard(
        dir.path().join("absent.xlsx"),
        "Tracking",
        dir.path().join("reports"),
        vec![],
        vec![],
        7,
    );
    let (result, _) = execute_with(request, &LogMailSender);
    assert!(matches!(
        result.unwrap_err(),
        ReportError::FileAccess { .. }
    ));
    assert!(!dir.path().join("reports").exists());
}

/// Test 7: a token already cancelled at submission stops the run before
/// it touches the output directory.
#[test]
fn test_pre_cancelled_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("status.xlsx");
    write_workbook(&source, &[("Tracking", tracking_rows())]);
    let out = dir.path().join("reports");

    let cancel = CancellationToken::new();
    cancel.cancel();
    let (tx, _rx) = watch::channel(ProgressUpdate::default());
    let request = ReportRequest::standard(&source, "Tracking", &out, vec![], vec![], 7)
        .with_run_timestamp(run_stamp());
    let result = runner::execute(request, ProgressSink::new(tx), cancel, &LogMailSender);

    assert!(matches!(result.unwrap_err(), ReportError::Cancelled));
    assert!(!out.exists(), "output directory should not have been created");
}

/// Escalation sender that cancels the job token on first use. Lets a
/// test land a cancellation deterministically between batch sheets.
struct CancellingMailSender {
    cancel: CancellationToken,
}

impl MailSender for CancellingMailSender {
    fn send_escalation(&self, _notice: &EscalationNotice) -> crate::error::Result<()> {
        self.cancel.cancel();
        Ok(())
    }
}

/// Test 8: a cancellation landing mid-batch keeps the sheets already
/// reported and marks the output partial.
#[test]
fn test_batch_cancel_midway_keeps_partial_output() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("status.xlsx");
    write_workbook(
        &source,
        &[
            ("Tracking", tracking_rows()),
            ("Second", tracking_rows()),
        ],
    );
    let out = dir.path().join("reports");

    let cancel = CancellationToken::new();
    let mailer = CancellingMailSender {
        cancel: cancel.clone(),
    };
    let mut request = ReportRequest::batch(&source, &out).with_run_timestamp(run_stamp());
    request.escalation_recipients = vec!["director@example.com".to_string()];

    let (tx, _rx) = watch::channel(ProgressUpdate::default());
    let result = runner::execute(request, ProgressSink::new(tx), cancel, &mailer);
    let output = finished(result);

    assert!(output.partial);
    assert_eq!(output.sheets.len(), 1);
    assert_eq!(output.sheets[0].worksheet, "Tracking");
    assert!(output.warnings.iter().any(|w| w.contains("cancelled")));
    assert!(out.join("standard_Tracking_2024-01-10.html").is_file());
    assert!(!out.join("standard_Second_2024-01-10.html").exists());
}

/// Test 9: the controller drives the same pipeline through submit and
/// lands on Completed with the artifacts on disk.
#[tokio::test]
async fn test_controller_submit_runs_the_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("status.xlsx");
    write_workbook(&source, &[("Tracking", tracking_rows())]);
    let out = dir.path().join("reports");

    let controller = JobController::new(ControllerConfig::default());
    let request = ReportRequest::standard(&source, "Tracking", &out, vec![], vec![], 7)
        .with_run_timestamp(run_stamp());
    let mut job = controller.submit(request).unwrap();
    let states = job.state_receiver();

    let outcome = job.wait().await.unwrap();
    assert!(matches!(outcome, JobOutcome::Finished(_)));
    assert_eq!(*states.borrow(), JobState::Completed);
    assert!(out.join("standard_Tracking_2024-01-10.html").is_file());
    assert!(out.join("standard_Tracking_2024-01-10.xlsx").is_file());
}

/// Test 10: the one-call wrapper runs a request to completion on a
/// fresh controller.
#[tokio::test]
async fn test_run_report_runs_a_job_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("status.xlsx");
    write_workbook(&source, &[("Tracking", tracking_rows())]);
    let out = dir.path().join("reports");

    let request = ReportRequest::standard(&source, "Tracking", &out, vec![], vec![], 7)
        .with_run_timestamp(run_stamp());
    let outcome = crate::run_report(ControllerConfig::default(), request)
        .await
        .unwrap();

    assert!(matches!(outcome, JobOutcome::Finished(_)));
    assert!(out.join("standard_Tracking_2024-01-10.html").is_file());
}
