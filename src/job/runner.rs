//! Synchronous report pipeline, executed on a blocking worker thread.
//!
//! The runner owns the whole sequence for one job: archive the source
//! workbook, read the requested sheet(s), normalize and filter rows,
//! evaluate escalations, and write the HTML and spreadsheet artifacts.
//! It polls the cancellation token at row-batch checkpoints so a cancel
//! request lands within one batch of where the scan currently is.

use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{ReportError, Result};
use crate::job::progress::ProgressSink;
use crate::job::state::{
    JobKind, JobOutcome, ReportFlavor, ReportOutput, ReportRequest, SheetReport,
};
use crate::report::escalation::{self, EscalationOutcome, MailSender};
use crate::report::html::{self, ReportSection};
use crate::report::rows::{filter_rows, sort_rows, NormalizedRow};
use crate::report::{export, output};
use crate::schema::{scan_blocks, ColumnMap, Field};
use crate::sheet::{self, SheetGrid, WorkbookReader};

/// Shared references threaded through the per-sheet stages.
struct RunCtx<'a> {
    request: &'a ReportRequest,
    mailer: &'a dyn MailSender,
    sink: &'a mut ProgressSink,
    cancel: &'a CancellationToken,
}

/// Run one report job to completion.
///
/// Everything here is synchronous; the controller wraps this in
/// `spawn_blocking`. Cancellation is cooperative: between row batches
/// the runner checks the token and bails with [`ReportError::Cancelled`].
pub fn execute(
    request: ReportRequest,
    mut sink: ProgressSink,
    cancel: CancellationToken,
    mailer: &dyn MailSender,
) -> Result<JobOutcome> {
    request
        .tuning
        .validate()
        .map_err(|e| ReportError::Internal(format!("invalid tuning: {e}")))?;
    checkpoint(&cancel)?;

    sheet::check_readable(&request.source)?;
    output::ensure_output_dirs(&request.output_dir)?;

    let mut warnings = Vec::new();
    sink.note("archiving source workbook");
    let archive_path = match output::archive_source(
        &request.source,
        &request.output_dir,
        request.generated_at,
        request.tuning.archive_attempts,
        Duration::from_millis(request.tuning.archive_backoff_ms),
    ) {
        Ok(path) => Some(path),
        Err(e) => {
            warn!(source = %request.source.display(), error = %e, "source archive failed");
            warnings.push(format!("source not archived: {e}"));
            None
        }
    };

    let mut reader = WorkbookReader::open(&request.source)?;
    let mut ctx = RunCtx {
        request: &request,
        mailer,
        sink: &mut sink,
        cancel: &cancel,
    };

    let outcome = match request.kind {
        JobKind::Standard | JobKind::Special => {
            let flavor = match request.kind {
                JobKind::Special => ReportFlavor::Special,
                _ => ReportFlavor::Standard,
            };
            let worksheet = request.worksheet.clone().ok_or_else(|| {
                ReportError::Internal("single-sheet request missing a worksheet name".to_string())
            })?;
            match run_sheet(&mut ctx, &mut reader, &worksheet, flavor) {
                Ok(report) => JobOutcome::Finished(ReportOutput {
                    sheets: vec![report],
                    skipped: Vec::new(),
                    archive_path,
                    warnings,
                    partial: false,
                }),
                Err(e) if e.is_empty_report() => {
                    info!(worksheet, reason = %e, "nothing to report");
                    JobOutcome::NothingToDo {
                        worksheet,
                        reason: e.to_string(),
                    }
                }
                Err(e) => return Err(e),
            }
        }
        JobKind::Batch => run_batch(&mut ctx, &mut reader, archive_path, warnings)?,
    };

    sink.complete();
    info!(summary = %outcome.summary(), "report job finished");
    Ok(outcome)
}

fn checkpoint(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(ReportError::Cancelled)
    } else {
        Ok(())
    }
}

fn empty_report(worksheet: &str, message: &str) -> ReportError {
    ReportError::EmptyReport {
        worksheet: worksheet.to_string(),
        message: message.to_string(),
    }
}

/// Produce the report for a single worksheet: normalize rows, evaluate
/// escalations, write artifacts. Artifact failures are recorded on the
/// report rather than aborting the job; everything before rendering
/// propagates.
fn run_sheet(
    ctx: &mut RunCtx<'_>,
    reader: &mut WorkbookReader,
    worksheet: &str,
    flavor: ReportFlavor,
) -> Result<SheetReport> {
    let grid = reader.read_sheet(worksheet)?;
    checkpoint(ctx.cancel)?;

    let (sections, has_date_column) = match flavor {
        ReportFlavor::Standard => standard_sections(ctx, &grid)?,
        ReportFlavor::Special => special_sections(ctx, &grid)?,
    };

    let today = ctx.request.today;
    let (escalated, escalation) = if flavor == ReportFlavor::Standard {
        let threshold = i64::from(ctx.request.escalation_days);
        let escalated = sections
            .iter()
            .flat_map(|s| s.rows.iter())
            .filter(|row| escalation::is_escalated(row, threshold, today))
            .count();
        let escalation = if ctx.request.escalation_recipients.is_empty() {
            EscalationOutcome::NotConfigured
        } else {
            let flat: Vec<NormalizedRow> = sections.iter().flat_map(|s| s.rows.clone()).collect();
            escalation::evaluate_and_send(
                worksheet,
                &flat,
                has_date_column,
                &ctx.request.escalation_recipients,
                ctx.request.escalation_days,
                today,
                ctx.mailer,
            )
        };
        (escalated, escalation)
    } else {
        // Multi-table reports keep completed rows, so the overdue check
        // does not apply to them.
        (
            0,
            EscalationOutcome::Skipped("multi-table reports do not escalate".to_string()),
        )
    };

    ctx.sink.note(format!("rendering {worksheet}"));
    let rows: usize = sections.iter().map(|s| s.rows.len()).sum();
    let (html_path, export_path, artifact_errors) =
        write_artifacts(ctx.request, worksheet, flavor, &sections);

    Ok(SheetReport {
        worksheet: worksheet.to_string(),
        flavor,
        rows,
        escalated,
        html_path,
        export_path,
        artifact_errors,
        escalation,
    })
}

/// Standard sheets: one header row on top, one table below it. Completed
/// and blank rows are dropped and the remainder sorted by due date.
fn standard_sections(
    ctx: &mut RunCtx<'_>,
    grid: &SheetGrid,
) -> Result<(Vec<ReportSection>, bool)> {
    let worksheet = &grid.name;
    let (header, data) = grid
        .split_header()
        .ok_or_else(|| empty_report(worksheet, "sheet is empty"))?;
    let columns = ColumnMap::resolve(header);
    columns.require(Field::Status, worksheet)?;

    ctx.sink
        .begin(format!("scanning {worksheet}"), data.len() as u64);
    let batch = ctx.request.tuning.cancel_batch_rows;
    let mut normalized = Vec::with_capacity(data.len());
    for (i, raw) in data.iter().enumerate() {
        if i > 0 && i % batch == 0 {
            checkpoint(ctx.cancel)?;
        }
        if !raw.is_blank() {
            normalized.push(NormalizedRow::from_raw(raw, &columns, ctx.request.today));
        }
        ctx.sink.advance(1);
    }

    let mut rows = filter_rows(normalized);
    if rows.is_empty() {
        return Err(empty_report(worksheet, "all items complete or sheet empty"));
    }
    sort_rows(&mut rows);

    let has_dates = columns.has(Field::TargetDate);
    Ok((vec![ReportSection { heading: None, rows }], has_dates))
}

/// Special sheets: several stacked tables, each introduced by its own
/// header row. Completed rows stay in; only rows blank across every
/// resolved column are dropped.
fn special_sections(
    ctx: &mut RunCtx<'_>,
    grid: &SheetGrid,
) -> Result<(Vec<ReportSection>, bool)> {
    let worksheet = &grid.name;
    let blocks = scan_blocks(&grid.rows, ctx.request.tuning.header_match_threshold);
    if blocks.is_empty() {
        return Err(empty_report(worksheet, "no tables recognized"));
    }

    let total: u64 = blocks.iter().map(|b| b.data_len() as u64).sum();
    ctx.sink.begin(format!("scanning {worksheet}"), total);
    let batch = ctx.request.tuning.cancel_batch_rows;

    let mut sections = Vec::with_capacity(blocks.len());
    let mut scanned = 0usize;
    let mut kept = 0usize;
    let mut has_dates = false;
    for block in &blocks {
        let mut rows = Vec::new();
        for idx in block.data_range() {
            if scanned > 0 && scanned % batch == 0 {
                checkpoint(ctx.cancel)?;
            }
            scanned += 1;
            let row = NormalizedRow::from_raw(&grid.rows[idx], &block.columns, ctx.request.today);
            if !row.is_blank() {
                rows.push(row);
            }
            ctx.sink.advance(1);
        }
        sort_rows(&mut rows);
        kept += rows.len();
        if block.columns.has(Field::TargetDate) {
            has_dates = true;
        }
        sections.push(ReportSection {
            heading: Some(format!("Table {}", sections.len() + 1)),
            rows,
        });
    }

    if kept == 0 {
        return Err(empty_report(worksheet, "no rows found in any table"));
    }
    Ok((sections, has_dates))
}

/// Write the HTML and spreadsheet artifacts for one sheet. Each artifact
/// succeeds or fails on its own; failures come back as messages instead
/// of errors so one bad artifact never voids the other.
fn write_artifacts(
    request: &ReportRequest,
    worksheet: &str,
    flavor: ReportFlavor,
    sections: &[ReportSection],
) -> (Option<PathBuf>, Option<PathBuf>, Vec<String>) {
    let (html_path, export_path) =
        output::artifact_paths(&request.output_dir, flavor.label(), worksheet, request.today);
    let mut errors = Vec::new();

    let html_written = html::render_document(worksheet, sections, request.generated_at)
        .and_then(|doc| output::write_atomic(&html_path, doc.as_bytes()));
    let html_path = match html_written {
        Ok(()) => Some(html_path),
        Err(e) => {
            warn!(worksheet, error = %e, "html artifact failed");
            errors.push(e.to_string());
            None
        }
    };

    let export_written = export::write_export(&export_path, worksheet, sections);
    let export_path = match export_written {
        Ok(()) => Some(export_path),
        Err(e) => {
            warn!(worksheet, error = %e, "spreadsheet artifact failed");
            errors.push(e.to_string());
            None
        }
    };

    (html_path, export_path, errors)
}

/// Report every worksheet in the workbook. Empty sheets are skipped,
/// per-sheet failures become warnings, and a cancel mid-way returns a
/// partial result if any sheet already finished.
fn run_batch(
    ctx: &mut RunCtx<'_>,
    reader: &mut WorkbookReader,
    archive_path: Option<PathBuf>,
    warnings: Vec<String>,
) -> Result<JobOutcome> {
    let names = reader.sheet_names();
    let mut out = ReportOutput {
        sheets: Vec::new(),
        skipped: Vec::new(),
        archive_path,
        warnings,
        partial: false,
    };

    for name in names {
        if ctx.cancel.is_cancelled() {
            if out.sheets.is_empty() && out.skipped.is_empty() {
                return Err(ReportError::Cancelled);
            }
            out.partial = true;
            out.warnings
                .push("cancelled before processing remaining worksheets".to_string());
            break;
        }

        let flavor = if sheet::is_special_sheet(&name, &ctx.request.tuning.special_sheets) {
            ReportFlavor::Special
        } else {
            ReportFlavor::Standard
        };

        match run_sheet(ctx, reader, &name, flavor) {
            Ok(report) => out.sheets.push(report),
            Err(e) if e.is_empty_report() => {
                info!(worksheet = %name, reason = %e, "worksheet skipped");
                out.skipped.push((name, e.to_string()));
            }
            Err(ReportError::Cancelled) => {
                if out.sheets.is_empty() && out.skipped.is_empty() {
                    return Err(ReportError::Cancelled);
                }
                out.partial = true;
                out.warnings
                    .push(format!("cancelled while processing '{name}'"));
                break;
            }
            Err(e) => {
                warn!(worksheet = %name, error = %e, "worksheet failed");
                out.warnings.push(format!("{name}: {e}"));
            }
        }
    }

    Ok(JobOutcome::Finished(out))
}
