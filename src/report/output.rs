//! Output artifact placement: naming, overwrite checks, atomic writes,
//! and the timestamped archive copy of the source workbook.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::error::{ReportError, Result};

/// Subfolder of the output directory that receives source archives.
pub const ARCHIVE_DIR: &str = "Archives";

/// Replace path-sensitive characters in a worksheet name so it can be
/// embedded in a file name.
pub fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_whitespace() => '_',
            c if c.is_control() => '-',
            c => c,
        })
        .collect();
    if cleaned.is_empty() {
        "sheet".to_string()
    } else {
        cleaned
    }
}

/// Deterministic artifact paths for one run: report kind, sanitized
/// worksheet name, run date.
pub fn artifact_paths(
    output_dir: &Path,
    kind_label: &str,
    worksheet: &str,
    run_date: chrono::NaiveDate,
) -> (PathBuf, PathBuf) {
    let stem = format!(
        "{}_{}_{}",
        kind_label,
        sanitize_component(worksheet),
        run_date.format("%Y-%m-%d")
    );
    (
        output_dir.join(format!("{stem}.html")),
        output_dir.join(format!("{stem}.xlsx")),
    )
}

/// Create the output directory (and archive subfolder) if absent.
pub fn ensure_output_dirs(output_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(output_dir.join(ARCHIVE_DIR))
        .map_err(|e| ReportError::write(output_dir, e))?;
    Ok(())
}

/// Verify an existing artifact is not held open before overwriting it.
///
/// Opening for append fails on files another process has locked, which
/// is how a report left open in a viewer shows up on Windows. A missing
/// file passes.
pub fn check_overwritable(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    std::fs::OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| ReportError::write(path, format!("existing file is locked: {e}")))?;
    Ok(())
}

/// Sibling path used for write-then-rename.
pub(crate) fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());
    name.push_str(".tmp");
    path.with_file_name(name)
}

/// Write bytes to a temp sibling, then rename into place so readers
/// never observe a half-written report.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    check_overwritable(path)?;
    let tmp = temp_sibling(path);
    std::fs::write(&tmp, contents).map_err(|e| ReportError::write(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        ReportError::write(path, e)
    })?;
    debug!(path = %path.display(), bytes = contents.len(), "wrote artifact");
    Ok(())
}

/// Copy the source workbook into `Archives/`, timestamped to the
/// second. Retries with a fixed delay since the source is often still
/// held by the spreadsheet application for a moment after saving.
pub fn archive_source(
    source: &Path,
    output_dir: &Path,
    now: NaiveDateTime,
    attempts: usize,
    backoff: Duration,
) -> Result<PathBuf> {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "source".to_string());
    let ext = source
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let archive_path = output_dir.join(ARCHIVE_DIR).join(format!(
        "{stem}_{}{ext}",
        now.format("%Y%m%d_%H%M%S")
    ));

    let attempts = attempts.max(1);
    let mut last_err: Option<std::io::Error> = None;
    for attempt in 1..=attempts {
        match std::fs::copy(source, &archive_path) {
            Ok(_) => {
                debug!(archive = %archive_path.display(), attempt, "archived source workbook");
                return Ok(archive_path);
            }
            Err(e) => {
                warn!(
                    attempt,
                    attempts,
                    error = %e,
                    "archive copy failed"
                );
                last_err = Some(e);
                if attempt < attempts {
                    std::thread::sleep(backoff);
                }
            }
        }
    }

    let reason = last_err
        .map(|e| e.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    Err(ReportError::write(
        archive_path,
        format!("after {attempts} attempts: {reason}"),
    ))
}
