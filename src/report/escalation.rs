//! Overdue-row escalation.

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::error::Result;
use crate::report::rows::NormalizedRow;
use crate::schema::Field;

/// Escalation notice handed to the mail collaborator.
#[derive(Debug, Clone)]
pub struct EscalationNotice {
    pub worksheet: String,
    pub threshold_days: i64,
    pub recipients: Vec<String>,
    pub items: Vec<EscalationItem>,
}

/// One overdue row, flattened for the notice body.
#[derive(Debug, Clone)]
pub struct EscalationItem {
    pub component: String,
    pub status: String,
    pub owner: String,
    pub due_date: NaiveDate,
    pub days_overdue: i64,
}

/// Outcome of the escalation stage, carried in the run summary. The
/// stage never fails the report run.
#[derive(Debug, Clone, PartialEq)]
pub enum EscalationOutcome {
    /// No escalation recipients configured.
    NotConfigured,
    /// Recipients configured but nothing to send; reason recorded.
    Skipped(String),
    /// Notice handed to the mail collaborator.
    Sent { recipients: usize, rows: usize },
    /// Validation or dispatch failed; reason recorded, run continues.
    Failed(String),
}

/// Where escalation notices go. Production wires the desktop mail
/// client in here; the CLI and tests use [`LogMailSender`].
pub trait MailSender: Send + Sync {
    fn send_escalation(&self, notice: &EscalationNotice) -> Result<()>;
}

/// Sender that logs the notice instead of mailing it.
#[derive(Debug, Default, Clone)]
pub struct LogMailSender;

impl MailSender for LogMailSender {
    fn send_escalation(&self, notice: &EscalationNotice) -> Result<()> {
        info!(
            worksheet = %notice.worksheet,
            rows = notice.items.len(),
            recipients = notice.recipients.len(),
            threshold_days = notice.threshold_days,
            "escalation notice (logging only)"
        );
        Ok(())
    }
}

/// Whether a row is overdue by at least `threshold` days as of `today`.
/// Undated rows never escalate.
pub fn is_escalated(row: &NormalizedRow, threshold: i64, today: NaiveDate) -> bool {
    match row.due_date {
        Some(due) => (today - due).num_days() >= threshold,
        None => false,
    }
}

/// Rows overdue by at least `threshold` days as of `today`.
pub fn escalated_rows<'a>(
    rows: &'a [NormalizedRow],
    threshold: i64,
    today: NaiveDate,
) -> Vec<&'a NormalizedRow> {
    rows.iter()
        .filter(|row| is_escalated(row, threshold, today))
        .collect()
}

/// Run the escalation stage for one worksheet.
pub fn evaluate_and_send(
    worksheet: &str,
    rows: &[NormalizedRow],
    has_date_column: bool,
    recipients: &[String],
    threshold_days: u32,
    today: NaiveDate,
    mailer: &dyn MailSender,
) -> EscalationOutcome {
    if recipients.is_empty() {
        return EscalationOutcome::NotConfigured;
    }
    if !has_date_column {
        return EscalationOutcome::Skipped("no target date column".to_string());
    }
    if let Err(reason) = validate_recipients(recipients) {
        warn!(worksheet, %reason, "escalation recipients invalid");
        return EscalationOutcome::Failed(reason);
    }

    let threshold = i64::from(threshold_days);
    let overdue = escalated_rows(rows, threshold, today);
    if overdue.is_empty() {
        return EscalationOutcome::Skipped(format!(
            "no rows overdue by {threshold} or more days"
        ));
    }

    let notice = EscalationNotice {
        worksheet: worksheet.to_string(),
        threshold_days: threshold,
        recipients: recipients.to_vec(),
        items: overdue
            .iter()
            .filter_map(|row| {
                row.due_date.map(|due| EscalationItem {
                    component: row.get(Field::Component).to_string(),
                    status: row.status().to_string(),
                    owner: row.get(Field::Owner).to_string(),
                    due_date: due,
                    days_overdue: (today - due).num_days(),
                })
            })
            .collect(),
    };

    match mailer.send_escalation(&notice) {
        Ok(()) => EscalationOutcome::Sent {
            recipients: notice.recipients.len(),
            rows: notice.items.len(),
        },
        Err(e) => {
            warn!(worksheet, error = %e, "escalation notice not sent");
            EscalationOutcome::Failed(e.to_string())
        }
    }
}

/// Validate a recipient list. The empty list is valid.
pub fn validate_recipients(recipients: &[String]) -> std::result::Result<(), String> {
    for addr in recipients {
        if let Some(reason) = address_problem(addr) {
            return Err(format!("'{addr}': {reason}"));
        }
    }
    Ok(())
}

fn address_problem(addr: &str) -> Option<&'static str> {
    if addr.is_empty() {
        return Some("empty address");
    }
    if addr.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Some("whitespace in address");
    }
    if addr.contains("..") {
        return Some("consecutive dots");
    }
    let mut parts = addr.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Some("must contain exactly one '@'"),
    };
    if local.is_empty() || local.starts_with('.') || local.ends_with('.') {
        return Some("bad local part");
    }
    if domain.is_empty() || !domain.contains('.') {
        return Some("bad domain");
    }
    if domain.starts_with('.') || domain.ends_with('.') || domain.starts_with('-') {
        return Some("bad domain");
    }
    None
}
