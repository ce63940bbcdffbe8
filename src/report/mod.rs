//! Report stages: row shaping, escalation, rendering, artifact output.

pub mod escalation;
pub mod export;
pub mod html;
pub mod output;
pub mod rows;

pub use escalation::{EscalationNotice, EscalationOutcome, LogMailSender, MailSender};
pub use html::ReportSection;
pub use rows::NormalizedRow;
