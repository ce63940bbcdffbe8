//! Configuration for the report pipeline.
//!
//! Two layers: [`Settings`] is the user-facing file shared with the
//! settings dialog (PascalCase JSON keys, absent file means defaults),
//! and [`Tuning`] holds pipeline knobs that are not persisted per user.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persisted user settings.
///
/// The JSON file uses PascalCase keys (`Recipients`, `EscalationDays`,
/// `EscalationRecipients`, `OutputFolder`). Unknown keys are ignored;
/// missing keys fall back to defaults so older files keep loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Settings {
    /// Report recipients, semicolon-joined.
    pub recipients: String,

    /// Days past the target date before a row is escalated.
    pub escalation_days: u32,

    /// Escalation recipients, semicolon-joined.
    pub escalation_recipients: String,

    /// Folder for report artifacts. The `Archives` subfolder is created
    /// underneath it.
    pub output_folder: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            recipients: String::new(),
            escalation_days: 7,
            escalation_recipients: String::new(),
            output_folder: "reports".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file.
    ///
    /// A missing file yields defaults; a present but malformed file is
    /// an error, so typos do not silently reset a user's configuration.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    /// Load settings from a JSON string.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        Ok(settings)
    }

    /// Write settings to a JSON file, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Report recipients as a trimmed list, empty entries dropped.
    pub fn recipient_list(&self) -> Vec<String> {
        split_recipients(&self.recipients)
    }

    /// Escalation recipients as a trimmed list, empty entries dropped.
    pub fn escalation_recipient_list(&self) -> Vec<String> {
        split_recipients(&self.escalation_recipients)
    }

    /// Resolve the output folder as a path.
    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.output_folder)
    }

    /// Validate the settings.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.output_folder.trim().is_empty() {
            anyhow::bail!("OutputFolder must not be empty");
        }
        if !self.escalation_recipients.trim().is_empty() && self.escalation_days == 0 {
            anyhow::bail!("EscalationDays must be > 0 when escalation recipients are set");
        }
        Ok(())
    }
}

/// Split a semicolon-joined recipient string into trimmed entries.
pub fn split_recipients(joined: &str) -> Vec<String> {
    joined
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Pipeline tuning knobs.
///
/// These are deployment-level settings rather than user preferences,
/// so they live outside the settings file. All fields have defaults
/// sized for typical tracking sheets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tuning {
    /// Worksheet names given the multi-table positional treatment.
    /// Matched case- and punctuation-insensitively.
    #[serde(default = "default_special_sheets")]
    pub special_sheets: Vec<String>,

    /// Minimum recognized header cells for a row to count as a header
    /// row when scanning multi-table sheets.
    #[serde(default = "default_header_match_threshold")]
    pub header_match_threshold: usize,

    /// Rows scanned between cancellation checkpoints.
    #[serde(default = "default_cancel_batch_rows")]
    pub cancel_batch_rows: usize,

    /// Progress reporting interval in milliseconds.
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    /// Hard ceiling on job runtime in seconds.
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,

    /// Attempts for the source archive copy.
    #[serde(default = "default_archive_attempts")]
    pub archive_attempts: usize,

    /// Fixed delay between archive copy attempts in milliseconds.
    #[serde(default = "default_archive_backoff_ms")]
    pub archive_backoff_ms: u64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            special_sheets: default_special_sheets(),
            header_match_threshold: default_header_match_threshold(),
            cancel_batch_rows: default_cancel_batch_rows(),
            progress_interval_ms: default_progress_interval_ms(),
            job_timeout_secs: default_job_timeout_secs(),
            archive_attempts: default_archive_attempts(),
            archive_backoff_ms: default_archive_backoff_ms(),
        }
    }
}

impl Tuning {
    /// Validate the tuning values.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.header_match_threshold == 0 {
            anyhow::bail!("header_match_threshold must be > 0");
        }
        if self.cancel_batch_rows == 0 {
            anyhow::bail!("cancel_batch_rows must be > 0");
        }
        if self.job_timeout_secs == 0 {
            anyhow::bail!("job_timeout_secs must be > 0");
        }
        if self.archive_attempts == 0 {
            anyhow::bail!("archive_attempts must be > 0");
        }
        Ok(())
    }
}

// Default value functions for serde
fn default_special_sheets() -> Vec<String> {
    vec!["Release Checklist".to_string(), "Go-No-Go".to_string()]
}
fn default_header_match_threshold() -> usize { 2 }
fn default_cancel_batch_rows() -> usize { 64 }
fn default_progress_interval_ms() -> u64 { 200 }
fn default_job_timeout_secs() -> u64 { 600 }
fn default_archive_attempts() -> usize { 3 }
fn default_archive_backoff_ms() -> u64 { 500 }
