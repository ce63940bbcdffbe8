//! Progress reporting between the worker and the controller.
//!
//! The worker publishes into a `watch` channel through a rate-gated
//! [`ProgressSink`]; the controller side reads the latest value on a
//! fixed interval via [`ProgressReporter`] instead of waking on every
//! row.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::interval;
use tracing::info;

/// Latest progress of a running job.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Percent of the current activity, 0..=100.
    pub percent: u8,
    pub activity: String,
    pub rows_done: u64,
    pub rows_total: u64,
}

impl Default for ProgressUpdate {
    fn default() -> Self {
        Self {
            percent: 0,
            activity: "queued".to_string(),
            rows_done: 0,
            rows_total: 0,
        }
    }
}

/// Worker-side progress publisher.
///
/// Emits at most one update per whole percent of rows processed, plus
/// one at the start of each activity and one at completion, so a large
/// sheet cannot flood the channel.
pub struct ProgressSink {
    tx: watch::Sender<ProgressUpdate>,
    activity: String,
    total: u64,
    done: u64,
    last_percent: u8,
    updates_sent: u64,
}

impl ProgressSink {
    pub fn new(tx: watch::Sender<ProgressUpdate>) -> Self {
        Self {
            tx,
            activity: String::new(),
            total: 0,
            done: 0,
            last_percent: 0,
            updates_sent: 0,
        }
    }

    /// Start a new activity over `total` units. Always emits 0%.
    pub fn begin(&mut self, activity: impl Into<String>, total: u64) {
        self.activity = activity.into();
        self.total = total;
        self.done = 0;
        self.last_percent = 0;
        self.emit(0);
    }

    /// Record `n` finished units; emits only when the whole percent
    /// changed.
    pub fn advance(&mut self, n: u64) {
        self.done = self.done.saturating_add(n).min(self.total);
        let percent = self.percent();
        if percent > self.last_percent {
            self.emit(percent);
        }
    }

    /// Switch the activity label without restarting the percent scale.
    pub fn note(&mut self, activity: impl Into<String>) {
        self.activity = activity.into();
        self.emit(self.last_percent);
    }

    /// Mark the job done. Always emits 100%.
    pub fn complete(&mut self) {
        self.done = self.total;
        self.emit(100);
    }

    /// Updates actually pushed into the channel.
    pub fn updates_sent(&self) -> u64 {
        self.updates_sent
    }

    fn percent(&self) -> u8 {
        if self.total == 0 {
            100
        } else {
            ((self.done * 100) / self.total).min(100) as u8
        }
    }

    fn emit(&mut self, percent: u8) {
        self.last_percent = percent;
        self.updates_sent += 1;
        self.tx.send_replace(ProgressUpdate {
            percent,
            activity: self.activity.clone(),
            rows_done: self.done,
            rows_total: self.total,
        });
    }
}

/// Periodic progress logger on the controller side.
pub struct ProgressReporter {
    rx: watch::Receiver<ProgressUpdate>,
    interval: Duration,
}

impl ProgressReporter {
    pub fn new(rx: watch::Receiver<ProgressUpdate>, interval: Duration) -> Self {
        Self { rx, interval }
    }

    /// Log the latest update at a fixed interval until shutdown.
    pub async fn run(self, mut shutdown: mpsc::Receiver<()>) {
        let mut ticker = interval(self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let update = self.rx.borrow().clone();
                    info!(
                        percent = update.percent,
                        activity = %update.activity,
                        rows = update.rows_done,
                        total = update.rows_total,
                        "job progress"
                    );
                }
                _ = shutdown.recv() => {
                    let update = self.rx.borrow().clone();
                    info!(
                        percent = update.percent,
                        activity = %update.activity,
                        "job progress (final)"
                    );
                    break;
                }
            }
        }
    }
}
