//! Async supervision of report jobs.
//!
//! [`JobController`] accepts at most one job at a time. Each accepted
//! job gets a supervisor task that moves the state machine, relays
//! progress to an interval logger, and enforces the watchdog timeout.
//! The report pipeline itself runs on a blocking worker thread and is
//! cancelled cooperatively through a [`CancellationToken`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Tuning;
use crate::error::{ReportError, Result};
use crate::job::progress::{ProgressReporter, ProgressSink, ProgressUpdate};
use crate::job::runner;
use crate::job::state::{JobKind, JobOutcome, JobState, ReportRequest};
use crate::report::escalation::{LogMailSender, MailSender};

/// Supervisor knobs, usually derived from [`Tuning`].
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Hard ceiling on job runtime. When it elapses the supervisor
    /// cancels the token, marks the job timed out, and abandons the
    /// worker thread to wind down on its own.
    pub timeout: Duration,
    /// Cadence of the progress log line while a job runs.
    pub progress_interval: Duration,
}

impl ControllerConfig {
    pub fn from_tuning(tuning: &Tuning) -> Self {
        Self {
            timeout: Duration::from_secs(tuning.job_timeout_secs),
            progress_interval: Duration::from_millis(tuning.progress_interval_ms),
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from_tuning(&Tuning::default())
    }
}

/// Accepts report jobs and runs them one at a time.
///
/// The single-job rule is a busy flag, not a queue: a submission while
/// a job is live fails fast with [`ReportError::ControllerBusy`] and
/// the caller decides whether to retry.
pub struct JobController {
    config: ControllerConfig,
    mailer: Arc<dyn MailSender>,
    busy: Arc<AtomicBool>,
}

impl JobController {
    pub fn new(config: ControllerConfig) -> Self {
        Self::with_mailer(config, Arc::new(LogMailSender))
    }

    /// Controller with a caller-supplied escalation sender.
    pub fn with_mailer(config: ControllerConfig, mailer: Arc<dyn MailSender>) -> Self {
        Self {
            config,
            mailer,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Submit a report job. Must be called from within a Tokio runtime.
    pub fn submit(&self, request: ReportRequest) -> Result<ReportJob> {
        let kind = request.kind;
        let mailer = Arc::clone(&self.mailer);
        self.submit_task(kind, move |sink, cancel| {
            runner::execute(request, sink, cancel, mailer.as_ref())
        })
    }

    /// Shared submission path. Tests drive the supervisor with stub
    /// closures through here; production goes through [`submit`].
    ///
    /// [`submit`]: JobController::submit
    pub(crate) fn submit_task<F>(&self, kind: JobKind, work: F) -> Result<ReportJob>
    where
        F: FnOnce(ProgressSink, CancellationToken) -> Result<JobOutcome> + Send + 'static,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ReportError::ControllerBusy);
        }
        // The guard travels into the supervisor so every exit path,
        // including a panic, releases the slot.
        let slot = SlotGuard {
            busy: Arc::clone(&self.busy),
        };

        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(JobState::Pending);
        let (progress_tx, progress_rx) = watch::channel(ProgressUpdate::default());
        let (outcome_tx, outcome_rx) = oneshot::channel();

        let supervisor = Supervisor {
            id,
            kind,
            slot,
            timeout: self.config.timeout,
            progress_interval: self.config.progress_interval,
            cancel: cancel.clone(),
            state_tx,
            progress_tx,
            progress_rx: progress_rx.clone(),
        };
        tokio::spawn(supervisor.run(work, outcome_tx));
        info!(job = %id, %kind, "job accepted");

        Ok(ReportJob {
            id,
            kind,
            cancel,
            state_rx,
            progress_rx,
            outcome_rx: Some(outcome_rx),
        })
    }
}

/// Caller-side handle to a submitted job.
pub struct ReportJob {
    id: Uuid,
    kind: JobKind,
    cancel: CancellationToken,
    state_rx: watch::Receiver<JobState>,
    progress_rx: watch::Receiver<ProgressUpdate>,
    outcome_rx: Option<oneshot::Receiver<Result<JobOutcome>>>,
}

impl ReportJob {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    /// Latest observed state.
    pub fn state(&self) -> JobState {
        *self.state_rx.borrow()
    }

    /// Latest progress update.
    pub fn progress(&self) -> ProgressUpdate {
        self.progress_rx.borrow().clone()
    }

    /// Watch state transitions as they happen.
    pub fn state_receiver(&self) -> watch::Receiver<JobState> {
        self.state_rx.clone()
    }

    /// Request cooperative cancellation. The worker stops at its next
    /// row-batch checkpoint. No effect once the job is terminal.
    pub fn cancel(&self) {
        if !self.state().is_terminal() {
            self.cancel.cancel();
        }
    }

    /// Wait for the job to finish and take its outcome. At most one
    /// call observes it; later calls report an internal error. A wait
    /// future dropped before the job finishes leaves the outcome in
    /// place for a retry.
    pub async fn wait(&mut self) -> Result<JobOutcome> {
        // Cleared only after the receiver yields, so dropping an
        // unfinished wait does not consume the outcome.
        let Some(rx) = self.outcome_rx.as_mut() else {
            return Err(ReportError::Internal(
                "job outcome already taken".to_string(),
            ));
        };
        let received = rx.await;
        self.outcome_rx = None;
        match received {
            Ok(outcome) => outcome,
            Err(_) => Err(ReportError::Internal(
                "supervisor dropped before delivering an outcome".to_string(),
            )),
        }
    }
}

/// Releases the controller's busy flag on drop.
struct SlotGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Per-job supervisor task state.
struct Supervisor {
    id: Uuid,
    kind: JobKind,
    slot: SlotGuard,
    timeout: Duration,
    progress_interval: Duration,
    cancel: CancellationToken,
    state_tx: watch::Sender<JobState>,
    progress_tx: watch::Sender<ProgressUpdate>,
    progress_rx: watch::Receiver<ProgressUpdate>,
}

impl Supervisor {
    async fn run<F>(self, work: F, outcome_tx: oneshot::Sender<Result<JobOutcome>>)
    where
        F: FnOnce(ProgressSink, CancellationToken) -> Result<JobOutcome> + Send + 'static,
    {
        let Supervisor {
            id,
            kind,
            slot,
            timeout,
            progress_interval,
            cancel,
            state_tx,
            progress_tx,
            progress_rx,
        } = self;
        let _slot = slot;

        state_tx.send_replace(JobState::Running);
        let started = tokio::time::Instant::now();

        let (reporter_stop_tx, reporter_stop_rx) = mpsc::channel::<()>(1);
        let reporter = tokio::spawn(
            ProgressReporter::new(progress_rx, progress_interval).run(reporter_stop_rx),
        );

        let sink = ProgressSink::new(progress_tx);
        let worker_cancel = cancel.clone();
        let mut worker = tokio::task::spawn_blocking(move || work(sink, worker_cancel));

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);
        let mut cancel_seen = false;

        let result = loop {
            tokio::select! {
                joined = &mut worker => {
                    break match joined {
                        Ok(result) => result,
                        Err(join_err) => Err(ReportError::Internal(format!(
                            "report worker panicked: {join_err}"
                        ))),
                    };
                }
                // Guarded so the branch arms once; the token stays
                // cancelled and would otherwise win every iteration.
                _ = cancel.cancelled(), if !cancel_seen => {
                    cancel_seen = true;
                    info!(job = %id, "cancellation requested, waiting for the worker checkpoint");
                    state_tx.send_replace(JobState::Cancelling);
                }
                _ = &mut deadline => {
                    warn!(
                        job = %id,
                        ceiling_secs = timeout.as_secs(),
                        "job exceeded its time ceiling, abandoning the worker"
                    );
                    cancel.cancel();
                    state_tx.send_replace(JobState::TimedOut);
                    drop(reporter_stop_tx);
                    let _ = reporter.await;
                    let _ = outcome_tx.send(Err(ReportError::Timeout {
                        elapsed_secs: started.elapsed().as_secs(),
                        ceiling_secs: timeout.as_secs(),
                    }));
                    return;
                }
            }
        };

        drop(reporter_stop_tx);
        let _ = reporter.await;

        let state = match &result {
            Ok(outcome) => {
                info!(job = %id, %kind, summary = %outcome.summary(), "job completed");
                JobState::Completed
            }
            Err(e) => {
                error!(job = %id, %kind, error = %e, "job failed");
                JobState::Failed
            }
        };
        state_tx.send_replace(state);
        let _ = outcome_tx.send(result);
    }
}
