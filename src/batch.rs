//! Batch orchestration: one worker thread encodes the jobs of a batch in
//! order while the caller stays free to watch events or cancel.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::{Result, StillcastError};
use crate::events::{self, BatchEvent, EventReceiver, EventSender};
use crate::exec::{CommandExecutor, SystemCommandExecutor};
use crate::preflight::ToolPaths;
use crate::probe::DurationProbe;
use crate::queue::{BatchPlan, JobQueue};
use crate::runner::{BatchControl, JobOutcome, JobRunner};

/// Lifecycle of the orchestrator. A new batch may start from any state but `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    Idle,
    Running,
    Completed,
    Cancelled,
}

/// Counts for a finished batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub state: BatchState,
    pub succeeded: usize,
    pub failed: usize,
    /// Jobs that never reached a terminal encode, including the one cancelled mid-run.
    pub skipped: usize,
    pub elapsed: Duration,
}

/// Drives batches of jobs through the probe and the encoder.
pub struct BatchOrchestrator {
    runner: JobRunner,
    probe: DurationProbe,
    control: Arc<BatchControl>,
    state: Arc<Mutex<BatchState>>,
    events_tx: EventSender,
    events_rx: EventReceiver,
    worker: Option<JoinHandle<BatchReport>>,
}

impl BatchOrchestrator {
    /// Orchestrator running the given tools through the system executor.
    pub fn new(tools: &ToolPaths) -> Self {
        Self::with_executor(tools, Arc::new(SystemCommandExecutor::new()))
    }

    /// Same as `new`, with a custom executor for the duration probe.
    pub fn with_executor(tools: &ToolPaths, executor: Arc<dyn CommandExecutor>) -> Self {
        let (events_tx, events_rx) = events::channel();
        Self {
            runner: JobRunner::new(&tools.ffmpeg),
            probe: DurationProbe::new(&tools.ffprobe, executor),
            control: Arc::new(BatchControl::new()),
            state: Arc::new(Mutex::new(BatchState::Idle)),
            events_tx,
            events_rx,
            worker: None,
        }
    }

    /// Receiver for the events of every batch this orchestrator runs.
    pub fn events(&self) -> EventReceiver {
        self.events_rx.clone()
    }

    pub fn state(&self) -> BatchState {
        *lock(&self.state)
    }

    pub fn is_running(&self) -> bool {
        self.state() == BatchState::Running
    }

    /// True once the worker thread of the last started batch has exited,
    /// whether it finished normally or panicked.
    pub fn worker_finished(&self) -> bool {
        self.worker.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Start converting everything in `queue` on a worker thread.
    ///
    /// Fails without side effects when the queue is not ready or a batch is
    /// already running. The queue is snapshotted; later edits do not affect
    /// the running batch.
    pub fn start_batch(&mut self, queue: &JobQueue) -> Result<()> {
        if !queue.is_ready() {
            return Err(StillcastError::NotReady);
        }
        let plan = queue.snapshot()?;

        {
            let shared = Arc::clone(&self.state);
            let mut state = lock(&shared);
            if *state == BatchState::Running {
                return Err(StillcastError::AlreadyRunning);
            }
            self.reap_worker();
            self.control.reset();
            *state = BatchState::Running;
        }

        self.events_tx.batch_progress(0.0);
        self.events_tx.file_progress(0.0);
        log::info!(
            "starting batch of {} file(s) into {}",
            plan.jobs.len(),
            plan.output_dir.display()
        );

        let worker = BatchWorker {
            runner: self.runner.clone(),
            probe: self.probe.clone(),
            control: Arc::clone(&self.control),
            state: Arc::clone(&self.state),
            events: self.events_tx.clone(),
        };
        let spawned = thread::Builder::new()
            .name("stillcast-batch".to_string())
            .spawn(move || worker.run(plan));

        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                Ok(())
            }
            Err(e) => {
                *lock(&self.state) = BatchState::Idle;
                Err(StillcastError::Io(e))
            }
        }
    }

    /// Stop the running batch. The active encoder is killed immediately and
    /// no further jobs start. Does nothing when no batch is running.
    pub fn cancel_batch(&self) {
        let state = lock(&self.state);
        if *state != BatchState::Running {
            return;
        }
        if self.control.cancel() {
            self.events_tx.log("🛑 Conversion process terminated.");
        }
        log::info!("batch cancellation requested");
    }

    /// Block until the current batch finishes. Returns `None` when no batch was started.
    pub fn wait(&mut self) -> Option<BatchReport> {
        let handle = self.worker.take()?;
        match handle.join() {
            Ok(report) => Some(report),
            Err(panic_info) => {
                let msg = panic_info
                    .downcast_ref::<&str>()
                    .copied()
                    .or_else(|| panic_info.downcast_ref::<String>().map(|s| s.as_str()))
                    .unwrap_or("unknown panic");
                log::error!("batch worker panicked: {msg}");
                *lock(&self.state) = BatchState::Idle;
                None
            }
        }
    }

    /// Join a worker that has already left the `Running` state.
    fn reap_worker(&mut self) {
        if let Some(handle) = self.worker.take()
            && handle.join().is_err()
        {
            log::error!("previous batch worker panicked");
        }
    }
}

impl Drop for BatchOrchestrator {
    fn drop(&mut self) {
        self.cancel_batch();
        if let Some(handle) = self.worker.take()
            && handle.join().is_err()
        {
            log::error!("batch worker panicked during shutdown");
        }
    }
}

fn lock(state: &Mutex<BatchState>) -> MutexGuard<'_, BatchState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Everything the worker thread owns for one batch.
struct BatchWorker {
    runner: JobRunner,
    probe: DurationProbe,
    control: Arc<BatchControl>,
    state: Arc<Mutex<BatchState>>,
    events: EventSender,
}

impl BatchWorker {
    fn run(self, plan: BatchPlan) -> BatchReport {
        let started = Instant::now();
        let total = plan.jobs.len();
        let mut succeeded = 0;
        let mut failed = 0;
        let mut cancelled = false;

        for (index, job) in plan.jobs.into_iter().enumerate() {
            if self.control.is_cancelled() {
                cancelled = true;
                break;
            }

            self.events.file_progress(0.0);
            self.events.send(BatchEvent::JobStarted {
                index,
                total,
                input: job.input_audio.clone(),
            });
            self.events.log(format!(
                "🚀 Converting {} → {}",
                job.input_audio.display(),
                job.output_path.display()
            ));

            let duration = self.probe.probe_duration(&job.input_audio);
            if duration.is_none() {
                self.events.log(format!(
                    "Could not get duration for {}; file progress unavailable",
                    job.input_audio.display()
                ));
            }
            let job = job.with_duration(duration);

            match self
                .runner
                .run_job(&job, plan.fit_mode, &self.control, &self.events)
            {
                JobOutcome::Success => succeeded += 1,
                JobOutcome::Failed { .. } => failed += 1,
                JobOutcome::Cancelled => {
                    cancelled = true;
                    break;
                }
            }

            let done = index + 1;
            self.events
                .batch_progress(done as f64 / total as f64 * 100.0);
            self.events.file_progress(100.0);
        }

        let final_state = if cancelled {
            BatchState::Cancelled
        } else {
            BatchState::Completed
        };
        let report = BatchReport {
            state: final_state,
            succeeded,
            failed,
            skipped: total - succeeded - failed,
            elapsed: started.elapsed(),
        };

        // Leave `Running` before announcing the end so a listener may start
        // the next batch as soon as it sees the terminal event.
        *lock(&self.state) = final_state;
        self.finish(&report, plan.output_dir);
        report
    }

    fn finish(&self, report: &BatchReport, output_dir: PathBuf) {
        match report.state {
            BatchState::Cancelled => {
                log::info!(
                    "batch cancelled after {} succeeded, {} failed",
                    report.succeeded,
                    report.failed
                );
                self.events.log("🛑 Batch conversion cancelled.");
                self.events.send(BatchEvent::BatchCancelled);
            }
            _ => {
                log::info!(
                    "batch finished: {} succeeded, {} failed",
                    report.succeeded,
                    report.failed
                );
                self.events.log("🎉 Batch conversion finished!");
                self.events.send(BatchEvent::BatchSucceeded {
                    output_dir,
                    succeeded: report.succeeded,
                    failed: report.failed,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::MockCommandExecutor;

    fn tools() -> ToolPaths {
        ToolPaths {
            ffmpeg: PathBuf::from("/nonexistent/stillcast-test/ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }

    fn ready_queue(files: &[&str]) -> JobQueue {
        let mut queue = JobQueue::new();
        queue.add_audio(files.iter().copied());
        queue.set_image("/img/cover.png");
        queue.set_output_dir("/out");
        queue
    }

    #[test]
    fn test_new_orchestrator_is_idle() {
        let orchestrator = BatchOrchestrator::new(&tools());
        assert_eq!(orchestrator.state(), BatchState::Idle);
        assert!(!orchestrator.is_running());
    }

    #[test]
    fn test_start_rejects_unready_queue() {
        let mock = Arc::new(MockCommandExecutor::new());
        let mut orchestrator = BatchOrchestrator::with_executor(&tools(), mock.clone());

        let result = orchestrator.start_batch(&JobQueue::new());

        assert!(matches!(result, Err(StillcastError::NotReady)));
        assert_eq!(orchestrator.state(), BatchState::Idle);
        assert!(orchestrator.events().drain().is_empty());
        assert_eq!(mock.call_count(), 0);
        assert!(orchestrator.wait().is_none());
    }

    #[test]
    fn test_cancel_when_idle_is_noop() {
        let orchestrator = BatchOrchestrator::new(&tools());
        orchestrator.cancel_batch();
        orchestrator.cancel_batch();
        assert_eq!(orchestrator.state(), BatchState::Idle);
        assert!(orchestrator.events().drain().is_empty());
    }

    #[test]
    fn test_unstartable_encoder_fails_each_job_but_completes() {
        let mock = Arc::new(
            MockCommandExecutor::new()
                .with_response("10.0")
                .with_response("20.0"),
        );
        let mut orchestrator = BatchOrchestrator::with_executor(&tools(), mock.clone());
        let events = orchestrator.events();

        orchestrator
            .start_batch(&ready_queue(&["/m/a.mp3", "/m/b.mp3"]))
            .unwrap();
        let report = orchestrator.wait().unwrap();

        assert_eq!(report.state, BatchState::Completed);
        assert_eq!((report.succeeded, report.failed, report.skipped), (0, 2, 0));
        assert_eq!(orchestrator.state(), BatchState::Completed);
        assert_eq!(mock.call_count(), 2);

        let events = events.drain();
        let failures: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, BatchEvent::JobFailed { .. }))
            .collect();
        assert_eq!(failures.len(), 2);
        assert_eq!(
            events.last(),
            Some(&BatchEvent::BatchSucceeded {
                output_dir: PathBuf::from("/out"),
                succeeded: 0,
                failed: 2,
            })
        );
    }

    #[test]
    fn test_batch_can_restart_after_finishing() {
        let mut orchestrator =
            BatchOrchestrator::with_executor(&tools(), Arc::new(MockCommandExecutor::new()));
        let queue = ready_queue(&["/m/a.mp3"]);

        orchestrator.start_batch(&queue).unwrap();
        orchestrator.wait().unwrap();
        orchestrator.start_batch(&queue).unwrap();
        let report = orchestrator.wait().unwrap();

        assert_eq!(report.state, BatchState::Completed);
    }

    #[test]
    fn test_start_resets_progress_first() {
        let mut orchestrator =
            BatchOrchestrator::with_executor(&tools(), Arc::new(MockCommandExecutor::new()));
        orchestrator
            .start_batch(&ready_queue(&["/m/a.mp3"]))
            .unwrap();
        orchestrator.wait().unwrap();

        let events = orchestrator.events().drain();
        assert_eq!(events[0], BatchEvent::BatchProgress { percent: 0.0 });
        assert_eq!(events[1], BatchEvent::FileProgress { percent: 0.0 });
    }
}
