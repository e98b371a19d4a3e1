//! Runs the encoder for one job and streams its output.
//!
//! ffmpeg writes its log and progress to stderr, rewriting the progress line
//! with `\r`. Both pipes are drained to EOF before the exit status is read, so
//! a chatty encoder can never stall on a full pipe.

use std::io::{self, BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;

use crate::events::{BatchEvent, EventSender};
use crate::job::{FitMode, Job};
use crate::progress::FileProgress;

/// Terminal result of a single job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    /// `exit_code` is `None` when the encoder could not be started or died from a signal.
    Failed { exit_code: Option<i32> },
    Cancelled,
}

/// State shared between the batch worker and whoever may cancel it.
///
/// The child slot is locked only to store, kill, or take the process, never
/// while waiting on it.
#[derive(Debug, Default)]
pub struct BatchControl {
    cancelled: AtomicBool,
    active: Mutex<Option<Child>>,
}

impl BatchControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear the flag before a new batch.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    /// Request cancellation and kill the active encoder, if any.
    ///
    /// Returns true when a running process was killed.
    pub fn cancel(&self) -> bool {
        self.cancelled.store(true, Ordering::SeqCst);
        self.kill_active()
    }

    /// True while an encoder process is registered.
    pub fn has_active(&self) -> bool {
        self.slot().is_some()
    }

    fn slot(&self) -> MutexGuard<'_, Option<Child>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn install(&self, child: Child) {
        *self.slot() = Some(child);
    }

    fn kill_active(&self) -> bool {
        let mut slot = self.slot();
        let Some(child) = slot.as_mut() else {
            return false;
        };
        match child.kill() {
            Ok(()) => {
                log::info!("killed encoder process {}", child.id());
                true
            }
            Err(e) => {
                log::debug!("encoder process {} already gone: {}", child.id(), e);
                false
            }
        }
    }

    /// Take the active child out of the slot and wait for it without holding the lock.
    fn wait_active(&self) -> Option<io::Result<ExitStatus>> {
        let child = self.slot().take();
        child.map(|mut c| c.wait())
    }
}

/// Launches the encoder for one job at a time.
#[derive(Debug, Clone)]
pub struct JobRunner {
    ffmpeg: PathBuf,
}

impl JobRunner {
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }

    /// Encode `job` and block until the encoder exits.
    ///
    /// Every output line becomes a `LogLine` event; stderr lines carrying a
    /// timestamp also produce `FileProgress` when the job's duration is known.
    pub fn run_job(
        &self,
        job: &Job,
        fit: FitMode,
        control: &BatchControl,
        events: &EventSender,
    ) -> JobOutcome {
        let mut child = match Command::new(&self.ffmpeg)
            .args(job.encoder_args(fit))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                events.log(format!("Failed to start {}: {}", self.ffmpeg.display(), e));
                return report_failure(job, None, events);
            }
        };
        log::debug!(
            "started encoder pid {} for {}",
            child.id(),
            job.input_audio.display()
        );

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        control.install(child);
        // A cancel that raced with the spawn saw an empty slot; kill now instead.
        if control.is_cancelled() {
            control.kill_active();
        }

        let stdout_reader = stdout.map(|out| {
            let events = events.clone();
            thread::spawn(move || {
                if let Err(e) = for_each_line(BufReader::new(out), |line| events.log(line)) {
                    log::warn!("error reading encoder stdout: {}", e);
                }
            })
        });

        if let Some(err) = stderr {
            let mut progress = FileProgress::new(job.duration_seconds);
            let drained = for_each_line(BufReader::new(err), |line| {
                events.log(line);
                if let Some(percent) = progress.observe(line) {
                    events.file_progress(percent);
                }
            });
            if let Err(e) = drained {
                log::warn!("error reading encoder stderr: {}", e);
            }
        }

        if let Some(handle) = stdout_reader
            && handle.join().is_err()
        {
            log::error!("encoder stdout reader panicked");
        }

        let status = match control.wait_active() {
            Some(Ok(status)) => status,
            Some(Err(e)) => {
                log::warn!("failed to wait for encoder: {}", e);
                return if control.is_cancelled() {
                    JobOutcome::Cancelled
                } else {
                    report_failure(job, None, events)
                };
            }
            None => {
                log::warn!("encoder process vanished from the batch control");
                return JobOutcome::Cancelled;
            }
        };

        if status.success() {
            log::info!("encoded {}", job.output_path.display());
            JobOutcome::Success
        } else if control.is_cancelled() {
            log::info!("encoder for {} stopped by cancellation", job.output_path.display());
            JobOutcome::Cancelled
        } else {
            report_failure(job, status.code(), events)
        }
    }
}

fn report_failure(job: &Job, exit_code: Option<i32>, events: &EventSender) -> JobOutcome {
    log::warn!(
        "conversion failed for {} (exit code {:?})",
        job.output_path.display(),
        exit_code
    );
    events.log(format!(
        "✗ Conversion failed for {}",
        job.output_path.display()
    ));
    events.send(BatchEvent::JobFailed {
        output_path: job.output_path.clone(),
    });
    JobOutcome::Failed { exit_code }
}

/// Call `f` for every line of `reader`, treating both `\n` and `\r` as line ends.
///
/// Lines are decoded lossily and stripped of trailing whitespace. Blank lines
/// are skipped.
pub(crate) fn for_each_line<R: Read>(
    mut reader: BufReader<R>,
    mut f: impl FnMut(&str),
) -> io::Result<()> {
    let mut pending: Vec<u8> = Vec::new();
    loop {
        let (consumed, line_done) = {
            let buf = match reader.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if buf.is_empty() {
                break;
            }
            match buf.iter().position(|b| *b == b'\n' || *b == b'\r') {
                Some(pos) => {
                    pending.extend_from_slice(&buf[..pos]);
                    (pos + 1, true)
                }
                None => {
                    pending.extend_from_slice(buf);
                    (buf.len(), false)
                }
            }
        };
        reader.consume(consumed);
        if line_done {
            emit_line(&mut pending, &mut f);
        }
    }
    emit_line(&mut pending, &mut f);
    Ok(())
}

fn emit_line(pending: &mut Vec<u8>, f: &mut impl FnMut(&str)) {
    let line = String::from_utf8_lossy(pending);
    let line = line.trim_end();
    if !line.is_empty() {
        f(line);
    }
    pending.clear();
}
