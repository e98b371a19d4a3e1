//! Notification protocol between the batch worker and the front end.
//!
//! The worker never calls into the front end. It pushes `BatchEvent`s into an
//! unbounded FIFO channel, and the front end drains the channel on its own
//! timer (see `EventReceiver::drain_into`).

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, unbounded};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Events emitted while a batch runs, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BatchEvent {
    /// One line of encoder output, or a status message from the core.
    LogLine { text: String },
    /// Progress of the current file, 0-100.
    FileProgress { percent: f64 },
    /// Progress of the whole batch, 0-100.
    BatchProgress { percent: f64 },
    /// A job is about to be probed and encoded. `index` is zero-based.
    JobStarted {
        index: usize,
        total: usize,
        input: PathBuf,
    },
    /// The encoder exited non-zero for this output (not counting cancellation).
    JobFailed { output_path: PathBuf },
    /// Every job ran. Some of them may have failed.
    BatchSucceeded {
        output_dir: PathBuf,
        succeeded: usize,
        failed: usize,
    },
    /// The batch stopped early on request.
    BatchCancelled,
}

impl BatchEvent {
    pub fn log(text: impl Into<String>) -> Self {
        BatchEvent::LogLine { text: text.into() }
    }

    /// True for the last event of a batch.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchEvent::BatchSucceeded { .. } | BatchEvent::BatchCancelled
        )
    }
}

/// Worker side of the event channel. Sending never blocks.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<BatchEvent>,
}

impl EventSender {
    pub fn send(&self, event: BatchEvent) {
        // A front end that went away just stops listening; the batch carries on.
        if self.tx.send(event).is_err() {
            log::debug!("event receiver dropped, discarding event");
        }
    }

    pub fn log(&self, text: impl Into<String>) {
        self.send(BatchEvent::log(text));
    }

    pub fn file_progress(&self, percent: f64) {
        self.send(BatchEvent::FileProgress { percent });
    }

    pub fn batch_progress(&self, percent: f64) {
        self.send(BatchEvent::BatchProgress { percent });
    }
}

/// Front-end side of the event channel.
#[derive(Debug, Clone)]
pub struct EventReceiver {
    rx: Receiver<BatchEvent>,
}

impl EventReceiver {
    /// Take everything queued right now without waiting.
    pub fn drain(&self) -> Vec<BatchEvent> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        events
    }

    /// Drain queued events into `sink`. Returns true once a terminal event was seen.
    pub fn drain_into(&self, sink: &mut dyn NotificationSink) -> bool {
        let mut finished = false;
        for event in self.drain() {
            finished |= event.is_terminal();
            sink.notify(&event);
        }
        finished
    }

    /// Wait up to `timeout` for one event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<BatchEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

/// Create a connected sender/receiver pair.
pub fn channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = unbounded();
    (EventSender { tx }, EventReceiver { rx })
}

/// Consumer of batch events (terminal renderer, GUI bridge, test collector).
pub trait NotificationSink {
    fn notify(&mut self, event: &BatchEvent);
}

/// Sink that keeps every event. Used in tests and for post-run summaries.
#[derive(Debug, Default)]
pub struct CollectorSink {
    events: Vec<BatchEvent>,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[BatchEvent] {
        &self.events
    }
}

impl NotificationSink for CollectorSink {
    fn notify(&mut self, event: &BatchEvent) {
        self.events.push(event.clone());
    }
}
