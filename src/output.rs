//! Terminal rendering of batch events.
//!
//! `TerminalSink` draws a batch bar and a file bar with `indicatif`;
//! `JsonSink` writes one JSON object per event for other programs to read.

use crate::events::{BatchEvent, NotificationSink};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use owo_colors::OwoColorize;
use std::io::Write;
use std::path::Path;

/// Longest encoder line shown as the file bar message.
const STATUS_WIDTH: usize = 60;

/// Progress-bar renderer for interactive use.
///
/// Encoder output is echoed above the bars only in verbose mode; otherwise the
/// most recent line is shown as the file bar's message.
pub struct TerminalSink {
    multi: MultiProgress,
    batch_bar: ProgressBar,
    file_bar: ProgressBar,
    quiet: bool,
    verbose: bool,
}

impl TerminalSink {
    pub fn new(quiet: bool, verbose: u8) -> Self {
        let multi = if quiet {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::new()
        };
        let batch_bar = multi.add(ProgressBar::new(100));
        batch_bar.set_style(bar_style(
            "{prefix:>7.bold} [{bar:40.cyan/blue}] {pos:>3}% {msg}",
        ));
        batch_bar.set_prefix("Batch");
        let file_bar = multi.add(ProgressBar::new(100));
        file_bar.set_style(bar_style(
            "{prefix:>7.dim} [{bar:40.green/white}] {pos:>3}% {wide_msg:.dim}",
        ));
        file_bar.set_prefix("File");

        Self {
            multi,
            batch_bar,
            file_bar,
            quiet,
            verbose: verbose > 0,
        }
    }

    fn println(&self, line: impl AsRef<str>) {
        if self.quiet {
            return;
        }
        if self.multi.println(line.as_ref()).is_err() {
            eprintln!("{}", line.as_ref());
        }
    }

    /// Remove the bars so the summary prints on a clean terminal.
    pub fn finish(&self) {
        self.file_bar.finish_and_clear();
        self.batch_bar.finish_and_clear();
    }
}

fn bar_style(template: &str) -> ProgressStyle {
    // SAFETY: hardcoded template strings, always valid
    #[allow(clippy::expect_used)]
    let style = ProgressStyle::default_bar()
        .template(template)
        .expect("hardcoded progress bar template")
        .progress_chars("#>-");
    style
}

fn percent_position(percent: f64) -> u64 {
    percent.clamp(0.0, 100.0).round() as u64
}

impl NotificationSink for TerminalSink {
    fn notify(&mut self, event: &BatchEvent) {
        match event {
            BatchEvent::LogLine { text } => {
                if self.verbose {
                    self.println(format!("  {}", text.dimmed()));
                } else {
                    self.file_bar.set_message(truncate(text, STATUS_WIDTH));
                }
            }
            BatchEvent::FileProgress { percent } => {
                self.file_bar.set_position(percent_position(*percent));
            }
            BatchEvent::BatchProgress { percent } => {
                self.batch_bar.set_position(percent_position(*percent));
            }
            BatchEvent::JobStarted {
                index,
                total,
                input,
            } => {
                self.batch_bar
                    .set_message(format!("{}/{}", index + 1, total));
                self.file_bar.set_message(String::new());
                self.println(format!(
                    "{} Converting: {}",
                    "▶".cyan(),
                    display_name(input)
                ));
            }
            BatchEvent::JobFailed { output_path } => {
                // Failures are shown even in quiet mode.
                let line = format!(
                    "{} Conversion failed for {}",
                    "✗".red(),
                    output_path.display()
                );
                if self.quiet {
                    eprintln!("{}", line);
                } else {
                    self.println(line);
                }
            }
            BatchEvent::BatchSucceeded {
                output_dir,
                succeeded,
                failed,
            } => {
                self.finish();
                if *failed == 0 {
                    self.println(format!(
                        "{} {} video(s) written to {}",
                        "✓".green(),
                        succeeded,
                        output_dir.display()
                    ));
                } else {
                    self.println(format!(
                        "{} {} succeeded, {} failed. Output: {}",
                        "⚠".yellow(),
                        succeeded,
                        failed,
                        output_dir.display()
                    ));
                }
            }
            BatchEvent::BatchCancelled => {
                self.finish();
                self.println(format!("{}", "Batch conversion cancelled.".yellow()));
            }
        }
    }
}

/// One JSON object per line, flushed after each event.
pub struct JsonSink<W: Write> {
    out: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> NotificationSink for JsonSink<W> {
    fn notify(&mut self, event: &BatchEvent) {
        let written = serde_json::to_writer(&mut self.out, event)
            .map_err(std::io::Error::from)
            .and_then(|()| writeln!(self.out))
            .and_then(|()| self.out.flush());
        if let Err(e) = written {
            log::warn!("failed to write event: {}", e);
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Shorten `text` to at most `max` characters, marking the cut with an ellipsis.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}…")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_json_sink_writes_one_line_per_event() {
        let mut sink = JsonSink::new(Vec::new());
        sink.notify(&BatchEvent::log("frame=1"));
        sink.notify(&BatchEvent::BatchProgress { percent: 50.0 });
        sink.notify(&BatchEvent::BatchCancelled);

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#"{"event":"log_line","text":"frame=1"}"#,
                r#"{"event":"batch_progress","percent":50.0}"#,
                r#"{"event":"batch_cancelled"}"#,
            ]
        );
    }

    #[test]
    fn test_json_sink_job_started_shape() {
        let mut sink = JsonSink::new(Vec::new());
        sink.notify(&BatchEvent::JobStarted {
            index: 0,
            total: 3,
            input: PathBuf::from("/m/a.mp3"),
        });
        let value: serde_json::Value = serde_json::from_slice(&sink.into_inner()).unwrap();
        assert_eq!(value["event"], "job_started");
        assert_eq!(value["index"], 0);
        assert_eq!(value["total"], 3);
        assert_eq!(value["input"], "/m/a.mp3");
    }

    #[test]
    fn test_terminal_sink_tracks_progress() {
        let mut sink = TerminalSink::new(true, 0);
        sink.notify(&BatchEvent::BatchProgress { percent: 66.6 });
        sink.notify(&BatchEvent::FileProgress { percent: 12.4 });
        assert_eq!(sink.batch_bar.position(), 67);
        assert_eq!(sink.file_bar.position(), 12);

        sink.notify(&BatchEvent::FileProgress { percent: 250.0 });
        assert_eq!(sink.file_bar.position(), 100);
    }

    #[test]
    fn test_terminal_sink_shows_last_line_when_not_verbose() {
        let mut sink = TerminalSink::new(true, 0);
        sink.notify(&BatchEvent::log("size=1024kB time=00:00:05.00"));
        assert_eq!(sink.file_bar.message(), "size=1024kB time=00:00:05.00");
    }

    #[test]
    fn test_terminal_sink_handles_terminal_events() {
        let mut sink = TerminalSink::new(true, 1);
        sink.notify(&BatchEvent::BatchSucceeded {
            output_dir: PathBuf::from("/out"),
            succeeded: 2,
            failed: 0,
        });
        assert!(sink.batch_bar.is_finished());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
        assert_eq!(truncate("ééééé", 5), "ééééé");
    }

    #[test]
    fn test_percent_position_rounds_and_clamps() {
        assert_eq!(percent_position(33.33), 33);
        assert_eq!(percent_position(66.67), 67);
        assert_eq!(percent_position(-1.0), 0);
        assert_eq!(percent_position(f64::NAN), 0);
    }
}
