//! Batch conversion entry point for the command line.
//!
//! Composes the pieces: arguments and config → job queue → preflight →
//! orchestrator, then renders events until the batch ends or Ctrl+C cancels it.

use crate::batch::{BatchOrchestrator, BatchReport, BatchState};
use crate::config::Config;
use crate::defaults;
use crate::error::{Result, StillcastError};
use crate::events::NotificationSink;
use crate::exec::SystemCommandExecutor;
use crate::job::{FitMode, output_path_for};
use crate::output::{JsonSink, TerminalSink};
use crate::preflight::{install_hint, preflight};
use crate::queue::{JobQueue, is_supported_audio, is_supported_image};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Options for one conversion run, taken from the command line.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub inputs: Vec<PathBuf>,
    pub image: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub fit: Option<FitMode>,
    pub json: bool,
    pub quiet: bool,
    pub verbose: u8,
}

/// How a conversion run ended, mapped onto the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    AllSucceeded,
    SomeFailed,
    Cancelled,
}

impl RunOutcome {
    pub fn from_report(report: &BatchReport) -> Self {
        match report.state {
            BatchState::Cancelled => RunOutcome::Cancelled,
            _ if report.failed > 0 => RunOutcome::SomeFailed,
            _ => RunOutcome::AllSucceeded,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::AllSucceeded => 0,
            RunOutcome::SomeFailed => 1,
            RunOutcome::Cancelled => 130,
        }
    }
}

/// Run the default command: convert every input into a video.
pub async fn run_convert_command(config: Config, opts: ConvertOptions) -> Result<RunOutcome> {
    let queue = build_queue(&config, &opts)?;
    if !queue.is_ready() {
        return Err(StillcastError::NotReady);
    }

    let tools = match preflight(&config, &SystemCommandExecutor::new()) {
        Ok(tools) => tools,
        Err(e) => {
            eprintln!("{}", install_hint());
            return Err(e);
        }
    };
    if let Some(dir) = queue.output_dir() {
        fs::create_dir_all(dir)?;
    }

    let mut orchestrator = BatchOrchestrator::new(&tools);
    let events = orchestrator.events();
    let mut sink: Box<dyn NotificationSink> = if opts.json {
        Box::new(JsonSink::new(std::io::stdout()))
    } else {
        Box::new(TerminalSink::new(opts.quiet, opts.verbose))
    };

    orchestrator.start_batch(&queue)?;

    let mut ticker = tokio::time::interval(Duration::from_millis(defaults::DRAIN_INTERVAL_MS));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if orchestrator.worker_finished() {
                    events.drain_into(sink.as_mut());
                    break;
                }
                if events.drain_into(sink.as_mut()) {
                    break;
                }
            }
            signal = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                match signal {
                    Ok(()) => {
                        if !opts.quiet && !opts.json {
                            eprintln!("\nCancelling...");
                        }
                        orchestrator.cancel_batch();
                    }
                    Err(e) => log::warn!("failed to listen for Ctrl+C: {}", e),
                }
            }
        }
    }

    let report = orchestrator
        .wait()
        .ok_or_else(|| StillcastError::Other("batch worker stopped unexpectedly".to_string()))?;

    if !opts.quiet && !opts.json {
        print_summary(&report);
    }
    Ok(RunOutcome::from_report(&report))
}

/// Build the job queue from the command line, falling back to config values.
pub fn build_queue(config: &Config, opts: &ConvertOptions) -> Result<JobQueue> {
    let mut queue = JobQueue::new();

    let mut files = Vec::new();
    for input in &opts.inputs {
        if input.is_dir() {
            files.extend(audio_files_in(input)?);
        } else {
            if !is_supported_audio(input) {
                log::warn!("{} does not look like a supported audio file", input.display());
            }
            files.push(input.clone());
        }
    }
    let offered = files.len();
    let added = queue.add_audio(&files);
    for (earlier, later) in queue.output_collisions() {
        log::warn!(
            "{} and {} both produce {}; the later one overwrites the earlier",
            earlier.display(),
            later.display(),
            output_path_for(&later, Path::new("")).display()
        );
    }

    if let Some(image) = &opts.image {
        if !is_supported_image(image) {
            log::warn!("{} does not look like a supported image", image.display());
        }
        queue.set_image(image);
    }
    if let Some(dir) = opts.output.as_ref().or(config.output.dir.as_ref()) {
        queue.set_output_dir(dir);
    }
    queue.set_fit_mode(opts.fit.unwrap_or(config.encode.fit));

    if !opts.quiet && !opts.json {
        let skipped = offered - added;
        let fit = queue.fit_mode().display_name();
        if skipped > 0 {
            eprintln!(
                "Queued {} file(s), skipped {} duplicate(s); fit: {}",
                added, skipped, fit
            );
        } else {
            eprintln!("Queued {} file(s); fit: {}", added, fit);
        }
    }

    Ok(queue)
}

/// Supported audio files directly inside `dir`, sorted by name.
fn audio_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_supported_audio(&path) {
            files.push(path);
        }
    }
    files.sort();
    if files.is_empty() {
        log::warn!("no supported audio files in {}", dir.display());
    }
    Ok(files)
}

fn print_summary(report: &BatchReport) {
    let elapsed = Duration::from_millis(report.elapsed.as_millis() as u64);
    let verdict = match report.state {
        BatchState::Cancelled => "Cancelled",
        _ => "Finished",
    };
    eprintln!(
        "{} in {}: {} succeeded, {} failed, {} skipped",
        verdict,
        humantime::format_duration(elapsed),
        report.succeeded,
        report.failed,
        report.skipped
    );
}
