//! Duration probing with ffprobe.
//!
//! A missing duration only disables percentage progress for that file, so
//! every failure here is logged and reported as `None`.

use crate::exec::CommandExecutor;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Arguments asking ffprobe for the container duration as a bare number.
const PROBE_ARGS: [&str; 6] = [
    "-v",
    "error",
    "-show_entries",
    "format=duration",
    "-of",
    "default=noprint_wrappers=1:nokey=1",
];

/// Looks up playback durations via an external inspection tool.
#[derive(Clone)]
pub struct DurationProbe {
    ffprobe: PathBuf,
    executor: Arc<dyn CommandExecutor>,
}

impl DurationProbe {
    pub fn new(ffprobe: impl Into<PathBuf>, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
            executor,
        }
    }

    /// Duration of `audio` in seconds, or `None` when it cannot be determined.
    pub fn probe_duration(&self, audio: &Path) -> Option<f64> {
        let mut args: Vec<&OsStr> = PROBE_ARGS.iter().map(OsStr::new).collect();
        args.push(audio.as_os_str());

        let stdout = match self.executor.execute(self.ffprobe.as_os_str(), &args) {
            Ok(out) => out,
            Err(e) => {
                log::warn!("Could not get duration for {}: {}", audio.display(), e);
                return None;
            }
        };

        let duration = parse_duration(&stdout);
        if duration.is_none() {
            log::warn!(
                "Could not get duration for {}: unexpected output {:?}",
                audio.display(),
                stdout.trim()
            );
        }
        duration
    }
}

/// Parse ffprobe's bare duration output. Only finite, positive values count.
fn parse_duration(stdout: &str) -> Option<f64> {
    stdout
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d > 0.0)
}
