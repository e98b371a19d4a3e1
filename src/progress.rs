//! Encoder progress parsing.
//!
//! ffmpeg reports elapsed output time on its diagnostic stream in lines such as
//! `frame=  10 fps=0.0 q=-1.0 size=256kB time=00:01:05.50 bitrate=...`.
//! Only the `time=` field is used.

use regex::Regex;
use std::sync::LazyLock;

static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    // SAFETY: hardcoded pattern, always valid
    #[allow(clippy::expect_used)]
    let re = Regex::new(r"time=(\d{2}):(\d{2}):(\d{2})\.(\d{2})").expect("hardcoded time pattern");
    re
});

/// Elapsed encoder time, as printed after `time=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSample {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub centiseconds: u32,
}

impl ProgressSample {
    pub fn elapsed_seconds(&self) -> f64 {
        f64::from(self.hours) * 3600.0
            + f64::from(self.minutes) * 60.0
            + f64::from(self.seconds)
            + f64::from(self.centiseconds) / 100.0
    }

    /// Share of `total_seconds` reached, in percent. Not clamped: encoders can
    /// overshoot the probed duration slightly because of container padding.
    pub fn to_percentage(&self, total_seconds: f64) -> f64 {
        if total_seconds <= 0.0 || !total_seconds.is_finite() {
            return 0.0;
        }
        self.elapsed_seconds() * 100.0 / total_seconds
    }
}

/// Extract the first `time=HH:MM:SS.CC` field from a diagnostic line.
pub fn parse_progress_line(line: &str) -> Option<ProgressSample> {
    let caps = TIME_RE.captures(line)?;
    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
    Some(ProgressSample {
        hours: field(1)?,
        minutes: field(2)?,
        seconds: field(3)?,
        centiseconds: field(4)?,
    })
}

/// Clamp a percentage into `[0, 100]`. NaN counts as no progress.
pub fn clamp_percent(percent: f64) -> f64 {
    if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    }
}

/// Tracks per-file progress for one job so reported values never go backwards.
#[derive(Debug, Clone)]
pub struct FileProgress {
    total_seconds: Option<f64>,
    last: f64,
}

impl FileProgress {
    pub fn new(total_seconds: Option<f64>) -> Self {
        Self {
            total_seconds,
            last: 0.0,
        }
    }

    /// Feed one diagnostic line. Returns a new percentage when the line carries
    /// a timestamp, the duration is known, and progress moved forward.
    pub fn observe(&mut self, line: &str) -> Option<f64> {
        let total = self.total_seconds?;
        let sample = parse_progress_line(line)?;
        let percent = clamp_percent(sample.to_percentage(total));
        if percent > self.last {
            self.last = percent;
            Some(percent)
        } else {
            None
        }
    }

    pub fn last(&self) -> f64 {
        self.last
    }
}
