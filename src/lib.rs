//! stillcast - Turn audio files into still-image videos
//!
//! Pairs each audio file with a cover image and drives ffmpeg one job at a
//! time, reporting per-file and batch progress as it goes.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod batch;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod events;
pub mod exec;
pub mod job;
#[cfg(feature = "cli")]
pub mod output;
pub mod preflight;
pub mod probe;
pub mod progress;
pub mod queue;
pub mod runner;

// Composition root for the command line
#[cfg(feature = "cli")]
pub mod app;

// Core model
pub use job::{FitMode, Job};
pub use queue::{BatchPlan, JobQueue};

// Batch control
pub use batch::{BatchOrchestrator, BatchReport, BatchState};
pub use events::{BatchEvent, CollectorSink, EventReceiver, NotificationSink};
pub use runner::{BatchControl, JobOutcome, JobRunner};

// External tools
pub use exec::{CommandExecutor, SystemCommandExecutor};
pub use preflight::ToolPaths;
pub use probe::DurationProbe;

// Error handling
pub use error::{Result, StillcastError};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }

    #[test]
    fn version_string_has_hash_only_when_built_from_git() {
        let ver = version_string();
        match option_env!("GIT_HASH") {
            Some(hash) if !hash.is_empty() => {
                assert_eq!(ver, format!("{}+{}", env!("CARGO_PKG_VERSION"), hash));
            }
            _ => assert_eq!(ver, env!("CARGO_PKG_VERSION")),
        }
    }
}
