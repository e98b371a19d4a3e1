//! Stand-in `ffmpeg` and `ffprobe` scripts for driving real subprocesses.
//!
//! The fake encoder decides what to do from the input audio's file name:
//! names containing `bad` fail, names containing `slow` print one progress
//! line and then block, names containing `loud` flood both pipes with 2000
//! lines each before finishing normally, and everything else reports 50 % and
//! 100 % of a 10 s file and writes the output. The fake probe answers `10.0`
//! unless the name contains `nodur`; `slowprobe` makes it take 2 s first.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use stillcast::{BatchEvent, EventReceiver, ToolPaths};
use tempfile::TempDir;

const FAKE_FFMPEG: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then
  echo "ffmpeg version 0.0-fake"
  exit 0
fi
in="$3"
for out; do :; done
echo "Input #0, from '$in':"
case "${in##*/}" in
  *bad*)
    echo "$in: Invalid data found when processing input" >&2
    exit 1
    ;;
  *slow*)
    echo "frame=    1 fps=0.0 q=0.0 size=       0kB time=00:00:01.00 bitrate=N/A" >&2
    exec sleep 30
    ;;
  *loud*)
    i=0
    while [ "$i" -lt 2000 ]; do
      echo "loud stdout $i: Stream mapping and codec chatter padded to a hundred bytes or so"
      echo "loud stderr $i: Stream mapping and codec chatter padded to a hundred bytes or so" >&2
      i=$((i + 1))
    done
    ;;
esac
printf 'frame=   10 fps=0.0 q=28.0 size=     256kB time=00:00:05.00 bitrate= 419.4kbits/s\r' >&2
printf 'frame=   20 fps=0.0 q=28.0 size=     512kB time=00:00:10.00 bitrate= 419.4kbits/s\r' >&2
echo "video:512kB audio:160kB" >&2
: > "$out"
exit 0
"#;

const FAKE_FFPROBE: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then
  echo "ffprobe version 0.0-fake"
  exit 0
fi
for path; do :; done
case "${path##*/}" in
  *nodur*)
    echo "$path: Invalid data found when processing input" >&2
    exit 1
    ;;
  *slowprobe*)
    sleep 2
    ;;
esac
echo "10.000000"
"#;

/// Scratch directory holding the fake tools and an output folder.
pub struct Sandbox {
    pub dir: TempDir,
    pub tools: ToolPaths,
    pub output: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = write_script(dir.path(), "ffmpeg", FAKE_FFMPEG);
        let ffprobe = write_script(dir.path(), "ffprobe", FAKE_FFPROBE);
        let output = dir.path().join("out");
        fs::create_dir(&output).unwrap();
        Self {
            dir,
            tools: ToolPaths { ffmpeg, ffprobe },
            output,
        }
    }

    /// Empty audio files in the sandbox. Only their names matter to the fakes.
    pub fn audio(&self, names: &[&str]) -> Vec<PathBuf> {
        names
            .iter()
            .map(|name| {
                let path = self.dir.path().join(name);
                fs::write(&path, b"").unwrap();
                path
            })
            .collect()
    }

    pub fn image(&self) -> PathBuf {
        let path = self.dir.path().join("cover.png");
        fs::write(&path, b"").unwrap();
        path
    }
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Receive events until `pred` matches one, returning everything seen so far.
pub fn wait_for(
    events: &EventReceiver,
    timeout: Duration,
    mut pred: impl FnMut(&BatchEvent) -> bool,
) -> Vec<BatchEvent> {
    let deadline = Instant::now() + timeout;
    let mut seen = Vec::new();
    while Instant::now() < deadline {
        if let Some(event) = events.recv_timeout(Duration::from_millis(50)) {
            let done = pred(&event);
            seen.push(event);
            if done {
                return seen;
            }
        }
    }
    panic!("timed out waiting for event; saw {:?}", seen);
}

pub fn batch_progress(events: &[BatchEvent]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            BatchEvent::BatchProgress { percent } => Some(*percent),
            _ => None,
        })
        .collect()
}

pub fn file_progress(events: &[BatchEvent]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            BatchEvent::FileProgress { percent } => Some(*percent),
            _ => None,
        })
        .collect()
}

pub fn log_lines(events: &[BatchEvent]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|e| match e {
            BatchEvent::LogLine { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}
