//! Job queue model: the audio files, cover image, and output directory that
//! make up one batch.
//!
//! Pure data. Nothing here touches the file system beyond turning relative
//! paths into absolute ones.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

use crate::defaults;
use crate::error::{Result, StillcastError};
use crate::job::{FitMode, Job, output_path_for};

/// User selection for a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobQueue {
    audio: Vec<PathBuf>,
    image: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    fit_mode: FitMode,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append audio files, skipping any path already queued.
    ///
    /// Paths are compared after conversion to normalized absolute form, so
    /// `a.mp3` and `./a.mp3` count as the same file. Returns how many were added.
    pub fn add_audio<I, P>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut seen: HashSet<PathBuf> = self.audio.iter().cloned().collect();
        let mut added = 0;
        for path in paths {
            let path = normalize_path(path.as_ref());
            if seen.insert(path.clone()) {
                self.audio.push(path);
                added += 1;
            }
        }
        added
    }

    /// Remove queued audio files matching any of `paths`. Returns how many were removed.
    pub fn remove_audio<I, P>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let doomed: HashSet<PathBuf> = paths
            .into_iter()
            .map(|p| normalize_path(p.as_ref()))
            .collect();
        let before = self.audio.len();
        self.audio.retain(|p| !doomed.contains(p));
        before - self.audio.len()
    }

    /// Drop every queued audio file. Image, output directory and fit mode stay.
    pub fn clear(&mut self) {
        self.audio.clear();
    }

    pub fn set_image(&mut self, path: impl AsRef<Path>) {
        self.image = Some(normalize_path(path.as_ref()));
    }

    pub fn set_output_dir(&mut self, path: impl AsRef<Path>) {
        self.output_dir = Some(normalize_path(path.as_ref()));
    }

    pub fn set_fit_mode(&mut self, mode: FitMode) {
        self.fit_mode = mode;
    }

    pub fn audio_files(&self) -> &[PathBuf] {
        &self.audio
    }

    pub fn image(&self) -> Option<&Path> {
        self.image.as_deref()
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    pub fn fit_mode(&self) -> FitMode {
        self.fit_mode
    }

    pub fn len(&self) -> usize {
        self.audio.len()
    }

    pub fn is_empty(&self) -> bool {
        self.audio.is_empty()
    }

    /// A batch may start only with audio, an image, and an output directory.
    pub fn is_ready(&self) -> bool {
        !self.audio.is_empty() && self.image.is_some() && self.output_dir.is_some()
    }

    /// Queued files whose videos would land on the same output path, as
    /// `(earlier, later)` pairs. The later encode overwrites the earlier one.
    pub fn output_collisions(&self) -> Vec<(PathBuf, PathBuf)> {
        let mut first: HashMap<PathBuf, &PathBuf> = HashMap::new();
        let mut collisions = Vec::new();
        for audio in &self.audio {
            match first.entry(output_path_for(audio, Path::new(""))) {
                Entry::Occupied(e) => collisions.push(((*e.get()).clone(), audio.clone())),
                Entry::Vacant(e) => {
                    e.insert(audio);
                }
            }
        }
        collisions
    }

    /// Freeze the current selection into the jobs of one batch.
    pub fn snapshot(&self) -> Result<BatchPlan> {
        let (Some(image), Some(output_dir)) = (&self.image, &self.output_dir) else {
            return Err(StillcastError::NotReady);
        };
        if self.audio.is_empty() {
            return Err(StillcastError::NotReady);
        }

        let jobs = self
            .audio
            .iter()
            .map(|audio| Job::new(audio.clone(), image.clone(), output_dir))
            .collect();

        Ok(BatchPlan {
            jobs,
            output_dir: output_dir.clone(),
            fit_mode: self.fit_mode,
        })
    }
}

/// Immutable description of one batch, taken from a `JobQueue` at start time.
/// Later edits to the queue do not affect a running batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPlan {
    pub jobs: Vec<Job>,
    pub output_dir: PathBuf,
    pub fit_mode: FitMode,
}

/// Whether `path` has one of the audio extensions offered for selection.
pub fn is_supported_audio(path: &Path) -> bool {
    has_extension(path, defaults::AUDIO_EXTENSIONS)
}

/// Whether `path` has one of the image extensions offered for selection.
pub fn is_supported_image(path: &Path) -> bool {
    has_extension(path, defaults::IMAGE_EXTENSIONS)
}

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            allowed.iter().any(|a| *a == e)
        })
        .unwrap_or(false)
}

/// Absolute path with `.` and `..` resolved lexically. Symlinks are left alone.
fn normalize_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
