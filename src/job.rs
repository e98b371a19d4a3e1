//! Conversion job definition and the encoder argument template.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::defaults;

/// How the cover image is fitted into the 1920x1080 frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Scale down to fit, then letterbox. Keeps the whole image.
    #[default]
    Pad,
    /// Scale up to cover, then center-crop. Fills the frame.
    Crop,
}

impl FitMode {
    /// The `-vf` filter chain for this mode.
    pub fn video_filter(&self) -> String {
        let (w, h) = (defaults::FRAME_WIDTH, defaults::FRAME_HEIGHT);
        match self {
            FitMode::Pad => format!(
                "scale=w={w}:h={h}:force_original_aspect_ratio=decrease,\
                 pad=w={w}:h={h}:x=(ow-iw)/2:y=(oh-ih)/2"
            ),
            FitMode::Crop => format!(
                "scale=w={w}:h={h}:force_original_aspect_ratio=increase,crop=w={w}:h={h}"
            ),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            FitMode::Pad => "Pad (adds black bars)",
            FitMode::Crop => "Crop (fills the frame)",
        }
    }

    pub fn all() -> &'static [FitMode] {
        &[FitMode::Pad, FitMode::Crop]
    }
}

impl fmt::Display for FitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitMode::Pad => write!(f, "pad"),
            FitMode::Crop => write!(f, "crop"),
        }
    }
}

impl FromStr for FitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pad" => Ok(FitMode::Pad),
            "crop" => Ok(FitMode::Crop),
            other => Err(format!("unknown fit mode '{other}' (expected pad or crop)")),
        }
    }
}

/// One audio file to be turned into a video. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub input_audio: PathBuf,
    pub cover_image: PathBuf,
    pub output_path: PathBuf,
    /// Playback duration in seconds, `None` when the probe could not tell.
    pub duration_seconds: Option<f64>,
}

impl Job {
    /// Build a job whose output lands in `output_dir` under the audio file's stem.
    pub fn new(input_audio: PathBuf, cover_image: PathBuf, output_dir: &Path) -> Self {
        let output_path = output_path_for(&input_audio, output_dir);
        Self {
            input_audio,
            cover_image,
            output_path,
            duration_seconds: None,
        }
    }

    /// Same job with a probed duration attached.
    pub fn with_duration(self, duration_seconds: Option<f64>) -> Self {
        Self {
            duration_seconds,
            ..self
        }
    }

    pub fn input_filename(&self) -> String {
        file_name_of(&self.input_audio)
    }

    pub fn output_filename(&self) -> String {
        file_name_of(&self.output_path)
    }

    /// Encoder arguments for this job, in the fixed template order.
    pub fn encoder_args(&self, fit: FitMode) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::with_capacity(22);
        args.push("-y".into());
        args.push("-i".into());
        args.push(self.input_audio.clone().into_os_string());
        args.extend(["-loop", "1", "-i"].map(OsString::from));
        args.push(self.cover_image.clone().into_os_string());
        args.extend(
            [
                "-c:v",
                defaults::VIDEO_CODEC,
                "-tune",
                defaults::VIDEO_TUNE,
                "-c:a",
                defaults::AUDIO_CODEC,
                "-b:a",
                defaults::AUDIO_BITRATE,
                "-pix_fmt",
                defaults::PIXEL_FORMAT,
                "-shortest",
                "-vf",
            ]
            .map(OsString::from),
        );
        args.push(fit.video_filter().into());
        args.push(self.output_path.clone().into_os_string());
        args
    }
}

/// `<output_dir>/<audio stem>.mp4`
pub fn output_path_for(input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    output_dir.join(format!("{}.{}", stem, defaults::OUTPUT_EXTENSION))
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}
