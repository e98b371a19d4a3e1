use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, StillcastError};
use crate::job::FitMode;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub encode: EncodeConfig,
    pub output: OutputConfig,
}

/// Locations of the external binaries. `None` means look them up on `PATH`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ToolsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ffmpeg: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ffprobe: Option<PathBuf>,
}

/// Encoding configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct EncodeConfig {
    pub fit: FitMode,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct OutputConfig {
    /// Used when no `--output` is given on the command line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file is unreadable or contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(StillcastError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - STILLCAST_FFMPEG → tools.ffmpeg
    /// - STILLCAST_FFPROBE → tools.ffprobe
    /// - STILLCAST_OUTPUT_DIR → output.dir
    /// - STILLCAST_FIT → encode.fit (`pad` or `crop`)
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(ffmpeg) = std::env::var("STILLCAST_FFMPEG")
            && !ffmpeg.is_empty()
        {
            self.tools.ffmpeg = Some(PathBuf::from(ffmpeg));
        }

        if let Ok(ffprobe) = std::env::var("STILLCAST_FFPROBE")
            && !ffprobe.is_empty()
        {
            self.tools.ffprobe = Some(PathBuf::from(ffprobe));
        }

        if let Ok(dir) = std::env::var("STILLCAST_OUTPUT_DIR")
            && !dir.is_empty()
        {
            self.output.dir = Some(PathBuf::from(dir));
        }

        if let Ok(fit) = std::env::var("STILLCAST_FIT")
            && !fit.is_empty()
        {
            self.encode.fit = fit.parse::<FitMode>().map_err(|message| {
                StillcastError::ConfigInvalidValue {
                    key: "STILLCAST_FIT".to_string(),
                    message,
                }
            })?;
        }

        Ok(self)
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/stillcast/config.toml on Linux
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().ok_or_else(|| {
            StillcastError::Other("Could not determine config directory".to_string())
        })?;
        Ok(dir.join("stillcast").join("config.toml"))
    }

    /// Render as TOML, e.g. for `stillcast config show`.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| StillcastError::ConfigParse {
            message: e.to_string(),
        })
    }
}
