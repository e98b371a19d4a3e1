//! Error types for stillcast.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StillcastError {
    // Configuration errors
    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // External tool errors
    #[error("External tool not found: {tool}")]
    ToolNotFound { tool: String },

    #[error("{tool} failed: {message}")]
    ToolFailed { tool: String, message: String },

    // Batch control errors
    #[error("Please select at least one audio file, an image, and an output folder")]
    NotReady,

    #[error("A batch is already running")]
    AlreadyRunning,

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, StillcastError>;
