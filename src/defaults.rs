//! Default constants for stillcast.
//!
//! The encoder settings here form a fixed invocation template. Changing any of
//! them changes the produced files, so they are not exposed in the config.

/// Encoder binary looked up on `PATH` when no explicit path is configured.
pub const FFMPEG: &str = "ffmpeg";

/// Duration probe binary looked up on `PATH` when no explicit path is configured.
pub const FFPROBE: &str = "ffprobe";

/// Target frame width in pixels.
pub const FRAME_WIDTH: u32 = 1920;

/// Target frame height in pixels.
pub const FRAME_HEIGHT: u32 = 1080;

/// Video codec, tuned for a single still image.
pub const VIDEO_CODEC: &str = "libx264";
pub const VIDEO_TUNE: &str = "stillimage";

pub const AUDIO_CODEC: &str = "aac";
pub const AUDIO_BITRATE: &str = "192k";

/// 4:2:0 keeps the output playable in browsers and on upload sites.
pub const PIXEL_FORMAT: &str = "yuv420p";

/// Extension of every produced file.
pub const OUTPUT_EXTENSION: &str = "mp4";

/// How often the front end drains the event queue, in milliseconds.
pub const DRAIN_INTERVAL_MS: u64 = 100;

/// Audio extensions accepted when expanding a directory argument.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "aac", "ogg"];

/// Image extensions accepted for the cover image.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];
