//! Startup checks for the external encoder and probe binaries.
//!
//! A missing tool is fatal before any batch starts.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::defaults;
use crate::error::{Result, StillcastError};
use crate::exec::CommandExecutor;

/// Resolved locations of the encoder and the duration probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl ToolPaths {
    /// Paths from the config, falling back to the bare tool names.
    pub fn from_config(config: &Config) -> Self {
        Self {
            ffmpeg: config
                .tools
                .ffmpeg
                .clone()
                .unwrap_or_else(|| PathBuf::from(defaults::FFMPEG)),
            ffprobe: config
                .tools
                .ffprobe
                .clone()
                .unwrap_or_else(|| PathBuf::from(defaults::FFPROBE)),
        }
    }
}

/// Result of a dependency check.
#[derive(Debug, PartialEq)]
pub enum CheckResult {
    /// Tool resolved and answered `-version`; carries the first line of its banner.
    Ok(String),
    NotFound,
    /// Tool found but `-version` failed.
    Broken(String),
}

/// Find `tool` on `PATH`, or accept it as given when it already contains a directory.
pub fn resolve_tool(tool: &Path) -> Result<PathBuf> {
    if tool.components().count() > 1 {
        return if tool.is_file() {
            Ok(tool.to_path_buf())
        } else {
            Err(StillcastError::ToolNotFound {
                tool: tool.display().to_string(),
            })
        };
    }
    which::which(tool).map_err(|e| {
        log::debug!("which {}: {}", tool.display(), e);
        StillcastError::ToolNotFound {
            tool: tool.display().to_string(),
        }
    })
}

/// Run `tool -version` and report whether it answered.
pub fn check_tool(tool: &Path, executor: &dyn CommandExecutor) -> CheckResult {
    match executor.execute(tool.as_os_str(), &[OsStr::new("-version")]) {
        Ok(stdout) => {
            let banner = stdout.lines().next().unwrap_or_default().trim().to_string();
            CheckResult::Ok(banner)
        }
        Err(StillcastError::ToolNotFound { .. }) => CheckResult::NotFound,
        Err(e) => CheckResult::Broken(e.to_string()),
    }
}

/// Resolve and verify both tools. Fails on the first missing or broken one.
pub fn preflight(config: &Config, executor: &dyn CommandExecutor) -> Result<ToolPaths> {
    let wanted = ToolPaths::from_config(config);
    let ffmpeg = verify(&wanted.ffmpeg, executor)?;
    let ffprobe = verify(&wanted.ffprobe, executor)?;
    Ok(ToolPaths { ffmpeg, ffprobe })
}

fn verify(tool: &Path, executor: &dyn CommandExecutor) -> Result<PathBuf> {
    let resolved = resolve_tool(tool)?;
    match check_tool(&resolved, executor) {
        CheckResult::Ok(banner) => {
            log::info!("using {} ({})", resolved.display(), banner);
            Ok(resolved)
        }
        CheckResult::NotFound => Err(StillcastError::ToolNotFound {
            tool: tool.display().to_string(),
        }),
        CheckResult::Broken(message) => Err(StillcastError::ToolFailed {
            tool: tool.display().to_string(),
            message,
        }),
    }
}

/// Hint printed when a tool is missing.
pub fn install_hint() -> &'static str {
    "Install FFmpeg (it provides both ffmpeg and ffprobe):\n\
     \x20 sudo apt install ffmpeg   (Debian/Ubuntu)\n\
     \x20 sudo pacman -S ffmpeg     (Arch)\n\
     \x20 brew install ffmpeg       (macOS)\n\
     Or point [tools] in the config file at the binaries."
}

/// Run all dependency checks and print results. Returns true when everything is usable.
pub fn check_dependencies(config: &Config, executor: &dyn CommandExecutor) -> bool {
    println!("Checking external tools...\n");

    let tools = ToolPaths::from_config(config);
    let mut all_ok = true;
    let checks = [
        ("ffmpeg (encoder)", &tools.ffmpeg),
        ("ffprobe (duration)", &tools.ffprobe),
    ];
    for (label, tool) in checks {
        print!("{}: ", label);
        let resolved = match resolve_tool(tool) {
            Ok(path) => path,
            Err(_) => {
                println!("✗ NOT FOUND ({})", tool.display());
                all_ok = false;
                continue;
            }
        };
        match check_tool(&resolved, executor) {
            CheckResult::Ok(banner) => println!("✓ OK ({})\n  {}", resolved.display(), banner),
            CheckResult::NotFound => {
                println!("✗ NOT FOUND ({})", resolved.display());
                all_ok = false;
            }
            CheckResult::Broken(msg) => {
                println!("⚠ BROKEN: {}", msg);
                all_ok = false;
            }
        }
    }

    println!();
    if all_ok {
        println!("✓ Ready to convert.");
    } else {
        println!("{}", install_hint());
    }
    all_ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::MockCommandExecutor;

    #[test]
    fn test_tool_paths_default_to_bare_names() {
        let tools = ToolPaths::from_config(&Config::default());
        assert_eq!(tools.ffmpeg, PathBuf::from("ffmpeg"));
        assert_eq!(tools.ffprobe, PathBuf::from("ffprobe"));
    }

    #[test]
    fn test_tool_paths_use_configured_values() {
        let mut config = Config::default();
        config.tools.ffmpeg = Some(PathBuf::from("/opt/ff/ffmpeg"));
        let tools = ToolPaths::from_config(&config);
        assert_eq!(tools.ffmpeg, PathBuf::from("/opt/ff/ffmpeg"));
        assert_eq!(tools.ffprobe, PathBuf::from("ffprobe"));
    }

    #[test]
    fn test_resolve_missing_bare_name() {
        let result = resolve_tool(Path::new("stillcast-no-such-tool-12345"));
        assert!(matches!(result, Err(StillcastError::ToolNotFound { .. })));
    }

    #[test]
    fn test_resolve_missing_explicit_path() {
        let result = resolve_tool(Path::new("/nonexistent/stillcast/ffmpeg"));
        match result {
            Err(StillcastError::ToolNotFound { tool }) => {
                assert_eq!(tool, "/nonexistent/stillcast/ffmpeg")
            }
            other => panic!("expected ToolNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_existing_explicit_path() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(resolve_tool(file.path()).unwrap(), file.path());
    }

    #[test]
    fn test_check_tool_reports_banner() {
        let mock = MockCommandExecutor::new()
            .with_response("ffmpeg version 6.1.1 Copyright (c) 2000-2023\nbuilt with gcc\n");
        assert_eq!(
            check_tool(Path::new("ffmpeg"), &mock),
            CheckResult::Ok("ffmpeg version 6.1.1 Copyright (c) 2000-2023".to_string())
        );
        assert_eq!(mock.calls()[0].1, vec!["-version"]);
    }

    #[test]
    fn test_check_tool_maps_errors() {
        let mock = MockCommandExecutor::new()
            .with_error(StillcastError::ToolNotFound {
                tool: "ffprobe".to_string(),
            })
            .with_error(StillcastError::ToolFailed {
                tool: "ffprobe".to_string(),
                message: "exited with 1".to_string(),
            });
        assert_eq!(check_tool(Path::new("ffprobe"), &mock), CheckResult::NotFound);
        assert!(matches!(
            check_tool(Path::new("ffprobe"), &mock),
            CheckResult::Broken(msg) if msg.contains("exited with 1")
        ));
    }

    #[test]
    fn test_preflight_fails_on_missing_encoder() {
        let mut config = Config::default();
        config.tools.ffmpeg = Some(PathBuf::from("/nonexistent/stillcast/ffmpeg"));
        let mock = MockCommandExecutor::new();

        let result = preflight(&config, &mock);

        assert!(matches!(result, Err(StillcastError::ToolNotFound { .. })));
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn test_preflight_verifies_both_tools() {
        let ffmpeg = tempfile::NamedTempFile::new().unwrap();
        let ffprobe = tempfile::NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.tools.ffmpeg = Some(ffmpeg.path().to_path_buf());
        config.tools.ffprobe = Some(ffprobe.path().to_path_buf());
        let mock = MockCommandExecutor::new()
            .with_response("ffmpeg version 7.0")
            .with_response("ffprobe version 7.0");

        let tools = preflight(&config, &mock).unwrap();

        assert_eq!(tools.ffmpeg, ffmpeg.path());
        assert_eq!(tools.ffprobe, ffprobe.path());
        assert_eq!(mock.call_count(), 2);
    }

    #[test]
    fn test_preflight_rejects_broken_probe() {
        let ffmpeg = tempfile::NamedTempFile::new().unwrap();
        let ffprobe = tempfile::NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.tools.ffmpeg = Some(ffmpeg.path().to_path_buf());
        config.tools.ffprobe = Some(ffprobe.path().to_path_buf());
        let mock = MockCommandExecutor::new()
            .with_response("ffmpeg version 7.0")
            .with_error(StillcastError::ToolFailed {
                tool: "ffprobe".to_string(),
                message: "segfault".to_string(),
            });

        let result = preflight(&config, &mock);

        assert!(matches!(result, Err(StillcastError::ToolFailed { .. })));
    }

    #[test]
    fn test_install_hint_mentions_config() {
        assert!(install_hint().contains("[tools]"));
    }
}
