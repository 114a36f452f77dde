//! FFmpeg discovery and capability probing.
//!
//! Recording runs through an FFmpeg subprocess; menu-bar style launches
//! often miss the shell PATH, so discovery also checks the usual Homebrew
//! and MacPorts install locations.

use anyhow::Result;
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, info, warn};

use crate::error::MeetingRecError;

const COMMON_PATHS: &[&str] = &[
    "/usr/local/bin/ffmpeg",
    "/opt/homebrew/bin/ffmpeg",
    "/usr/bin/ffmpeg",
    "/bin/ffmpeg",
    "/opt/local/bin/ffmpeg",
];

/// Locate the FFmpeg executable via PATH, then common install locations.
pub fn find_ffmpeg() -> Option<PathBuf> {
    if let Ok(path) = which::which("ffmpeg") {
        info!("Found FFmpeg via PATH: {:?}", path);
        return Some(path);
    }

    for candidate in COMMON_PATHS {
        let path = PathBuf::from(candidate);
        if path.is_file() {
            info!("Found FFmpeg at: {:?}", path);
            return Some(path);
        }
    }

    warn!("FFmpeg not found in PATH or common locations");
    None
}

/// First line of `ffmpeg -version` output.
pub fn ffmpeg_version(ffmpeg_path: &PathBuf) -> Option<String> {
    let output = Command::new(ffmpeg_path).arg("-version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout.lines().next().map(|line| line.to_string())
}

/// Check that FFmpeg was built with AVFoundation support (required for
/// macOS system-audio capture). FFmpeg exits non-zero when listing devices;
/// only the stderr content matters.
pub fn check_avfoundation_support(ffmpeg_path: &PathBuf) -> bool {
    let output = Command::new(ffmpeg_path)
        .args(["-f", "avfoundation", "-list_devices", "true", "-i", ""])
        .output();

    match output {
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let supported = stderr.contains("AVFoundation");
            if !supported {
                debug!("FFmpeg stderr: {}", &stderr[..stderr.len().min(500)]);
            }
            supported
        }
        Err(e) => {
            warn!("Error checking AVFoundation support: {}", e);
            false
        }
    }
}

pub fn installation_instructions() -> &'static str {
    "FFmpeg is required for system audio recording.\n\
     \n\
     Install via Homebrew:\n\
     \x20   brew install ffmpeg\n\
     \n\
     Or download from: https://ffmpeg.org/download.html\n\
     \n\
     After installation, restart MeetingRec."
}

/// Locate FFmpeg and verify AVFoundation support, or fail with a
/// dependency-category error carrying install instructions.
pub fn verify() -> Result<PathBuf> {
    let path = find_ffmpeg().ok_or_else(|| {
        MeetingRecError::dependency(format!(
            "FFmpeg is not installed or not accessible.\n\n{}",
            installation_instructions()
        ))
    })?;

    if !check_avfoundation_support(&path) {
        return Err(MeetingRecError::dependency(
            "FFmpeg does not support AVFoundation (required for macOS audio capture)",
        )
        .into());
    }

    if let Some(version) = ffmpeg_version(&path) {
        info!("FFmpeg verified and ready: {}", version);
    }

    Ok(path)
}
