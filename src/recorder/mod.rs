//! System audio recording via an FFmpeg subprocess.
//!
//! One recording at a time. Starting creates the per-meeting directory and
//! spawns FFmpeg against the avfoundation system-audio device; stopping sends
//! FFmpeg its `q` command and falls back to killing the process after a
//! bounded wait.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tracing::{error, info, warn};

use crate::config::AudioConfig;
use crate::error::MeetingRecError;

pub mod ffmpeg;

/// Grace period after spawn before the process is considered alive.
const STARTUP_GRACE: Duration = Duration::from_secs(1);
/// How long to wait for FFmpeg to finalize the file after `q`.
const STOP_TIMEOUT: Duration = Duration::from_secs(10);
/// How long to wait after a forced kill.
const KILL_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
    Stopping,
    Error,
}

#[derive(Debug, Clone)]
pub struct RecordingSession {
    pub session_id: String,
    pub start_time: DateTime<Local>,
    pub meeting_path: PathBuf,
    pub output_path: PathBuf,
    pub state: RecordingState,
}

/// Result of a successfully started recording.
#[derive(Debug, Clone)]
pub struct StartedRecording {
    pub meeting_path: PathBuf,
    pub audio_path: PathBuf,
    pub started_at: DateTime<Local>,
}

/// Result of a successfully stopped recording.
#[derive(Debug, Clone)]
pub struct StoppedRecording {
    pub meeting_path: PathBuf,
    pub audio_path: PathBuf,
    pub duration_seconds: f64,
    pub file_size: u64,
}

pub struct SystemAudioRecorder {
    audio: AudioConfig,
    output_dir: PathBuf,
    ffmpeg_path: PathBuf,
    process: Option<Child>,
    session: Option<RecordingSession>,
}

impl SystemAudioRecorder {
    /// Create a recorder, verifying FFmpeg availability up front.
    pub fn new(audio: AudioConfig, output_dir: PathBuf) -> Result<Self> {
        let ffmpeg_path = ffmpeg::verify()?;
        info!("SystemAudioRecorder initialized");

        Ok(Self {
            audio,
            output_dir,
            ffmpeg_path,
            process: None,
            session: None,
        })
    }

    pub fn is_recording(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.state == RecordingState::Recording)
    }

    pub fn current_session(&self) -> Option<&RecordingSession> {
        self.session.as_ref()
    }

    fn codec(&self) -> &'static str {
        match self.audio.format.as_str() {
            "wav" => "pcm_s16le",
            "m4a" => "aac",
            _ => "libmp3lame",
        }
    }

    fn channel_count(&self) -> u32 {
        if self.audio.channel.eq_ignore_ascii_case("stereo") {
            2
        } else {
            1
        }
    }

    /// FFmpeg arguments for capturing system audio to `output_path`.
    pub fn build_ffmpeg_args(&self, output_path: &Path) -> Vec<String> {
        let codec = self.codec();

        let mut args = vec![
            "-f".to_string(),
            "avfoundation".to_string(),
            "-i".to_string(),
            format!(":{}", self.audio.device_index),
            "-acodec".to_string(),
            codec.to_string(),
            "-ar".to_string(),
            self.audio.sample_rate.to_string(),
            "-ac".to_string(),
            self.channel_count().to_string(),
        ];

        if matches!(codec, "libmp3lame" | "aac") {
            args.push("-ab".to_string());
            args.push(self.audio.bitrate.clone());
        }
        if codec == "libmp3lame" {
            args.push("-q:a".to_string());
            args.push("2".to_string());
        }

        args.push("-y".to_string());
        args.push(output_path.display().to_string());
        args
    }

    fn create_meeting_directory(&self, now: DateTime<Local>) -> Result<PathBuf> {
        let meeting_dir = self
            .output_dir
            .join(format!("{}-meeting", now.format("%Y-%m-%d-%H-%M")));

        std::fs::create_dir_all(meeting_dir.join("screenshots")).map_err(|e| {
            MeetingRecError::filesystem(format!(
                "Failed to create meeting directory {}: {e}",
                meeting_dir.display()
            ))
        })?;

        Ok(meeting_dir)
    }

    /// Start a system audio recording.
    pub async fn start_recording(&mut self) -> Result<StartedRecording> {
        if self.is_recording() {
            return Err(MeetingRecError::recording("Recording already in progress").into());
        }

        let now = Local::now();
        let meeting_path = self.create_meeting_directory(now)?;
        let output_path = meeting_path.join(format!("meeting_audio.{}", self.audio.format));

        let args = self.build_ffmpeg_args(&output_path);
        info!(
            "Starting FFmpeg: {} {}",
            self.ffmpeg_path.display(),
            args.join(" ")
        );

        let mut child = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .context("Failed to spawn FFmpeg")?;

        // Give FFmpeg a moment, then make sure it didn't exit immediately
        // (bad device index, permission denial, ...).
        tokio::time::sleep(STARTUP_GRACE).await;
        if let Some(status) = child.try_wait().context("Failed to poll FFmpeg")? {
            let output = child
                .wait_with_output()
                .await
                .context("Failed to collect FFmpeg output")?;
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("FFmpeg failed to start ({}): {}", status, stderr);
            return Err(MeetingRecError::recording(format!(
                "FFmpeg failed to start: {}",
                stderr.trim()
            ))
            .into());
        }

        let session = RecordingSession {
            session_id: now.format("%Y%m%d_%H%M%S").to_string(),
            start_time: now,
            meeting_path: meeting_path.clone(),
            output_path: output_path.clone(),
            state: RecordingState::Recording,
        };

        write_meeting_info(
            &meeting_path,
            &format!(
                "Recording started at: {}\nAudio format: {}\nSample rate: {}\nChannels: {}\n",
                now.format("%Y-%m-%dT%H:%M:%S"),
                self.audio.format,
                self.audio.sample_rate,
                self.channel_count(),
            ),
            false,
        )?;

        self.process = Some(child);
        self.session = Some(session);

        info!("Recording started: {:?}", output_path);

        Ok(StartedRecording {
            meeting_path,
            audio_path: output_path,
            started_at: now,
        })
    }

    /// Stop the recording: ask FFmpeg to quit, kill it if it doesn't, and
    /// verify the output file landed on disk.
    pub async fn stop_recording(&mut self) -> Result<StoppedRecording> {
        let mut session = match self.session.take() {
            Some(s) if s.state == RecordingState::Recording => s,
            other => {
                self.session = other;
                return Err(MeetingRecError::recording("No recording in progress").into());
            }
        };
        let mut child = match self.process.take() {
            Some(child) => child,
            None => {
                return Err(MeetingRecError::recording("No recording in progress").into());
            }
        };

        session.state = RecordingState::Stopping;
        info!("Stopping FFmpeg recording...");

        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(b"q").await;
            let _ = stdin.flush().await;
            // Dropping stdin closes the pipe.
        }

        match tokio::time::timeout(STOP_TIMEOUT, child.wait()).await {
            Ok(status) => {
                status.context("Failed to wait for FFmpeg")?;
            }
            Err(_) => {
                warn!("FFmpeg did not respond to quit command, terminating...");
                child.start_kill().context("Failed to kill FFmpeg")?;
                let _ = tokio::time::timeout(KILL_TIMEOUT, child.wait()).await;
            }
        }

        let end_time = Local::now();
        let duration = (end_time - session.start_time)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        if !session.output_path.exists() {
            error!("Recording file was not created");
            return Err(MeetingRecError::recording("Recording file was not created").into());
        }
        let file_size = std::fs::metadata(&session.output_path)
            .map(|m| m.len())
            .unwrap_or(0);

        info!(
            "Recording saved: {:?} ({} bytes, {:.1}s)",
            session.output_path, file_size, duration
        );

        write_meeting_info(
            &session.meeting_path,
            &format!(
                "Recording stopped at: {}\nDuration: {duration:.2} seconds\nFile size: {file_size} bytes\n",
                end_time.format("%Y-%m-%dT%H:%M:%S"),
            ),
            true,
        )?;

        Ok(StoppedRecording {
            meeting_path: session.meeting_path,
            audio_path: session.output_path,
            duration_seconds: duration,
            file_size,
        })
    }

    /// Kill any in-flight FFmpeg process. Called on application exit.
    pub async fn cleanup_on_exit(&mut self) -> bool {
        if let Some(mut child) = self.process.take() {
            info!("Cleanup: terminating FFmpeg process...");
            if let Err(e) = child.start_kill() {
                error!("Error during cleanup: {}", e);
                return false;
            }
            let _ = tokio::time::timeout(KILL_TIMEOUT, child.wait()).await;
            self.session = None;
        }
        true
    }
}

fn write_meeting_info(meeting_path: &Path, content: &str, append: bool) -> Result<()> {
    use std::io::Write;

    let path = meeting_path.join("meeting_info.txt");
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(append)
        .write(!append)
        .truncate(!append)
        .open(&path)
        .context("Failed to open meeting info file")?;
    file.write_all(content.as_bytes())
        .context("Failed to write meeting info file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder_with(format: &str, channel: &str) -> SystemAudioRecorder {
        SystemAudioRecorder {
            audio: AudioConfig {
                format: format.to_string(),
                channel: channel.to_string(),
                ..Default::default()
            },
            output_dir: PathBuf::from("/tmp/meetings"),
            ffmpeg_path: PathBuf::from("/usr/local/bin/ffmpeg"),
            process: None,
            session: None,
        }
    }

    #[test]
    fn test_mp3_command_includes_bitrate_and_quality() {
        let recorder = recorder_with("mp3", "stereo");
        let args = recorder.build_ffmpeg_args(Path::new("/tmp/out.mp3"));

        let joined = args.join(" ");
        assert!(joined.starts_with("-f avfoundation -i :1 -acodec libmp3lame"));
        assert!(joined.contains("-ar 44100 -ac 2"));
        assert!(joined.contains("-ab 128k"));
        assert!(joined.contains("-q:a 2"));
        assert!(joined.ends_with("-y /tmp/out.mp3"));
    }

    #[test]
    fn test_wav_command_skips_bitrate() {
        let recorder = recorder_with("wav", "mono");
        let args = recorder.build_ffmpeg_args(Path::new("/tmp/out.wav"));

        let joined = args.join(" ");
        assert!(joined.contains("-acodec pcm_s16le"));
        assert!(joined.contains("-ac 1"));
        assert!(!joined.contains("-ab"));
        assert!(!joined.contains("-q:a"));
    }

    #[test]
    fn test_m4a_uses_aac_with_bitrate() {
        let recorder = recorder_with("m4a", "stereo");
        let args = recorder.build_ffmpeg_args(Path::new("/tmp/out.m4a"));
        let joined = args.join(" ");
        assert!(joined.contains("-acodec aac"));
        assert!(joined.contains("-ab 128k"));
    }

    #[test]
    fn test_unknown_format_defaults_to_mp3_codec() {
        let recorder = recorder_with("ogg", "stereo");
        let args = recorder.build_ffmpeg_args(Path::new("/tmp/out.ogg"));
        assert!(args.join(" ").contains("libmp3lame"));
    }

    #[test]
    fn test_not_recording_initially() {
        let recorder = recorder_with("mp3", "stereo");
        assert!(!recorder.is_recording());
        assert!(recorder.current_session().is_none());
    }

    #[tokio::test]
    async fn test_stop_without_start_errors() {
        let mut recorder = recorder_with("mp3", "stereo");
        let err = recorder.stop_recording().await.unwrap_err();
        assert!(err.to_string().contains("No recording in progress"));
    }

    #[test]
    fn test_meeting_info_write_and_append() {
        let dir = tempfile::tempdir().unwrap();
        write_meeting_info(dir.path(), "Recording started at: 2025-05-21T10:00:00\n", false)
            .unwrap();
        write_meeting_info(dir.path(), "Duration: 12.00 seconds\n", true).unwrap();

        let content = std::fs::read_to_string(dir.path().join("meeting_info.txt")).unwrap();
        assert!(content.contains("Recording started at: 2025-05-21T10:00:00"));
        assert!(content.contains("Duration: 12.00 seconds"));
    }
}
