//! Audio transcription via OpenAI's Whisper API.
//!
//! Wraps the HTTP client with file validation and transcript persistence:
//! results land in the meeting directory as `transcript_<timestamp>.json`
//! with the `{text, segments}` shape the aligner consumes.

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::AiConfig;
use crate::error::OpReport;

mod whisper_api;

pub use whisper_api::WhisperClient;

/// Whisper API upload limit.
const MAX_FILE_SIZE_MB: f64 = 25.0;

/// A time-bounded span of transcribed speech. Times are seconds from the
/// start of the recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Transcript as produced by the API and persisted to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptData {
    pub text: String,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

pub struct TranscriptionService {
    client: Option<WhisperClient>,
    language: String,
}

impl TranscriptionService {
    pub fn new(ai_config: &AiConfig) -> Self {
        let client = if ai_config.openai_api_key.trim().is_empty() {
            warn!("OpenAI API key not set. Transcription will not be available.");
            None
        } else {
            Some(WhisperClient::new(
                ai_config.openai_api_key.clone(),
                ai_config.api_endpoint.clone(),
                ai_config.whisper_model.clone(),
                ai_config.temperature,
            ))
        };

        Self {
            client,
            language: ai_config.language.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Transcribe an audio file and save the transcript next to it.
    ///
    /// Returns a structured report; on success the `transcript_path` detail
    /// points at the written JSON file.
    pub async fn transcribe_audio(&self, audio_path: &Path, output_dir: &Path) -> OpReport {
        let client = match &self.client {
            Some(client) => client,
            None => {
                return OpReport::failure_with_category(
                    crate::error::ErrorCategory::Configuration,
                    "OpenAI API key not configured. Please set your API key in the config.",
                );
            }
        };

        if !audio_path.exists() {
            return OpReport::failure(format!("Audio file not found: {}", audio_path.display()));
        }

        if let Ok(metadata) = std::fs::metadata(audio_path) {
            let size_mb = metadata.len() as f64 / (1024.0 * 1024.0);
            if size_mb > MAX_FILE_SIZE_MB {
                warn!(
                    "Audio file size ({:.1}MB) exceeds the {}MB limit for Whisper API",
                    size_mb, MAX_FILE_SIZE_MB
                );
                return OpReport::failure_with_category(
                    crate::error::ErrorCategory::Transcription,
                    format!(
                        "Audio file too large ({size_mb:.1}MB). Maximum size is {MAX_FILE_SIZE_MB}MB."
                    ),
                );
            }
        }

        info!("Starting transcription of {:?}", audio_path);
        let started = std::time::Instant::now();

        match client.transcribe(audio_path, &self.language).await {
            Ok(transcript) => {
                let output_path = match self.write_transcript(&transcript, output_dir) {
                    Ok(path) => path,
                    Err(e) => return OpReport::from_error(&e),
                };

                let elapsed = started.elapsed().as_secs_f64();
                info!(
                    "Transcription completed in {:.1}s. Saved to {:?}",
                    elapsed, output_path
                );

                OpReport::success("Transcription completed successfully")
                    .with_detail("transcript_path", output_path.display().to_string())
                    .with_detail("duration", elapsed)
                    .with_detail("text", transcript.text.clone())
                    .with_detail("segment_count", transcript.segments.len() as u64)
            }
            Err(e) => {
                warn!("Transcription failed: {:#}", e);
                OpReport::failure_with_category(
                    crate::error::ErrorCategory::Transcription,
                    format!("Transcription failed: {e:#}"),
                )
            }
        }
    }

    fn write_transcript(&self, transcript: &TranscriptData, output_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(output_dir).context("Failed to create output directory")?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let output_path = output_dir.join(format!("transcript_{timestamp}.json"));

        let json =
            serde_json::to_string_pretty(transcript).context("Failed to serialize transcript")?;
        std::fs::write(&output_path, json).context("Failed to write transcript file")?;

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AiConfig;

    #[test]
    fn test_segment_serialization() {
        let segment = Segment {
            start: 0.0,
            end: 5.0,
            text: "hello".to_string(),
        };
        let json = serde_json::to_value(&segment).unwrap();
        assert_eq!(json["start"], 0.0);
        assert_eq!(json["end"], 5.0);
        assert_eq!(json["text"], "hello");
    }

    #[test]
    fn test_transcript_data_without_segments() {
        let data: TranscriptData = serde_json::from_str(r#"{"text": "plain"}"#).unwrap();
        assert_eq!(data.text, "plain");
        assert!(data.segments.is_empty());
    }

    #[test]
    fn test_unconfigured_service() {
        let service = TranscriptionService::new(&AiConfig::default());
        assert!(!service.is_configured());
    }

    #[tokio::test]
    async fn test_transcribe_without_key_reports_configuration_error() {
        let service = TranscriptionService::new(&AiConfig::default());
        let report = service
            .transcribe_audio(Path::new("/tmp/audio.mp3"), Path::new("/tmp"))
            .await;
        assert!(!report.success);
        assert_eq!(
            report.category,
            Some(crate::error::ErrorCategory::Configuration)
        );
    }
}
