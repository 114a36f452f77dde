//! OpenAI Whisper API client.
//!
//! Uploads audio as multipart form data and requests `verbose_json` so the
//! response carries time-coded segments for alignment.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, error, info};

use super::{Segment, TranscriptData};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/audio/transcriptions";

#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    text: String,
    #[serde(default)]
    segments: Vec<VerboseSegment>,
}

#[derive(Debug, Deserialize)]
struct VerboseSegment {
    start: f64,
    end: f64,
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize, Serialize)]
struct ErrorDetail {
    message: String,
    r#type: Option<String>,
    code: Option<String>,
}

pub struct WhisperClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl WhisperClient {
    pub fn new(
        api_key: String,
        endpoint: Option<String>,
        model: String,
        temperature: f32,
    ) -> Self {
        let endpoint = endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        info!("Initialized Whisper client with endpoint: {}", endpoint);

        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            model,
            temperature,
        }
    }

    /// Transcribe an audio file, returning text plus time-coded segments.
    pub async fn transcribe(&self, audio_path: &Path, language: &str) -> Result<TranscriptData> {
        info!("Transcribing audio file via Whisper API: {:?}", audio_path);

        let bytes = tokio::fs::read(audio_path)
            .await
            .context("Failed to read audio file")?;

        let filename = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());

        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename);
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .text("temperature", self.temperature.to_string())
            .text("language", language.to_string());

        debug!("Sending request to Whisper API (model: {})", self.model);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .context("Failed to send request to Whisper API")?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            error!(
                "Whisper API request failed with status {}: {}",
                status, response_text
            );

            if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&response_text) {
                return Err(anyhow::anyhow!(
                    "Whisper API error: {} (type: {:?}, code: {:?})",
                    error_response.error.message,
                    error_response.error.r#type,
                    error_response.error.code
                ));
            }

            return Err(anyhow::anyhow!(
                "Whisper API request failed with status {}: {}",
                status,
                response_text
            ));
        }

        let parsed: VerboseTranscription = serde_json::from_str(&response_text)
            .context("Failed to parse transcription response")?;

        let segments: Vec<Segment> = parsed
            .segments
            .into_iter()
            .map(|s| Segment {
                start: s.start,
                end: s.end,
                text: s.text,
            })
            .collect();

        info!(
            "Transcription complete: {} chars, {} segments",
            parsed.text.len(),
            segments.len()
        );

        Ok(TranscriptData {
            text: parsed.text.trim().to_string(),
            segments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_json_parsing() {
        let body = r#"{
            "text": "hello world",
            "segments": [
                {"id": 0, "start": 0.0, "end": 2.4, "text": " hello"},
                {"id": 1, "start": 2.4, "end": 4.0, "text": " world"}
            ]
        }"#;

        let parsed: VerboseTranscription = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.text, "hello world");
        assert_eq!(parsed.segments.len(), 2);
        assert_eq!(parsed.segments[1].start, 2.4);
    }

    #[test]
    fn test_verbose_json_without_segments() {
        let parsed: VerboseTranscription =
            serde_json::from_str(r#"{"text": "short"}"#).unwrap();
        assert!(parsed.segments.is_empty());
    }

    #[test]
    fn test_error_response_parsing() {
        let body = r#"{"error": {"message": "Invalid file format", "type": "invalid_request_error", "code": null}}"#;
        let parsed: ErrorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.message, "Invalid file format");
    }
}
