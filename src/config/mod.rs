use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory where per-meeting folders are created.
    pub output_dir: Option<PathBuf>,
    pub audio: AudioConfig,
    pub screenshot: ScreenshotConfig,
    pub markdown: MarkdownConfig,
    pub ai: AiConfig,
    pub alignment: AlignmentConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: None,
            audio: AudioConfig::default(),
            screenshot: ScreenshotConfig::default(),
            markdown: MarkdownConfig::default(),
            ai: AiConfig::default(),
            alignment: AlignmentConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output audio format: mp3, wav or m4a.
    pub format: String,
    pub sample_rate: u32,
    /// "mono" or "stereo".
    pub channel: String,
    pub bitrate: String,
    /// avfoundation input device index for system audio.
    pub device_index: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            format: "mp3".to_string(),
            sample_rate: 44100,
            channel: "stereo".to_string(),
            bitrate: "128k".to_string(),
            device_index: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenshotConfig {
    /// Output image format for captures (jpg or png).
    pub format: String,
    pub quality: u8,
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            format: "jpg".to_string(),
            quality: 85,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownConfig {
    /// Maximum width in pixels for images embedded in reports.
    pub max_image_width: u32,
    /// JPEG quality (0-100) for embedded images.
    pub jpeg_quality: u8,
    /// Maximum seconds to wait for a transcript to appear before
    /// rendering the report with a placeholder.
    pub transcript_wait_seconds: u64,
    /// Embed screenshots as base64 data URIs instead of file links.
    pub embed_images: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            max_image_width: 1200,
            jpeg_quality: 85,
            transcript_wait_seconds: 60,
            embed_images: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// OpenAI API key. Empty disables transcription and insights.
    pub openai_api_key: String,
    pub whisper_model: String,
    pub gpt_model: String,
    pub temperature: f32,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            whisper_model: "whisper-1".to_string(),
            gpt_model: "gpt-4o".to_string(),
            temperature: 0.2,
            language: "en".to_string(),
            api_endpoint: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    /// Slack in seconds applied on both ends of a segment's window when
    /// attaching screenshots. Unvalidated heuristic, hence configurable.
    pub slack_seconds: f64,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self { slack_seconds: 3.0 }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Resolved meetings output directory.
    pub fn output_dir(&self) -> Result<PathBuf> {
        match &self.output_dir {
            Some(dir) => Ok(dir.clone()),
            None => global::default_meetings_dir(),
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.ai.openai_api_key.trim().is_empty()
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.audio.format, "mp3");
        assert_eq!(config.audio.sample_rate, 44100);
        assert_eq!(config.screenshot.quality, 85);
        assert_eq!(config.markdown.max_image_width, 1200);
        assert_eq!(config.markdown.transcript_wait_seconds, 60);
        assert!(!config.markdown.embed_images);
        assert_eq!(config.ai.whisper_model, "whisper-1");
        assert_eq!(config.alignment.slack_seconds, 3.0);
        assert!(!config.has_api_key());
    }

    #[test]
    fn test_partial_toml_merges_with_defaults() {
        let config: Config = toml::from_str(
            r#"
            [markdown]
            max_image_width = 800

            [ai]
            openai_api_key = "sk-test"
            "#,
        )
        .unwrap();

        assert_eq!(config.markdown.max_image_width, 800);
        // Untouched fields fall back to defaults.
        assert_eq!(config.markdown.jpeg_quality, 85);
        assert_eq!(config.audio.format, "mp3");
        assert!(config.has_api_key());
    }

    #[test]
    fn test_round_trip() {
        let mut config = Config::default();
        config.alignment.slack_seconds = 5.0;
        config.markdown.embed_images = true;

        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(parsed.alignment.slack_seconds, 5.0);
        assert!(parsed.markdown.embed_images);
    }

    #[test]
    fn test_blank_api_key_is_not_configured() {
        let mut config = Config::default();
        config.ai.openai_api_key = "   ".to_string();
        assert!(!config.has_api_key());
    }
}
