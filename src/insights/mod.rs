//! AI-generated meeting insights.
//!
//! Sends the meeting text to the chat completions API to produce a summary,
//! key points and action items. Everything here is best-effort: a failed call
//! just leaves the corresponding section out of `meeting_insights.json`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::align::AlignedContent;
use crate::config::AiConfig;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Insights persisted as `meeting_insights.json` and rendered in the report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeetingInsights {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_points: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub action_items: Vec<String>,
}

impl MeetingInsights {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.key_points.is_empty() && self.action_items.is_empty()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

pub struct InsightsService {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl InsightsService {
    pub fn new(ai_config: &AiConfig) -> Option<Self> {
        if ai_config.openai_api_key.trim().is_empty() {
            return None;
        }

        Some(Self {
            client: reqwest::Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: ai_config.openai_api_key.clone(),
            model: ai_config.gpt_model.clone(),
            temperature: ai_config.temperature,
        })
    }

    /// Generate insights from aligned content and write
    /// `meeting_insights.json` in the meeting directory.
    pub async fn process_meeting(
        &self,
        meeting_path: &Path,
        content: &AlignedContent,
    ) -> Result<MeetingInsights> {
        let meeting_text = extract_meeting_text(content);
        if meeting_text.trim().is_empty() {
            anyhow::bail!("No transcript text available for insights");
        }

        let mut insights = MeetingInsights::default();

        match self.generate_summary(&meeting_text).await {
            Ok(summary) => insights.summary = Some(summary),
            Err(e) => warn!("Summary generation failed: {:#}", e),
        }

        match self.extract_action_items(&meeting_text).await {
            Ok(items) => insights.action_items = items,
            Err(e) => warn!("Action item extraction failed: {:#}", e),
        }

        match self.identify_key_points(&meeting_text).await {
            Ok(points) => insights.key_points = points,
            Err(e) => warn!("Key point identification failed: {:#}", e),
        }

        if insights.is_empty() {
            anyhow::bail!("All insight generation calls failed");
        }

        let insights_file = meeting_path.join("meeting_insights.json");
        let json = serde_json::to_string_pretty(&insights)
            .context("Failed to serialize insights")?;
        std::fs::write(&insights_file, json).context("Failed to write insights file")?;

        info!("Meeting insights saved to {:?}", insights_file);
        Ok(insights)
    }

    async fn generate_summary(&self, meeting_text: &str) -> Result<String> {
        let prompt = format!(
            "You are a professional meeting summarizer. Create a clear, concise summary \
             of the following meeting transcript, focusing on the main discussion points \
             and outcomes. Aim for 3-5 paragraphs.\n\n{meeting_text}"
        );
        self.complete(&prompt).await
    }

    async fn extract_action_items(&self, meeting_text: &str) -> Result<Vec<String>> {
        let prompt = format!(
            "Extract the action items from the following meeting transcript. \
             Respond with one action item per line and nothing else. If there are \
             no action items, respond with an empty message.\n\n{meeting_text}"
        );
        let response = self.complete(&prompt).await?;
        Ok(parse_list_response(&response))
    }

    async fn identify_key_points(&self, meeting_text: &str) -> Result<Vec<String>> {
        let prompt = format!(
            "List the key points discussed in the following meeting transcript. \
             Respond with one key point per line and nothing else.\n\n{meeting_text}"
        );
        let response = self.complete(&prompt).await?;
        Ok(parse_list_response(&response))
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to send request to chat completions API")?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            anyhow::bail!("Chat completions API failed with status {status}: {text}");
        }

        let parsed: ChatResponse =
            serde_json::from_str(&text).context("Failed to parse chat response")?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .context("Chat response contained no choices")?;

        Ok(content.trim().to_string())
    }
}

/// Flatten aligned content into `[MM:SS] text` lines for prompting.
pub fn extract_meeting_text(content: &AlignedContent) -> String {
    content
        .segments
        .iter()
        .map(|segment| {
            let minutes = segment.start as u64 / 60;
            let seconds = segment.start as u64 % 60;
            format!("[{minutes:02}:{seconds:02}] {}", segment.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse a one-item-per-line model response, stripping bullet markers.
fn parse_list_response(response: &str) -> Vec<String> {
    response
        .lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(['-', '*', '•'])
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::AlignedSegment;

    #[test]
    fn test_extract_meeting_text() {
        let content = AlignedContent {
            segments: vec![
                AlignedSegment {
                    start: 0.0,
                    end: 5.0,
                    text: "welcome".to_string(),
                    screenshots: vec![],
                },
                AlignedSegment {
                    start: 125.0,
                    end: 130.0,
                    text: "next steps".to_string(),
                    screenshots: vec![],
                },
            ],
            total_screenshots: 0,
            total_segments: 2,
            screenshots_used: 0,
        };

        let text = extract_meeting_text(&content);
        assert_eq!(text, "[00:00] welcome\n[02:05] next steps");
    }

    #[test]
    fn test_parse_list_response_strips_bullets() {
        let items = parse_list_response("- ship the release\n* update docs\n\n  follow up with QA ");
        assert_eq!(
            items,
            vec!["ship the release", "update docs", "follow up with QA"]
        );
    }

    #[test]
    fn test_parse_list_response_empty() {
        assert!(parse_list_response("\n  \n").is_empty());
    }

    #[test]
    fn test_insights_service_requires_api_key() {
        assert!(InsightsService::new(&AiConfig::default()).is_none());
    }

    #[test]
    fn test_insights_serialization_skips_empty_sections() {
        let insights = MeetingInsights {
            summary: Some("short".to_string()),
            key_points: vec![],
            action_items: vec![],
        };
        let json = serde_json::to_value(&insights).unwrap();
        assert_eq!(json["summary"], "short");
        assert!(json.get("key_points").is_none());
    }
}
