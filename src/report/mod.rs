//! Markdown report assembly.
//!
//! Collects a meeting directory's artifacts (audio, transcript, screenshots,
//! insights, recording info) and renders them into `meeting_report.md`.
//! Per-section failures degrade to inline placeholders; the report always
//! completes.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime};
use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::MarkdownConfig;
use crate::insights::MeetingInsights;

pub mod embed;

pub const REPORT_FILENAME: &str = "meeting_report.md";

const SCREENSHOT_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];
const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "m4a"];

fn folder_datetime_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(\d{4}-\d{2}-\d{2}-\d{2}-\d{2})")
            .unwrap_or_else(|e| unreachable!("invalid folder datetime pattern: {e}"))
    })
}

pub struct MarkdownExporter {
    max_image_width: u32,
    jpeg_quality: u8,
    transcript_wait: Duration,
    embed_images: bool,
}

impl MarkdownExporter {
    pub fn new(config: &MarkdownConfig) -> Self {
        Self {
            max_image_width: config.max_image_width,
            jpeg_quality: config.jpeg_quality,
            transcript_wait: Duration::from_secs(config.transcript_wait_seconds),
            embed_images: config.embed_images,
        }
    }

    /// Generate the markdown report for a meeting directory and write it to
    /// `meeting_report.md` inside that directory.
    pub async fn generate_report(&self, meeting_path: &Path) -> Result<PathBuf> {
        info!("Generating markdown report for meeting: {:?}", meeting_path);

        if !meeting_path.is_dir() {
            anyhow::bail!("Meeting directory not found: {}", meeting_path.display());
        }

        let report_file = meeting_path.join(REPORT_FILENAME);

        let audio_file = find_audio_file(meeting_path);
        let mut transcript_file = find_transcript_file(meeting_path);

        // The transcript may still be in flight when the report is requested.
        if audio_file.is_some() && transcript_file.is_none() {
            transcript_file = self.wait_for_transcript(meeting_path).await;
        }

        let screenshot_files = find_screenshot_files(meeting_path);

        let mut content: Vec<String> = Vec::new();

        let meeting_name = meeting_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "meeting".to_string());
        content.push(format!("# Meeting: {meeting_name}\n"));

        match extract_datetime_from_folder_name(&meeting_name) {
            Some(dt) => {
                content.push(format!(
                    "**Date and Time:** {}\n",
                    dt.format("%Y-%m-%d %H:%M:%S")
                ));
            }
            None => {
                if let Some(fallback) = folder_filesystem_time(meeting_path) {
                    content.push(format!(
                        "**Date and Time:** {} (folder creation time)\n",
                        fallback.format("%Y-%m-%d %H:%M:%S")
                    ));
                }
            }
        }

        match &audio_file {
            Some(audio) => content.push(format!(
                "**Audio File:** {}\n",
                audio.file_name().unwrap_or_default().to_string_lossy()
            )),
            None => content.push("**Audio File:** Not found\n".to_string()),
        }

        self.add_meeting_info(&mut content, meeting_path);

        content.push("\n## Transcript\n".to_string());
        match &transcript_file {
            Some(file) => {
                content.push(read_transcript(file));
                content.push("\n".to_string());
            }
            None => {
                content.push(
                    "*Transcript not available. The audio file may still be processing.*\n\n"
                        .to_string(),
                );
            }
        }

        self.add_insights(&mut content, meeting_path);
        self.add_screenshots(&mut content, meeting_path, &screenshot_files);

        content.push("\n---\n".to_string());
        content.push(format!(
            "*Generated by MeetingRec on {}*\n",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ));

        std::fs::write(&report_file, content.join("\n")).context("Failed to write report file")?;

        let file_size = std::fs::metadata(&report_file).map(|m| m.len()).unwrap_or(0);
        info!(
            "Markdown report generated: {:?} ({})",
            report_file,
            format_file_size(file_size)
        );

        Ok(report_file)
    }

    /// Poll once per second for a transcript file, up to the configured wait.
    async fn wait_for_transcript(&self, meeting_path: &Path) -> Option<PathBuf> {
        let max_secs = self.transcript_wait.as_secs();
        info!(
            "Waiting for transcript file to appear (max {} seconds)...",
            max_secs
        );

        for _ in 0..max_secs {
            if let Some(file) = find_transcript_file(meeting_path) {
                info!("Found transcript file after waiting: {:?}", file);
                return Some(file);
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        warn!("No transcript file found after waiting {} seconds", max_secs);
        None
    }

    fn add_meeting_info(&self, content: &mut Vec<String>, meeting_path: &Path) {
        let info_path = meeting_path.join("meeting_info.txt");
        if !info_path.exists() {
            return;
        }

        content.push("\n## Meeting Information\n".to_string());
        match std::fs::read_to_string(&info_path) {
            Ok(info) => content.push(format!("```\n{}\n```\n", info.trim_end())),
            Err(e) => {
                warn!("Error reading meeting info file: {}", e);
                content.push(format!("*Error reading meeting information: {e}*\n"));
            }
        }
    }

    fn add_insights(&self, content: &mut Vec<String>, meeting_path: &Path) {
        let insights_path = meeting_path.join("meeting_insights.json");
        if !insights_path.exists() {
            return;
        }

        content.push("## Meeting Insights\n".to_string());

        let insights: MeetingInsights = match std::fs::read_to_string(&insights_path)
            .map_err(anyhow::Error::from)
            .and_then(|json| serde_json::from_str(&json).map_err(anyhow::Error::from))
        {
            Ok(insights) => insights,
            Err(e) => {
                warn!("Error processing meeting insights: {:#}", e);
                content.push(format!("*Error loading insights: {e}*\n\n"));
                return;
            }
        };

        if let Some(summary) = &insights.summary {
            content.push("### Summary\n".to_string());
            content.push(format!("{summary}\n"));
        }

        if !insights.key_points.is_empty() {
            content.push("### Key Points\n".to_string());
            for point in &insights.key_points {
                content.push(format!("- {point}"));
            }
            content.push(String::new());
        }

        if !insights.action_items.is_empty() {
            content.push("### Action Items\n".to_string());
            for item in &insights.action_items {
                content.push(format!("- [ ] {item}"));
            }
            content.push(String::new());
        }
    }

    fn add_screenshots(
        &self,
        content: &mut Vec<String>,
        meeting_path: &Path,
        screenshot_files: &[PathBuf],
    ) {
        content.push("## Screenshots\n".to_string());

        if screenshot_files.is_empty() {
            content.push("*No screenshots were captured during this meeting.*\n".to_string());
            return;
        }

        for (i, screenshot) in screenshot_files.iter().enumerate() {
            let number = i + 1;
            let timestamp = screenshot_time_label(screenshot)
                .map(|t| format!("[{t}] "))
                .unwrap_or_default();
            content.push(format!("### {timestamp}Screenshot {number}\n"));

            if self.embed_images {
                self.add_embedded_screenshot(content, meeting_path, screenshot, number);
            } else {
                content.push(format!(
                    "![Screenshot {number}]({})\n",
                    relative_link(meeting_path, screenshot)
                ));
            }
        }
    }

    fn add_embedded_screenshot(
        &self,
        content: &mut Vec<String>,
        meeting_path: &Path,
        screenshot: &Path,
        number: usize,
    ) {
        match embed::process_for_embedding(screenshot, self.max_image_width, self.jpeg_quality) {
            Ok(embedded) => {
                content.push(format!("![Screenshot {number}]({})\n", embedded.data_uri));
            }
            Err(e) => {
                warn!("Error embedding screenshot {:?}: {:#}", screenshot, e);
                content.push(format!("*Error embedding screenshot: {e}*\n"));
                content.push(format!(
                    "![Screenshot {number} (not embedded)]({})\n",
                    relative_link(meeting_path, screenshot)
                ));
            }
        }
    }
}

/// Find the meeting audio file: known audio extensions first, then anything
/// with "audio" in the name.
pub fn find_audio_file(meeting_path: &Path) -> Option<PathBuf> {
    let entries = sorted_files(meeting_path);

    for ext in AUDIO_EXTENSIONS {
        if let Some(found) = entries.iter().find(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(ext))
        }) {
            return Some(found.clone());
        }
    }

    entries
        .iter()
        .find(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.contains("audio"))
        })
        .cloned()
}

/// Find the transcript file by filename pattern.
pub fn find_transcript_file(meeting_path: &Path) -> Option<PathBuf> {
    let entries = sorted_files(meeting_path);

    for ext in ["json", "txt"] {
        if let Some(found) = entries.iter().find(|p| {
            let name = p.file_name().and_then(|n| n.to_str()).unwrap_or("");
            name.contains("transcript")
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case(ext))
        }) {
            return Some(found.clone());
        }
    }

    None
}

/// All screenshot image files in the `screenshots/` subdirectory, sorted by
/// name (filenames embed capture order and time).
pub fn find_screenshot_files(meeting_path: &Path) -> Vec<PathBuf> {
    let screenshots_dir = meeting_path.join("screenshots");
    if !screenshots_dir.is_dir() {
        warn!("Screenshots directory not found: {:?}", screenshots_dir);
        return Vec::new();
    }

    sorted_files(&screenshots_dir)
        .into_iter()
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| SCREENSHOT_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        })
        .collect()
}

/// Read transcript content for rendering. JSON files yield their `text`
/// field when present, the pretty-printed JSON otherwise; anything
/// unreadable becomes a placeholder.
pub fn read_transcript(transcript_file: &Path) -> String {
    let raw = match std::fs::read_to_string(transcript_file) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Error reading transcript file: {}", e);
            return "*Transcript could not be loaded due to an error.*".to_string();
        }
    };

    let is_json = transcript_file
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if !is_json {
        return raw;
    }

    match serde_json::from_str::<Value>(&raw) {
        Ok(value) => {
            if let Some(text) = value.get("text").and_then(Value::as_str) {
                text.to_string()
            } else {
                let pretty = serde_json::to_string_pretty(&value).unwrap_or(raw);
                format!("\n{pretty}\n")
            }
        }
        // Not valid JSON despite the extension; treat as plain text.
        Err(_) => raw,
    }
}

/// Parse `YYYY-MM-DD-HH-MM` out of a meeting folder name.
pub fn extract_datetime_from_folder_name(folder_name: &str) -> Option<NaiveDateTime> {
    let caps = folder_datetime_pattern().captures(folder_name)?;
    NaiveDateTime::parse_from_str(&caps[1], "%Y-%m-%d-%H-%M").ok()
}

fn folder_filesystem_time(meeting_path: &Path) -> Option<DateTime<Local>> {
    let metadata = std::fs::metadata(meeting_path).ok()?;
    let time = metadata.created().or_else(|_| metadata.modified()).ok()?;
    Some(DateTime::<Local>::from(time))
}

fn screenshot_time_label(screenshot: &Path) -> Option<String> {
    let stem = screenshot.file_stem()?.to_str()?;
    // screenshot_<index>_<HH-MM-SS>
    let time_part = stem.split('_').nth(2)?;
    if time_part.len() != 8 {
        return None;
    }
    Some(time_part.replace('-', ":"))
}

fn relative_link(meeting_path: &Path, file: &Path) -> String {
    file.strip_prefix(meeting_path)
        .unwrap_or(file)
        .display()
        .to_string()
}

fn sorted_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .collect()
        })
        .unwrap_or_default();
    files.sort();
    files
}

pub fn format_file_size(size_bytes: u64) -> String {
    let mut size = size_bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} TB")
}
