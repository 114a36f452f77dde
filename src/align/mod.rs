//! Screenshot-to-transcript alignment.
//!
//! Transcript segments carry times relative to the start of the recording;
//! screenshot filenames carry wall-clock capture times. The aligner converts
//! the latter to recording-relative offsets using the start timestamp from
//! `meeting_info.txt` as an anchor, then attaches each screenshot to every
//! segment whose time window (widened by a configurable slack) contains it.
//! Without an anchor the raw wall-clock offsets are used, which still
//! preserves ordering but is less accurate.

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Timelike};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::error::OpReport;
use crate::transcription::{Segment, TranscriptData};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Metadata parsed from a screenshot filename
/// (`screenshot_<index>_<HH-MM-SS>.<ext>`).
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenshotMeta {
    pub file: PathBuf,
    pub index: u32,
    /// Capture time as seconds from midnight.
    pub timestamp_secs: f64,
    pub time_str: String,
}

/// A screenshot attached to a segment, with its recording-relative time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedScreenshot {
    pub file: String,
    pub relative_time: f64,
    pub time_str: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignedSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub screenshots: Vec<AlignedScreenshot>,
}

/// Aligned output plus aggregate counts, persisted as `aligned_content.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignedContent {
    pub segments: Vec<AlignedSegment>,
    pub total_screenshots: usize,
    pub total_segments: usize,
    pub screenshots_used: usize,
}

fn screenshot_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^screenshot_(\d+)_(\d{2})-(\d{2})-(\d{2})\..+$")
            .unwrap_or_else(|e| unreachable!("invalid screenshot pattern: {e}"))
    })
}

fn start_time_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"Recording started at: (\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2})")
            .unwrap_or_else(|e| unreachable!("invalid start time pattern: {e}"))
    })
}

/// Convert a wall-clock capture time to seconds since the recording started.
///
/// Capture times smaller than the anchor are assumed to be past midnight and
/// wrap forward by a day.
pub fn relative_capture_time(capture_secs: f64, anchor_secs: Option<f64>) -> f64 {
    match anchor_secs {
        Some(anchor) => {
            if capture_secs >= anchor {
                capture_secs - anchor
            } else {
                capture_secs + SECONDS_PER_DAY - anchor
            }
        }
        None => capture_secs,
    }
}

/// Parse screenshot metadata from a list of files. Files whose names don't
/// match the expected pattern are skipped. Result is sorted by capture time.
pub fn extract_screenshot_metadata(files: &[PathBuf]) -> Vec<ScreenshotMeta> {
    let mut metadata: Vec<ScreenshotMeta> = files
        .iter()
        .filter_map(|file| {
            let name = file.file_name()?.to_str()?;
            let caps = screenshot_pattern().captures(name)?;

            let index: u32 = caps[1].parse().ok()?;
            let hour: u32 = caps[2].parse().ok()?;
            let minute: u32 = caps[3].parse().ok()?;
            let second: u32 = caps[4].parse().ok()?;

            Some(ScreenshotMeta {
                file: file.clone(),
                index,
                timestamp_secs: f64::from(hour * 3600 + minute * 60 + second),
                time_str: format!("{hour:02}:{minute:02}:{second:02}"),
            })
        })
        .collect();

    metadata.sort_by(|a, b| a.timestamp_secs.total_cmp(&b.timestamp_secs));
    metadata
}

/// Extract the recording start anchor (seconds from midnight) from a
/// `meeting_info.txt` file. Missing file or unparsable content yields `None`.
pub fn extract_recording_start_time(info_file: &Path) -> Option<f64> {
    let text = std::fs::read_to_string(info_file).ok()?;
    let caps = start_time_pattern().captures(&text)?;
    let start = NaiveDateTime::parse_from_str(&caps[1], "%Y-%m-%dT%H:%M:%S").ok()?;
    Some(f64::from(
        start.hour() * 3600 + start.minute() * 60 + start.second(),
    ))
}

pub struct TranscriptAligner {
    slack_seconds: f64,
}

impl Default for TranscriptAligner {
    fn default() -> Self {
        Self::new(3.0)
    }
}

impl TranscriptAligner {
    pub fn new(slack_seconds: f64) -> Self {
        Self { slack_seconds }
    }

    /// Align screenshots with transcript segments.
    ///
    /// Segments with empty (whitespace-only) text are dropped. A screenshot
    /// attaches to every segment whose `[start - slack, end + slack]` window
    /// contains its relative time; both boundaries are inclusive and a
    /// screenshot may appear under multiple segments when windows overlap.
    pub fn align(
        &self,
        segments: &[Segment],
        screenshots: &[ScreenshotMeta],
        anchor_secs: Option<f64>,
    ) -> AlignedContent {
        let mut aligned_segments = Vec::new();

        for segment in segments {
            let text = segment.text.trim();
            if text.is_empty() {
                continue;
            }

            let attached: Vec<AlignedScreenshot> = screenshots
                .iter()
                .filter_map(|shot| {
                    let relative = relative_capture_time(shot.timestamp_secs, anchor_secs);
                    let in_window = segment.start - self.slack_seconds <= relative
                        && relative <= segment.end + self.slack_seconds;

                    in_window.then(|| AlignedScreenshot {
                        file: shot.file.display().to_string(),
                        relative_time: relative,
                        time_str: shot.time_str.clone(),
                    })
                })
                .collect();

            aligned_segments.push(AlignedSegment {
                start: segment.start,
                end: segment.end,
                text: text.to_string(),
                screenshots: attached,
            });
        }

        let screenshots_used = aligned_segments.iter().map(|s| s.screenshots.len()).sum();

        AlignedContent {
            total_screenshots: screenshots.len(),
            total_segments: aligned_segments.len(),
            screenshots_used,
            segments: aligned_segments,
        }
    }

    /// Align a meeting directory's transcript with its screenshots and write
    /// `aligned_content.json`.
    ///
    /// All failure modes (missing directory, missing transcript, no
    /// screenshots, zero segments) produce a failed report with a readable
    /// message rather than an error.
    pub fn align_meeting_content(&self, meeting_path: &Path) -> OpReport {
        if !meeting_path.exists() {
            return OpReport::failure(format!(
                "Meeting directory not found: {}",
                meeting_path.display()
            ));
        }

        let transcript_file = match find_latest_transcript(meeting_path) {
            Some(file) => file,
            None => {
                return OpReport::failure("No transcript file found in meeting directory");
            }
        };

        let screenshots_dir = meeting_path.join("screenshots");
        if !screenshots_dir.exists() {
            return OpReport::failure("Screenshots directory not found");
        }

        let screenshot_files = match list_screenshot_files(&screenshots_dir) {
            Ok(files) => files,
            Err(e) => return OpReport::from_error(&e),
        };
        if screenshot_files.is_empty() {
            return OpReport::failure("No screenshots found in meeting directory");
        }

        match self.align_files(meeting_path, &transcript_file, &screenshot_files) {
            Ok((content, aligned_file)) => {
                info!(
                    "Aligned {} segments with {} screenshots ({} attachments)",
                    content.total_segments, content.total_screenshots, content.screenshots_used
                );

                OpReport::success("Meeting content aligned successfully")
                    .with_detail("meeting_path", meeting_path.display().to_string())
                    .with_detail("aligned_file", aligned_file.display().to_string())
                    .with_detail("screenshots_count", content.total_screenshots as u64)
                    .with_detail("segments_count", content.total_segments as u64)
                    .with_detail("screenshots_used", content.screenshots_used as u64)
            }
            Err(e) => {
                warn!("Alignment failed: {:#}", e);
                OpReport::failure(format!("Failed to align meeting content: {e:#}"))
            }
        }
    }

    fn align_files(
        &self,
        meeting_path: &Path,
        transcript_file: &Path,
        screenshot_files: &[PathBuf],
    ) -> Result<(AlignedContent, PathBuf)> {
        let transcript_json = std::fs::read_to_string(transcript_file)
            .context("Failed to read transcript file")?;
        let transcript: TranscriptData =
            serde_json::from_str(&transcript_json).context("Failed to parse transcript JSON")?;

        if transcript.segments.is_empty() {
            anyhow::bail!("No transcript segments found in transcript file");
        }

        let screenshots = extract_screenshot_metadata(screenshot_files);

        let info_file = meeting_path.join("meeting_info.txt");
        let anchor = extract_recording_start_time(&info_file);
        if anchor.is_none() {
            debug!("No recording start anchor found; using raw capture times");
        }

        let content = self.align(&transcript.segments, &screenshots, anchor);

        let aligned_file = meeting_path.join("aligned_content.json");
        let json = serde_json::to_string_pretty(&content)
            .context("Failed to serialize aligned content")?;
        std::fs::write(&aligned_file, json).context("Failed to write aligned content file")?;

        Ok((content, aligned_file))
    }
}

/// Render a plain markdown preview of aligned content: `[MM:SS]` headers per
/// segment with relative links to the attached screenshots.
pub fn markdown_preview(content: &AlignedContent) -> String {
    let mut lines = vec![
        "# Meeting Transcript with Screenshots".to_string(),
        String::new(),
        format!("Total Segments: {}", content.total_segments),
        format!("Total Screenshots: {}", content.total_screenshots),
        format!("Screenshots Used: {}", content.screenshots_used),
        String::new(),
        "---".to_string(),
        String::new(),
    ];

    for segment in &content.segments {
        let minutes = segment.start as u64 / 60;
        let seconds = segment.start as u64 % 60;
        lines.push(format!("### [{minutes:02}:{seconds:02}] {}", segment.text));
        lines.push(String::new());

        for (i, shot) in segment.screenshots.iter().enumerate() {
            let name = Path::new(&shot.file)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| shot.file.clone());
            lines.push(format!("![Screenshot {}]({name})", i + 1));
            lines.push(String::new());
        }

        lines.push("---".to_string());
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Newest transcript file in a meeting directory, by lexicographic filename
/// order (filenames embed a sortable timestamp).
pub fn find_latest_transcript(meeting_path: &Path) -> Option<PathBuf> {
    let mut transcripts: Vec<PathBuf> = std::fs::read_dir(meeting_path)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("transcript_") && n.ends_with(".json"))
        })
        .collect();

    transcripts.sort();
    transcripts.pop()
}

fn list_screenshot_files(screenshots_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(screenshots_dir)
        .context("Failed to read screenshots directory")?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("screenshot_"))
        })
        .collect();

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(start: f64, end: f64, text: &str) -> Segment {
        Segment {
            start,
            end,
            text: text.to_string(),
        }
    }

    fn shot(index: u32, hour: u32, minute: u32, second: u32) -> ScreenshotMeta {
        ScreenshotMeta {
            file: PathBuf::from(format!(
                "screenshots/screenshot_{index:05}_{hour:02}-{minute:02}-{second:02}.jpg"
            )),
            index,
            timestamp_secs: f64::from(hour * 3600 + minute * 60 + second),
            time_str: format!("{hour:02}:{minute:02}:{second:02}"),
        }
    }

    #[test]
    fn test_relative_time_with_anchor() {
        // Screenshot at 10:05:00, recording started 10:00:00.
        assert_eq!(relative_capture_time(36300.0, Some(36000.0)), 300.0);
    }

    #[test]
    fn test_relative_time_wraps_midnight() {
        // Anchor just before midnight, capture just after.
        assert_eq!(relative_capture_time(100.0, Some(86000.0)), 500.0);
    }

    #[test]
    fn test_relative_time_without_anchor() {
        assert_eq!(relative_capture_time(36300.0, None), 36300.0);
    }

    #[test]
    fn test_extract_screenshot_metadata() {
        let files = vec![
            PathBuf::from("screenshots/screenshot_00001_10-00-30.jpg"),
            PathBuf::from("screenshots/screenshot_00000_10-00-05.png"),
            PathBuf::from("screenshots/notes.txt"),
        ];
        let meta = extract_screenshot_metadata(&files);
        assert_eq!(meta.len(), 2);
        // Sorted by capture time.
        assert_eq!(meta[0].index, 0);
        assert_eq!(meta[0].timestamp_secs, 36005.0);
        assert_eq!(meta[0].time_str, "10:00:05");
        assert_eq!(meta[1].index, 1);
    }

    #[test]
    fn test_slack_boundaries_inclusive() {
        let aligner = TranscriptAligner::new(3.0);
        let segments = vec![segment(10.0, 20.0, "talk")];
        // Anchor at 10:00:00; captures at +7s and +23s, exactly start-3 and end+3.
        let screenshots = vec![shot(0, 10, 0, 7), shot(1, 10, 0, 23)];

        let content = aligner.align(&segments, &screenshots, Some(36000.0));
        assert_eq!(content.segments[0].screenshots.len(), 2);
        assert_eq!(content.screenshots_used, 2);
    }

    #[test]
    fn test_outside_slack_excluded() {
        let aligner = TranscriptAligner::new(3.0);
        let segments = vec![segment(10.0, 20.0, "talk")];
        // +6s and +24s are one second outside the widened window.
        let screenshots = vec![shot(0, 10, 0, 6), shot(1, 10, 0, 24)];

        let content = aligner.align(&segments, &screenshots, Some(36000.0));
        assert!(content.segments[0].screenshots.is_empty());
        assert_eq!(content.screenshots_used, 0);
        assert_eq!(content.total_screenshots, 2);
    }

    #[test]
    fn test_empty_text_segments_dropped() {
        let aligner = TranscriptAligner::default();
        let segments = vec![segment(0.0, 5.0, "hello"), segment(5.0, 10.0, "")];

        let content = aligner.align(&segments, &[], None);
        assert_eq!(content.total_segments, 1);
        assert_eq!(content.segments[0].text, "hello");
    }

    #[test]
    fn test_whitespace_only_text_dropped_and_trimmed() {
        let aligner = TranscriptAligner::default();
        let segments = vec![segment(0.0, 5.0, "  spoken  "), segment(5.0, 10.0, "   ")];

        let content = aligner.align(&segments, &[], None);
        assert_eq!(content.total_segments, 1);
        assert_eq!(content.segments[0].text, "spoken");
    }

    #[test]
    fn test_screenshot_may_attach_to_multiple_segments() {
        let aligner = TranscriptAligner::new(3.0);
        // Adjacent segments; a capture near the boundary lands in both
        // widened windows. Accepted behavior, not deduplicated.
        let segments = vec![segment(0.0, 10.0, "first"), segment(10.0, 20.0, "second")];
        let screenshots = vec![shot(0, 10, 0, 10)];

        let content = aligner.align(&segments, &screenshots, Some(36000.0));
        assert_eq!(content.segments[0].screenshots.len(), 1);
        assert_eq!(content.segments[1].screenshots.len(), 1);
        assert_eq!(content.screenshots_used, 2);
        assert_eq!(content.total_screenshots, 1);
    }

    #[test]
    fn test_align_is_deterministic() {
        let aligner = TranscriptAligner::default();
        let segments = vec![segment(0.0, 30.0, "one"), segment(30.0, 60.0, "two")];
        let screenshots = vec![shot(0, 10, 0, 10), shot(1, 10, 0, 45)];

        let first = aligner.align(&segments, &screenshots, Some(36000.0));
        let second = aligner.align(&segments, &screenshots, Some(36000.0));

        let a = serde_json::to_string(&first).unwrap();
        let b = serde_json::to_string(&second).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_align_missing_directory_reports_failure() {
        let aligner = TranscriptAligner::default();
        let report = aligner.align_meeting_content(Path::new("/nonexistent/meeting"));
        assert!(!report.success);
        assert!(report.message.contains("Meeting directory not found"));
    }

    #[test]
    fn test_markdown_preview_format() {
        let content = AlignedContent {
            segments: vec![AlignedSegment {
                start: 65.0,
                end: 70.0,
                text: "discussing the roadmap".to_string(),
                screenshots: vec![AlignedScreenshot {
                    file: "screenshots/screenshot_00000_10-01-06.jpg".to_string(),
                    relative_time: 66.0,
                    time_str: "10:01:06".to_string(),
                }],
            }],
            total_screenshots: 1,
            total_segments: 1,
            screenshots_used: 1,
        };

        let md = markdown_preview(&content);
        assert!(md.contains("### [01:05] discussing the roadmap"));
        assert!(md.contains("![Screenshot 1](screenshot_00000_10-01-06.jpg)"));
        assert!(md.contains("Screenshots Used: 1"));
    }
}
