//! Recorded meeting listing and lookup.
//!
//! A meeting is a directory under the output directory whose name ends in
//! `-meeting`. Everything here is derived from the filesystem; there is no
//! separate index to fall out of sync.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::report;

fn duration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"Duration: ([0-9.]+) seconds")
            .unwrap_or_else(|e| unreachable!("invalid duration pattern: {e}"))
    })
}

/// Summary of one recorded meeting directory.
#[derive(Debug, Clone, Serialize)]
pub struct MeetingSummary {
    pub name: String,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    pub has_audio: bool,
    pub has_transcript: bool,
    pub has_report: bool,
    pub has_insights: bool,
    pub screenshot_count: usize,
}

impl MeetingSummary {
    fn from_dir(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            started_at: report::extract_datetime_from_folder_name(&name),
            duration_seconds: read_duration(&path),
            has_audio: report::find_audio_file(&path).is_some(),
            has_transcript: report::find_transcript_file(&path).is_some(),
            has_report: path.join(report::REPORT_FILENAME).is_file(),
            has_insights: path.join("meeting_insights.json").is_file(),
            screenshot_count: report::find_screenshot_files(&path).len(),
            name,
            path,
        }
    }
}

/// Duration from the `meeting_info.txt` stop entry, if recorded.
fn read_duration(meeting_path: &Path) -> Option<f64> {
    let info = std::fs::read_to_string(meeting_path.join("meeting_info.txt")).ok()?;
    let caps = duration_pattern().captures(&info)?;
    caps[1].parse().ok()
}

/// List all meeting directories under `output_dir`, newest first.
pub fn list_meetings(output_dir: &Path) -> Result<Vec<MeetingSummary>> {
    if !output_dir.is_dir() {
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(output_dir)
        .with_context(|| format!("Failed to read meetings directory {}", output_dir.display()))?;

    let mut meetings: Vec<MeetingSummary> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_dir()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with("-meeting"))
        })
        .map(MeetingSummary::from_dir)
        .collect();

    // Folder names start with the date, so name order is chronological.
    meetings.sort_by(|a, b| b.name.cmp(&a.name));
    Ok(meetings)
}

/// The most recently started meeting, if any.
pub fn latest_meeting(output_dir: &Path) -> Result<Option<MeetingSummary>> {
    Ok(list_meetings(output_dir)?.into_iter().next())
}

/// Resolve a meeting reference to a directory: an absolute or relative path
/// that exists, or a meeting name under `output_dir`.
pub fn resolve_meeting(output_dir: &Path, reference: &str) -> Result<PathBuf> {
    let as_path = PathBuf::from(reference);
    if as_path.is_dir() {
        return Ok(as_path);
    }

    let under_output = output_dir.join(reference);
    if under_output.is_dir() {
        return Ok(under_output);
    }

    anyhow::bail!(
        "Meeting not found: {reference} (looked in {})",
        output_dir.display()
    )
}
