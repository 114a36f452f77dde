//! CLI handler for listing recorded meetings.

use anyhow::Result;

use crate::cli::args::MeetingsCliArgs;
use crate::config::Config;
use crate::meetings;

pub fn handle_meetings_command(args: MeetingsCliArgs) -> Result<()> {
    let config = Config::load()?;
    let output_dir = config.output_dir()?;

    let listed = meetings::list_meetings(&output_dir)?;
    if listed.is_empty() {
        println!("No meetings found in {}", output_dir.display());
        return Ok(());
    }

    println!("Found {} meeting(s):\n", listed.len());

    for meeting in listed.iter().take(args.limit) {
        println!("{}", meeting.name);
        if let Some(duration) = meeting.duration_seconds {
            println!("  Duration: {}", format_duration(duration));
        }
        println!("  Artifacts: {}", describe_artifacts(meeting));
        println!("  Path: {}", meeting.path.display());
        println!();
    }

    Ok(())
}

fn describe_artifacts(meeting: &meetings::MeetingSummary) -> String {
    let mut parts: Vec<String> = Vec::new();
    if meeting.has_audio {
        parts.push("audio".to_string());
    }
    if meeting.has_transcript {
        parts.push("transcript".to_string());
    }
    if meeting.has_insights {
        parts.push("insights".to_string());
    }
    if meeting.has_report {
        parts.push("report".to_string());
    }
    if meeting.screenshot_count > 0 {
        parts.push(format!("{} screenshot(s)", meeting.screenshot_count));
    }
    if parts.is_empty() {
        return "none".to_string();
    }
    parts.join(", ")
}

fn format_duration(seconds: f64) -> String {
    let total = seconds.round() as u64;
    let minutes = total / 60;
    let secs = total % 60;
    format!("{minutes:02}:{secs:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn summary(audio: bool, shots: usize) -> meetings::MeetingSummary {
        meetings::MeetingSummary {
            name: "2025-05-21-10-30-meeting".to_string(),
            path: PathBuf::from("/tmp/2025-05-21-10-30-meeting"),
            started_at: None,
            duration_seconds: None,
            has_audio: audio,
            has_transcript: false,
            has_report: false,
            has_insights: false,
            screenshot_count: shots,
        }
    }

    #[test]
    fn test_describe_artifacts() {
        assert_eq!(describe_artifacts(&summary(false, 0)), "none");
        assert_eq!(describe_artifacts(&summary(true, 2)), "audio, 2 screenshot(s)");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "00:00");
        assert_eq!(format_duration(61.4), "01:01");
        assert_eq!(format_duration(3599.6), "60:00");
    }
}
