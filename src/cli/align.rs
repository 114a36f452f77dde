//! CLI handler for aligning screenshots with transcript segments.

use anyhow::{bail, Result};

use crate::align::{self, TranscriptAligner};
use crate::cli::args::AlignCliArgs;
use crate::config::Config;
use crate::meetings;

pub fn handle_align_command(args: AlignCliArgs) -> Result<()> {
    let config = Config::load()?;
    let output_dir = config.output_dir()?;

    let meeting_path = match &args.meeting {
        Some(reference) => meetings::resolve_meeting(&output_dir, reference)?,
        None => match meetings::latest_meeting(&output_dir)? {
            Some(meeting) => meeting.path,
            None => bail!("No meetings found in {}", output_dir.display()),
        },
    };

    let aligner = TranscriptAligner::new(config.alignment.slack_seconds);
    let report = aligner.align_meeting_content(&meeting_path);

    if !report.success {
        bail!("{}", report.message);
    }

    println!("{}", report.message);
    if let (Some(segments), Some(used)) = (
        report.detail_u64("segments_count"),
        report.detail_u64("screenshots_used"),
    ) {
        println!("Segments: {segments}, screenshot attachments: {used}");
    }
    if let Some(file) = report.detail_str("aligned_file") {
        println!("Aligned content: {file}");
    }

    if args.preview {
        let raw = std::fs::read_to_string(meeting_path.join("aligned_content.json"))?;
        let content = serde_json::from_str(&raw)?;
        println!("\n{}", align::markdown_preview(&content));
    }

    Ok(())
}
