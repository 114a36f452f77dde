//! CLI handler for generating a meeting report.

use anyhow::{bail, Result};

use crate::cli::args::ReportCliArgs;
use crate::config::Config;
use crate::meetings;
use crate::report::MarkdownExporter;

pub async fn handle_report_command(args: ReportCliArgs) -> Result<()> {
    let mut config = Config::load()?;
    if args.embed_images {
        config.markdown.embed_images = true;
    }
    let output_dir = config.output_dir()?;

    let meeting_path = match &args.meeting {
        Some(reference) => meetings::resolve_meeting(&output_dir, reference)?,
        None => match meetings::latest_meeting(&output_dir)? {
            Some(meeting) => meeting.path,
            None => bail!("No meetings found in {}", output_dir.display()),
        },
    };

    let exporter = MarkdownExporter::new(&config.markdown);
    let report_path = exporter.generate_report(&meeting_path).await?;

    println!("Report written to {}", report_path.display());
    Ok(())
}
