//! CLI handler for transcribing an audio file.

use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::cli::args::TranscribeCliArgs;
use crate::config::Config;
use crate::transcription::TranscriptionService;

pub async fn handle_transcribe_command(args: TranscribeCliArgs) -> Result<()> {
    if !args.file.is_file() {
        bail!("File not found: {}", args.file.display());
    }

    let config = Config::load()?;
    if !config.has_api_key() {
        bail!(
            "No OpenAI API key configured. Set ai.openai_api_key in the config file \
             to enable transcription."
        );
    }

    let output_dir = match &args.output_dir {
        Some(dir) => dir.clone(),
        None => args
            .file
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| std::path::PathBuf::from(".")),
    };

    let spinner = if args.no_progress {
        None
    } else {
        Some(create_spinner())
    };

    let service = TranscriptionService::new(&config.ai);
    let report = service.transcribe_audio(&args.file, &output_dir).await;

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    if !report.success {
        bail!("{}", report.message);
    }

    if let Some(path) = report.detail_str("transcript_path") {
        eprintln!("Transcript saved to: {path}");
    }
    if let Some(text) = report.detail_str("text") {
        println!("{text}");
    }

    Ok(())
}

fn create_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Transcribing...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
