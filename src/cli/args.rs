use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "meetingrec")]
#[command(about = "Meeting recorder for macOS", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Run the recording service with the HTTP control API (default)
    Serve(ServeCliArgs),
    /// Align screenshots with transcript segments for a recorded meeting
    Align(AlignCliArgs),
    /// Generate the markdown report for a recorded meeting
    Report(ReportCliArgs),
    /// Transcribe an audio file through the configured Whisper API
    Transcribe(TranscribeCliArgs),
    /// List recorded meetings
    Meetings(MeetingsCliArgs),
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug, Default)]
pub struct ServeCliArgs {
    /// Port for the control API (default: built-in constant)
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(ClapArgs, Debug)]
pub struct AlignCliArgs {
    /// Meeting directory name or path (default: the most recent meeting)
    pub meeting: Option<String>,
    /// Print a markdown preview of the aligned content
    #[arg(long)]
    pub preview: bool,
}

#[derive(ClapArgs, Debug)]
pub struct ReportCliArgs {
    /// Meeting directory name or path (default: the most recent meeting)
    pub meeting: Option<String>,
    /// Embed screenshots as base64 instead of linking them
    #[arg(long)]
    pub embed_images: bool,
}

#[derive(ClapArgs, Debug)]
pub struct TranscribeCliArgs {
    /// Audio file to transcribe
    pub file: PathBuf,
    /// Directory for the transcript JSON (default: alongside the audio file)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Disable the progress spinner
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(ClapArgs, Debug)]
pub struct MeetingsCliArgs {
    /// Maximum number of meetings to show
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
}
