use anyhow::Result;
use clap::Parser;
use meetingrec::{
    app,
    cli::{
        handle_align_command, handle_meetings_command, handle_report_command,
        handle_transcribe_command, Cli, CliCommand,
    },
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(CliCommand::Version) => {
            println!("MeetingRec {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(CliCommand::Align(args)) => handle_align_command(args),
        Some(CliCommand::Report(args)) => handle_report_command(args).await,
        Some(CliCommand::Transcribe(args)) => handle_transcribe_command(args).await,
        Some(CliCommand::Meetings(args)) => handle_meetings_command(args),
        Some(CliCommand::Serve(args)) => app::run_service(args.port).await,
        None => app::run_service(None).await,
    }
}
