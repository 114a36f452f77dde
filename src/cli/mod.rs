//! CLI argument definitions and command handlers.

pub mod args;

mod align;
mod meetings;
mod report;
mod transcribe;

pub use align::handle_align_command;
pub use args::{Cli, CliCommand, ServeCliArgs};
pub use meetings::handle_meetings_command;
pub use report::handle_report_command;
pub use transcribe::handle_transcribe_command;
