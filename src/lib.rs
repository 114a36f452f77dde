//! MeetingRec: a meeting recorder for macOS.
//!
//! Records system audio through FFmpeg, captures window screenshots,
//! transcribes audio with the OpenAI Whisper API, aligns screenshots with
//! transcript segments and assembles a markdown report per meeting.

pub mod align;
pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod global;
pub mod insights;
pub mod meetings;
pub mod recorder;
pub mod report;
pub mod screenshot;
pub mod transcription;
pub mod workflow;
