//! User-facing notifications for workflow milestones.
//!
//! The workflow machine reports milestones through a `Notifier` so the
//! delivery mechanism stays swappable. The default implementation logs;
//! a channel-backed implementation feeds tests and streaming consumers.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{error, info};

/// A workflow milestone worth telling the user about.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    RecordingStarted { meeting_path: PathBuf },
    RecordingStopped { meeting_path: PathBuf, duration_seconds: f64 },
    ScreenshotCaptured { count: u32 },
    ProcessingStarted { meeting_path: PathBuf },
    ReportReady { report_path: PathBuf },
    ProcessingFailed { message: String },
}

impl WorkflowEvent {
    /// One-line human-readable description.
    pub fn describe(&self) -> String {
        match self {
            Self::RecordingStarted { meeting_path } => {
                format!("Recording started: {}", meeting_path.display())
            }
            Self::RecordingStopped {
                duration_seconds, ..
            } => format!("Recording stopped after {duration_seconds:.1}s"),
            Self::ScreenshotCaptured { count } => {
                format!("Screenshot {count} captured")
            }
            Self::ProcessingStarted { meeting_path } => {
                format!("Processing meeting: {}", meeting_path.display())
            }
            Self::ReportReady { report_path } => {
                format!("Meeting report ready: {}", report_path.display())
            }
            Self::ProcessingFailed { message } => {
                format!("Meeting processing failed: {message}")
            }
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::ProcessingFailed { .. })
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &WorkflowEvent);
}

/// Notifier that writes milestones to the application log.
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &WorkflowEvent) {
        if event.is_failure() {
            error!("{}", event.describe());
        } else {
            info!("{}", event.describe());
        }
    }
}

/// Notifier that forwards events over an unbounded channel. The send side
/// never blocks; a dropped receiver just means nobody is listening anymore.
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<WorkflowEvent>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<WorkflowEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, event: &WorkflowEvent) {
        let _ = self.sender.send(event.clone());
    }
}
