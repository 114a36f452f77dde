//! Window screenshot capture.
//!
//! Capture goes through an ordered list of strategies, tried in sequence
//! until one produces a file: frontmost-window capture first, full-screen
//! capture as the fallback. Each strategy returns a typed outcome, so a
//! failed attempt is data, not a swallowed exception.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Local;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::ScreenshotConfig;
use crate::error::{ErrorCategory, OpReport};

const SCREENCAPTURE_PATHS: &[&str] = &[
    "/usr/sbin/screencapture",
    "/usr/bin/screencapture",
    "/bin/screencapture",
];

const CAPTURE_TIMEOUT: Duration = Duration::from_secs(5);

/// What a capture strategy is able to grab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureScope {
    /// The frontmost window only.
    ActiveWindow,
    /// The entire screen.
    FullScreen,
}

impl CaptureScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ActiveWindow => "active_window",
            Self::FullScreen => "full_screen",
        }
    }
}

/// Outcome of one strategy attempt.
#[derive(Debug)]
pub enum CaptureOutcome {
    Captured { scope: CaptureScope },
    Failed { scope: CaptureScope, reason: String },
}

/// A single way of producing a screenshot file.
#[async_trait]
pub trait CaptureStrategy: Send + Sync {
    fn scope(&self) -> CaptureScope;
    async fn capture(&self, output_path: &Path) -> CaptureOutcome;
}

/// `screencapture -w`: frontmost window, no interaction, no sound.
pub struct WindowCaptureStrategy {
    utility_path: PathBuf,
}

/// `screencapture -x`: full screen, silent.
pub struct ScreenCaptureStrategy {
    utility_path: PathBuf,
}

fn find_screencapture() -> Option<PathBuf> {
    SCREENCAPTURE_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
}

async fn run_screencapture(
    utility_path: &Path,
    scope: CaptureScope,
    args: &[&str],
    output_path: &Path,
) -> CaptureOutcome {
    let command = Command::new(utility_path)
        .args(args)
        .arg(output_path)
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(CAPTURE_TIMEOUT, command).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return CaptureOutcome::Failed {
                scope,
                reason: format!("screencapture failed to run: {e}"),
            }
        }
        Err(_) => {
            return CaptureOutcome::Failed {
                scope,
                reason: format!("screencapture timed out after {}s", CAPTURE_TIMEOUT.as_secs()),
            }
        }
    };

    if !output.status.success() {
        return CaptureOutcome::Failed {
            scope,
            reason: format!(
                "screencapture exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        };
    }

    // screencapture can exit zero without producing a file (e.g. when the
    // user lacks screen recording permission).
    let has_content = std::fs::metadata(output_path)
        .map(|m| m.len() > 0)
        .unwrap_or(false);
    if !has_content {
        return CaptureOutcome::Failed {
            scope,
            reason: "screencapture produced no output file".to_string(),
        };
    }

    CaptureOutcome::Captured { scope }
}

#[async_trait]
impl CaptureStrategy for WindowCaptureStrategy {
    fn scope(&self) -> CaptureScope {
        CaptureScope::ActiveWindow
    }

    async fn capture(&self, output_path: &Path) -> CaptureOutcome {
        run_screencapture(
            &self.utility_path,
            self.scope(),
            &["-w", "-o", "-x"],
            output_path,
        )
        .await
    }
}

#[async_trait]
impl CaptureStrategy for ScreenCaptureStrategy {
    fn scope(&self) -> CaptureScope {
        CaptureScope::FullScreen
    }

    async fn capture(&self, output_path: &Path) -> CaptureOutcome {
        run_screencapture(&self.utility_path, self.scope(), &["-x"], output_path).await
    }
}

pub struct ScreenshotCapture {
    strategies: Vec<Box<dyn CaptureStrategy>>,
    format: String,
    current_meeting_path: Option<PathBuf>,
    screenshot_count: u32,
}

impl ScreenshotCapture {
    /// Build the default strategy chain for this system.
    pub fn new(config: &ScreenshotConfig) -> Result<Self> {
        let utility_path = find_screencapture().ok_or_else(|| {
            crate::error::MeetingRecError::dependency(
                "Could not find the screencapture utility on this system",
            )
        })?;

        let strategies: Vec<Box<dyn CaptureStrategy>> = vec![
            Box::new(WindowCaptureStrategy {
                utility_path: utility_path.clone(),
            }),
            Box::new(ScreenCaptureStrategy { utility_path }),
        ];

        Ok(Self::with_strategies(strategies, config))
    }

    /// Build a capture with an explicit strategy chain. Used by tests.
    pub fn with_strategies(
        strategies: Vec<Box<dyn CaptureStrategy>>,
        config: &ScreenshotConfig,
    ) -> Self {
        Self {
            strategies,
            format: config.format.to_lowercase(),
            current_meeting_path: None,
            screenshot_count: 0,
        }
    }

    /// Point captures at a meeting directory and reset the counter.
    pub fn set_meeting_path(&mut self, meeting_path: &Path) -> Result<()> {
        std::fs::create_dir_all(meeting_path.join("screenshots"))?;
        self.current_meeting_path = Some(meeting_path.to_path_buf());
        self.screenshot_count = 0;
        Ok(())
    }

    pub fn clear_meeting_path(&mut self) {
        self.current_meeting_path = None;
    }

    /// Capture the active window into the current meeting's screenshots
    /// directory, falling through the strategy chain.
    pub async fn capture_active_window(&mut self) -> OpReport {
        let meeting_path = match &self.current_meeting_path {
            Some(path) => path.clone(),
            None => {
                return OpReport::failure_with_category(
                    ErrorCategory::Screenshot,
                    "No active meeting. Start recording first.",
                );
            }
        };

        let time_str = Local::now().format("%H-%M-%S").to_string();
        let filename = format!(
            "screenshot_{:05}_{}.{}",
            self.screenshot_count, time_str, self.format
        );
        let filepath = meeting_path.join("screenshots").join(filename);

        let mut failures: Vec<String> = Vec::new();

        for strategy in &self.strategies {
            match strategy.capture(&filepath).await {
                CaptureOutcome::Captured { scope } => {
                    self.screenshot_count += 1;
                    info!("Screenshot captured ({}): {:?}", scope.as_str(), filepath);

                    return OpReport::success("Screenshot captured")
                        .with_detail("filepath", filepath.display().to_string())
                        .with_detail("scope", scope.as_str())
                        .with_detail("time_str", time_str.replace('-', ":"));
                }
                CaptureOutcome::Failed { scope, reason } => {
                    warn!("Capture strategy {} failed: {}", scope.as_str(), reason);
                    failures.push(format!("{}: {reason}", scope.as_str()));
                }
            }
        }

        OpReport::failure_with_category(
            ErrorCategory::Screenshot,
            format!(
                "Failed to capture screen with all methods: {}",
                failures.join("; ")
            ),
        )
    }
}
