//! Workflow status types and shared state handle.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Phase of the meeting workflow lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowPhase {
    Idle,
    Recording,
    Stopping,
    Processing,
    Completed,
    Error,
}

impl WorkflowPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Stopping => "stopping",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

/// Current workflow state, readable by API handlers.
#[derive(Debug, Clone)]
pub struct WorkflowState {
    pub phase: WorkflowPhase,
    pub meeting_path: Option<PathBuf>,
    pub started_at: Option<chrono::DateTime<chrono::Local>>,
    pub screenshot_count: u32,
    pub last_error: Option<String>,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self {
            phase: WorkflowPhase::Idle,
            meeting_path: None,
            started_at: None,
            screenshot_count: 0,
            last_error: None,
        }
    }
}

impl WorkflowState {
    /// Duration since recording started, in seconds.
    pub fn duration_seconds(&self) -> Option<u64> {
        self.started_at.map(|started| {
            let elapsed = chrono::Local::now() - started;
            elapsed.num_seconds().max(0) as u64
        })
    }
}

/// Thread-safe handle for sharing workflow state between the machine and
/// API handlers.
#[derive(Clone, Default)]
pub struct WorkflowStatusHandle {
    inner: Arc<Mutex<WorkflowState>>,
}

impl WorkflowStatusHandle {
    pub async fn get(&self) -> WorkflowState {
        self.inner.lock().await.clone()
    }

    pub async fn start_recording(&self, meeting_path: PathBuf) {
        let mut state = self.inner.lock().await;
        state.phase = WorkflowPhase::Recording;
        state.meeting_path = Some(meeting_path);
        state.started_at = Some(chrono::Local::now());
        state.screenshot_count = 0;
        state.last_error = None;
    }

    pub async fn record_screenshot(&self) -> u32 {
        let mut state = self.inner.lock().await;
        state.screenshot_count += 1;
        state.screenshot_count
    }

    pub async fn set_phase(&self, phase: WorkflowPhase) {
        let mut state = self.inner.lock().await;
        state.phase = phase;
    }

    pub async fn set_error(&self, error: String) {
        let mut state = self.inner.lock().await;
        state.phase = WorkflowPhase::Error;
        state.last_error = Some(error);
    }

    /// Mark the given meeting completed. Returns false without touching the
    /// state when another meeting owns it by now; background processing for
    /// an old meeting must not clobber a newer recording.
    pub async fn complete_meeting(&self, meeting_path: &Path) -> bool {
        let mut state = self.inner.lock().await;
        if state.meeting_path.as_deref() != Some(meeting_path) {
            return false;
        }
        state.phase = WorkflowPhase::Completed;
        state.started_at = None;
        true
    }

    /// Error counterpart of [`complete_meeting`](Self::complete_meeting),
    /// with the same ownership check.
    pub async fn fail_meeting(&self, meeting_path: &Path, error: String) -> bool {
        let mut state = self.inner.lock().await;
        if state.meeting_path.as_deref() != Some(meeting_path) {
            return false;
        }
        state.phase = WorkflowPhase::Error;
        state.last_error = Some(error);
        true
    }

    pub async fn reset(&self) {
        let mut state = self.inner.lock().await;
        *state = WorkflowState::default();
    }
}
