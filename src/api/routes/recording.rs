//! Recording control endpoints.
//!
//! Provides HTTP endpoints for:
//! - Starting a meeting recording (POST /start)
//! - Stopping a meeting recording (POST /stop)
//! - Toggling recording (POST /toggle)
//! - Capturing a screenshot (POST /screenshot)
//! - Getting workflow status (GET /status)

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

use crate::error::OpReport;
use crate::workflow::{WorkflowPhase, WorkflowStatusHandle};

use super::super::error::{ApiError, ApiResult, ReportResponse};

/// A workflow operation requested over the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowCommand {
    Start,
    Stop,
    Toggle,
    Screenshot,
}

impl WorkflowCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Toggle => "toggle",
            Self::Screenshot => "screenshot",
        }
    }
}

/// Command envelope sent to the workflow loop. The reply channel carries the
/// structured result back to the HTTP handler.
pub struct ApiCommand {
    pub command: WorkflowCommand,
    pub reply: oneshot::Sender<OpReport>,
}

#[derive(Clone)]
pub struct RecordingState {
    pub tx: mpsc::Sender<ApiCommand>,
    pub status: WorkflowStatusHandle,
}

pub fn router(state: RecordingState) -> Router {
    Router::new()
        .route("/start", post(start_recording))
        .route("/stop", post(stop_recording))
        .route("/toggle", post(toggle_recording))
        .route("/screenshot", post(capture_screenshot))
        .route("/status", get(workflow_status))
        .with_state(state)
}

/// Send a command to the workflow loop and wait for its report.
async fn dispatch(state: &RecordingState, command: WorkflowCommand) -> ApiResult<OpReport> {
    info!("{} command received via API", command.as_str());

    let (reply, response) = oneshot::channel();
    state
        .tx
        .send(ApiCommand { command, reply })
        .await
        .map_err(|e| {
            error!("Failed to send {} command: {}", command.as_str(), e);
            ApiError::internal("Workflow is not running")
        })?;

    response
        .await
        .map_err(|_| ApiError::internal("Workflow dropped the command"))
}

async fn start_recording(State(state): State<RecordingState>) -> ApiResult<ReportResponse> {
    Ok(ReportResponse(dispatch(&state, WorkflowCommand::Start).await?))
}

async fn stop_recording(State(state): State<RecordingState>) -> ApiResult<ReportResponse> {
    Ok(ReportResponse(dispatch(&state, WorkflowCommand::Stop).await?))
}

async fn toggle_recording(State(state): State<RecordingState>) -> ApiResult<ReportResponse> {
    Ok(ReportResponse(dispatch(&state, WorkflowCommand::Toggle).await?))
}

async fn capture_screenshot(State(state): State<RecordingState>) -> ApiResult<ReportResponse> {
    Ok(ReportResponse(dispatch(&state, WorkflowCommand::Screenshot).await?))
}

async fn workflow_status(State(state): State<RecordingState>) -> Json<Value> {
    let status = state.status.get().await;

    Json(json!({
        "recording": status.phase == WorkflowPhase::Recording,
        "phase": status.phase.as_str(),
        "meeting_path": status
            .meeting_path
            .as_ref()
            .map(|p| p.to_string_lossy().to_string()),
        "duration_seconds": status.duration_seconds(),
        "screenshot_count": status.screenshot_count,
        "last_error": status.last_error,
    }))
}
