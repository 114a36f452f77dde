//! REST API server for MeetingRec.
//!
//! Provides HTTP endpoints for:
//! - Recording control (start, stop, toggle, screenshot, status)
//! - Recorded meeting listing

pub mod error;
pub mod routes;

use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::path::PathBuf;
use tower::ServiceBuilder;
use tracing::info;

use crate::workflow::WorkflowStatusHandle;

pub use routes::recording::{ApiCommand, RecordingState, WorkflowCommand};

pub const DEFAULT_PORT: u16 = 7332; // REC2 in numbers

pub struct ApiServer {
    port: u16,
    recording_state: RecordingState,
    meetings_state: routes::meetings::MeetingsState,
}

impl ApiServer {
    pub fn new(
        port: u16,
        tx: tokio::sync::mpsc::Sender<ApiCommand>,
        status: WorkflowStatusHandle,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            port,
            recording_state: RecordingState { tx, status },
            meetings_state: routes::meetings::MeetingsState { output_dir },
        }
    }

    /// Router with every endpoint mounted. Split from `start` so tests can
    /// drive it without binding a socket.
    pub fn router(self) -> Router {
        Router::new()
            .route("/", get(service_info))
            .route("/version", get(version))
            .merge(routes::recording::router(self.recording_state))
            .merge(routes::meetings::router(self.meetings_state))
            .layer(ServiceBuilder::new())
    }

    pub async fn start(self) -> Result<()> {
        let port = self.port;
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(&format!("127.0.0.1:{port}")).await?;

        info!("API server listening on http://127.0.0.1:{}", port);
        info!("Endpoints:");
        info!("  GET  /               - Service info");
        info!("  GET  /version        - Version info");
        info!("  POST /start          - Start recording");
        info!("  POST /stop           - Stop recording and process");
        info!("  POST /toggle         - Toggle recording");
        info!("  POST /screenshot     - Capture a screenshot");
        info!("  GET  /status         - Workflow status");
        info!("  GET  /meetings       - List recorded meetings");
        info!("  GET  /meetings/:name - Meeting details");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn service_info() -> Json<Value> {
    Json(json!({
        "service": "meetingrec",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "meetingrec"
    }))
}
