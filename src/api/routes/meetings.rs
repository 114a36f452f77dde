//! Recorded meeting listing endpoints.
//!
//! Provides HTTP endpoints for:
//! - Listing meetings (GET /meetings)
//! - Getting a specific meeting (GET /meetings/:name)

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::meetings;

use super::super::error::{ApiError, ApiResult};

/// Shared state for meeting routes.
#[derive(Clone)]
pub struct MeetingsState {
    pub output_dir: PathBuf,
}

pub fn router(state: MeetingsState) -> Router {
    Router::new()
        .route("/meetings", get(list_meetings))
        .route("/meetings/:name", get(get_meeting))
        .with_state(state)
}

async fn list_meetings(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<MeetingsState>,
) -> ApiResult<Json<Value>> {
    let limit: usize = params
        .get("limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(20);

    let output_dir = state.output_dir.clone();
    let listed = tokio::task::spawn_blocking(move || meetings::list_meetings(&output_dir))
        .await
        .map_err(|e| ApiError::internal(format!("Listing task failed: {e}")))??;

    let entries: Vec<&meetings::MeetingSummary> = listed.iter().take(limit).collect();
    Ok(Json(json!({ "meetings": entries })))
}

async fn get_meeting(
    Path(name): Path<String>,
    State(state): State<MeetingsState>,
) -> ApiResult<Json<Value>> {
    let listed = {
        let output_dir = state.output_dir.clone();
        tokio::task::spawn_blocking(move || meetings::list_meetings(&output_dir))
            .await
            .map_err(|e| ApiError::internal(format!("Listing task failed: {e}")))??
    };

    match listed.into_iter().find(|m| m.name == name) {
        Some(meeting) => Ok(Json(json!(meeting))),
        None => Err(ApiError::not_found(format!("Meeting not found: {name}"))),
    }
}
