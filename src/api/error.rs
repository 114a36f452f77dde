//! JSON error responses for the control API.
//!
//! Handlers either fail before the workflow gets involved ([`ApiError`]) or
//! return an operation report; [`ReportResponse`] maps a failed report's
//! error category onto an HTTP status so callers can branch on the status
//! line without parsing the body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::{ErrorCategory, OpReport};

/// Error raised by a handler itself (channel down, unknown meeting).
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": true,
            "message": self.message,
        }));
        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(format!("{err:#}"))
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// A workflow operation result as an HTTP response. The report is the body
/// either way; the status line reflects the outcome.
pub struct ReportResponse(pub OpReport);

impl ReportResponse {
    fn status(&self) -> StatusCode {
        if self.0.success {
            return StatusCode::OK;
        }
        match self.0.category {
            // Wrong-state rejections: recording already running, nothing to
            // stop, screenshot without an active meeting.
            Some(ErrorCategory::Recording | ErrorCategory::Screenshot) => StatusCode::CONFLICT,
            Some(ErrorCategory::Network | ErrorCategory::Api) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ReportResponse {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(self.0)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_report_is_ok() {
        let response = ReportResponse(OpReport::success("Recording started")).into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_failed_report_status_follows_category() {
        let conflict = ReportResponse(OpReport::failure_with_category(
            ErrorCategory::Recording,
            "Recording already in progress",
        ));
        assert_eq!(conflict.into_response().status(), StatusCode::CONFLICT);

        let upstream = ReportResponse(OpReport::failure_with_category(
            ErrorCategory::Network,
            "Connection refused",
        ));
        assert_eq!(upstream.into_response().status(), StatusCode::BAD_GATEWAY);

        let unknown = ReportResponse(OpReport::failure("something odd"));
        assert_eq!(
            unknown.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_api_error_statuses() {
        assert_eq!(
            ApiError::not_found("no such meeting").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::internal("boom").into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
