//! Error types and error handling for the application
//!
//! This module defines custom error types that can be converted to HTTP responses.
//! All errors implement `IntoResponse` to provide consistent error formatting.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error types
///
/// Every failure mode in the pipeline maps to a distinct variant so callers
/// can tell an unreachable engine apart from a broken template or a failed
/// hosting upload.
#[derive(Error, Debug)]
pub enum AppError {
    /// The workflow engine could not be reached (DNS, connection, transport)
    #[error("Workflow engine unreachable: {0}")]
    EngineUnreachable(String),

    /// The engine answered, but with an error status or a malformed/incomplete body
    #[error("Workflow engine protocol error: {0}")]
    EngineProtocol(String),

    /// The engine did not report completion within the configured deadline
    #[error("Workflow engine did not complete within deadline: {0}")]
    EngineTimeout(String),

    /// The job-description template is missing, malformed, or missing a referenced node
    #[error("Invalid workflow template: {0}")]
    TemplateInvalid(String),

    /// The segmentation classifier could not be reached or returned garbage
    #[error("Segmentation classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    /// Upload to the public image host failed
    #[error("Hosting upload failed: {0}")]
    HostingUploadFailed(String),

    /// A source image URL could not be fetched or carries no usable filename
    #[error("Source image error: {0}")]
    SourceImage(String),

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::EngineUnreachable(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::EngineProtocol(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::EngineTimeout(_) => (StatusCode::GATEWAY_TIMEOUT, self.to_string()),
            AppError::TemplateInvalid(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::ClassifierUnavailable(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::HostingUploadFailed(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::SourceImage(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_failures_map_to_bad_gateway() {
        for err in [
            AppError::EngineUnreachable("boom".into()),
            AppError::EngineProtocol("boom".into()),
            AppError::ClassifierUnavailable("boom".into()),
            AppError::HostingUploadFailed("boom".into()),
        ] {
            let response = err.into_response();
            assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        }
    }

    #[test]
    fn deadline_maps_to_gateway_timeout() {
        let response = AppError::EngineTimeout("5 minutes".into()).into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn bad_source_url_maps_to_bad_request() {
        let response = AppError::SourceImage("no filename".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
