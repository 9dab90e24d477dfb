//! Request and response bodies of the HTTP API

use crate::error::Error;
use crate::graph::{KnowledgeNode, SourceArtifact};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

/// API error detail
#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.to_string(),
                message: message.into(),
            },
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

/// Error half of every handler result
#[derive(Debug)]
pub struct ApiFailure {
    pub status: StatusCode,
    pub body: ApiError,
}

impl ApiFailure {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ApiError::bad_request(message),
        }
    }
}

impl From<Error> for ApiFailure {
    fn from(err: Error) -> Self {
        let (status, body) = match &err {
            Error::Validation(msg) => (StatusCode::BAD_REQUEST, ApiError::bad_request(msg.clone())),
            Error::NotFound(what) => (
                StatusCode::NOT_FOUND,
                ApiError::not_found(format!("{} not found", what)),
            ),
            other => {
                tracing::error!(error = %other, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, ApiError::internal(other.to_string()))
            }
        };
        Self { status, body }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// POST /api/v1/ingest
#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub content: String,
}

/// Acknowledgement of fire-and-forget ingestion
#[derive(Debug, Serialize)]
pub struct IngestAccepted {
    pub accepted: bool,
}

/// POST /api/v1/sources
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSourceRequest {
    pub kind: String,
    pub mime_type: Option<String>,
    pub content: String,
    pub summary: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// POST /api/v1/media
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRequest {
    pub kind: String,
    pub mime_type: String,
    /// Base64-encoded payload
    pub data: String,
}

#[derive(Debug, Serialize)]
pub struct MediaResponse {
    pub recorded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<SourceArtifact>,
}

/// GET /api/v1/sources query
#[derive(Debug, Deserialize)]
pub struct SourceQuery {
    pub kind: Option<String>,
}

/// POST /api/v1/nodes
#[derive(Debug, Deserialize)]
pub struct CreateNodeRequest {
    pub label: String,
    pub category: String,
}

/// PUT /api/v1/nodes/:id/position
#[derive(Debug, Deserialize)]
pub struct MoveNodeRequest {
    pub x: f64,
    pub y: f64,
}

/// A node with the artifacts that mentioned it
#[derive(Debug, Serialize)]
pub struct NodeDetail {
    pub node: KnowledgeNode,
    pub sources: Vec<SourceArtifact>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let failure = ApiFailure::from(Error::Validation("bad mime".into()));
        assert_eq!(failure.status, StatusCode::BAD_REQUEST);
        assert_eq!(failure.body.error.code, "BAD_REQUEST");

        let failure = ApiFailure::from(Error::NotFound("node 1".into()));
        assert_eq!(failure.status, StatusCode::NOT_FOUND);
        assert_eq!(failure.body.error.message, "node 1 not found");

        let failure = ApiFailure::from(Error::Internal("boom".into()));
        assert_eq!(failure.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failure.body.error.code, "INTERNAL_ERROR");
    }

    #[test]
    fn test_record_request_camel_case() {
        let req: RecordSourceRequest = serde_json::from_str(
            r#"{"kind": "file", "mimeType": "application/pdf", "content": "x"}"#,
        )
        .unwrap();
        assert_eq!(req.mime_type.as_deref(), Some("application/pdf"));
        assert!(req.metadata.is_empty());
    }
}
