//! Worker error type and its HTTP envelope mapping.
//!
//! The wire contract is `{ok:false, error}` for every failure. Only
//! up-front input validation earns a 400 and auth failures a 401;
//! automation-runtime errors (launch failure, navigation timeout, selector
//! not found) are reported with status 200 and `ok:false`, so callers must
//! inspect the `ok` field.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    /// Caller input rejected by up-front validation (missing required field).
    #[error("{0}")]
    InvalidRequest(String),

    /// Shared-secret header missing or mismatched.
    #[error("Unauthorized")]
    Unauthorized,

    /// Anything that went wrong while serving an otherwise valid request:
    /// browser launch, navigation, adapter I/O.
    #[error("{0}")]
    Failed(#[from] anyhow::Error),
}

impl WorkerError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(anyhow::anyhow!(msg.into()))
    }
}

impl IntoResponse for WorkerError {
    fn into_response(self) -> Response {
        let status = match &self {
            WorkerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            WorkerError::Unauthorized => StatusCode::UNAUTHORIZED,
            WorkerError::Failed(_) => StatusCode::OK,
        };
        let body = Json(json!({ "ok": false, "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_request_maps_to_400() {
        let response = WorkerError::invalid("Missing query").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unauthorized_maps_to_401() {
        let response = WorkerError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn runtime_failure_maps_to_200() {
        let response = WorkerError::failed("Navigation timeout").into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
