use axum::{
    Json,
    body::Body as AxumBody,
    response::{IntoResponse, Response},
};
use hyper::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::{
    core::{body::BodyError, rewrite::RewriteError},
    ports::http_client::HttpClientError,
};

/// Error type for the request boundary. Every variant renders as a complete
/// JSON response; nothing escapes as a dropped connection.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HandlerError {
    #[error("{0}")]
    Upstream(#[from] HttpClientError),

    #[error("Upstream returned a malformed body: {0}")]
    MalformedUpstreamBody(String),

    #[error("{0}")]
    Rewrite(#[from] RewriteError),

    #[error("{0}")]
    Body(#[from] BodyError),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
}

impl HandlerError {
    pub fn status(&self) -> StatusCode {
        match self {
            HandlerError::Body(BodyError::TooLarge(_)) => StatusCode::PAYLOAD_TOO_LARGE,
            HandlerError::Body(_) => StatusCode::BAD_REQUEST,
            HandlerError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        let (details, timestamp) = match self {
            HandlerError::Upstream(HttpClientError::Timeout(_)) => (
                Some("Upstream did not respond in time"),
                Some(chrono::Utc::now().to_rfc3339()),
            ),
            HandlerError::Upstream(_) => (Some("Gateway could not communicate with the upstream"), None),
            _ => (None, None),
        };

        ErrorBody {
            error: self.to_string(),
            details,
            timestamp,
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response<AxumBody> {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "Request failed: {}", self);
        } else {
            tracing::warn!(status = status.as_u16(), "Request rejected: {}", self);
        }
        (status, Json(self.body())).into_response()
    }
}
