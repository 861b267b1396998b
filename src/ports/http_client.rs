use async_trait::async_trait;
use axum::body::Body as AxumBody;
use hyper::{Request, Response};
use thiserror::Error;

/// Transport-level failures talking to the ERP backend.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpClientError {
    /// Refused, reset, DNS failure, TLS failure or a truncated body
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Timeout error after {0} seconds")]
    Timeout(u64),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

pub type HttpClientResult<T> = Result<T, HttpClientError>;

/// Outbound side of the gateway. Swapped for an in-memory client in tests.
#[async_trait]
pub trait HttpClient: Send + Sync + 'static {
    /// Send an already rewritten request to the upstream.
    ///
    /// Exactly one attempt is made; the response is returned whatever its
    /// status, and only transport failures surface as errors.
    async fn send_request(&self, req: Request<AxumBody>) -> HttpClientResult<Response<AxumBody>>;
}
