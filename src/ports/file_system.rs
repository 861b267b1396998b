use std::future::Future;

use axum::body::Body as AxumBody;
use hyper::{Request, Response};
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FileSystemError {
    #[error("Failed to read bundle file: {0}")]
    IoError(#[from] std::io::Error),

    /// The request path tried to leave the bundle directory.
    #[error("Path escapes the bundle directory: {0}")]
    InvalidPath(String),
}

pub type FileSystemResult<T> = Result<T, FileSystemError>;

/// Serves the frontend bundle for paths no forwarded surface claims.
pub trait FileSystem: Send + Sync + 'static {
    /// Resolve the request path under `root`. A missing file is a normal
    /// 404 response, not an error.
    fn serve_file(
        &self,
        root: &str,
        req: Request<AxumBody>,
    ) -> impl Future<Output = FileSystemResult<Response<AxumBody>>> + Send;
}
