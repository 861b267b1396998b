use axum::body::Body as AxumBody;
use http_body_util::BodyExt;
use hyper::{Request, Response};
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::ports::file_system::{FileSystem, FileSystemError};

/// File system adapter using tower-http ServeDir for the frontend bundle
#[derive(Debug, Default, Clone)]
pub struct FileSystemAdapter;

impl FileSystemAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for FileSystemAdapter {
    async fn serve_file(
        &self,
        root: &str,
        req: Request<AxumBody>,
    ) -> Result<Response<AxumBody>, FileSystemError> {
        if req.uri().path().split('/').any(|segment| segment == "..") {
            return Err(FileSystemError::InvalidPath(req.uri().path().to_string()));
        }

        // ServeDir rejects traversal itself and appends index.html to directories
        let serve_dir = ServeDir::new(root).append_index_html_on_directories(true);

        let response = serve_dir.oneshot(req).await.map_err(|e| {
            FileSystemError::IoError(std::io::Error::other(format!("ServeDir error: {e}")))
        })?;

        let (parts, tower_body) = response.into_parts();
        let axum_body = AxumBody::new(tower_body.map_err(|e| {
            tracing::error!("Error reading static file body: {}", e);
            axum::Error::new(e)
        }));

        Ok(Response::from_parts(parts, axum_body))
    }
}
