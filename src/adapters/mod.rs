pub mod deadline_body;
pub mod file_system;
pub mod http_client;
pub mod http_handler;
pub mod middleware;

/// Re-export commonly used types from adapters
pub use deadline_body::DeadlineBody;
pub use file_system::FileSystemAdapter;
pub use http_client::HttpClientAdapter;
pub use http_handler::{HttpHandler, router};
pub use middleware::*;
