//! ERP Gateway - an authenticating reverse proxy in front of an ERP REST API.
//!
//! Browser code talks to the gateway; the gateway talks to the ERP backend
//! with a server-held API key pair the browser never sees. The crate follows a
//! **hexagonal architecture**: `ports` define the traits, `adapters` implement
//! them on top of hyper/axum, and `core` holds the pure request rewriting.
//!
//! # Surfaces
//! - `/api/*` forwarded with credentials, answer re-emitted as JSON
//! - `/files/*` forwarded anonymously, answer relayed byte-for-byte
//! - `/health` reports which settings are present, never their values
//! - `/test-erpnext` optional upstream probe
//! - everything else served from the frontend bundle directory
//!
//! # Quick Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use erp_gateway::{FileSystemAdapter, GatewayService, HttpClientAdapter, HttpHandler, router};
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let config = erp_gateway::config::load_config(None)?;
//! let gateway = Arc::new(GatewayService::new(Arc::new(config)));
//! let handler = HttpHandler::new(
//!     gateway,
//!     Arc::new(HttpClientAdapter::new()?),
//!     Arc::new(FileSystemAdapter::new()),
//! );
//! let app = router(Arc::new(handler));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(()) }
//! ```
//!
//! # Error Handling
//! Startup paths return `eyre::Result<T>`. Request paths use the `thiserror`
//! enums in `ports`, rendered as `{"error": ...}` JSON at the handler boundary.
pub mod config;
pub mod ports;
pub mod tracing_setup;
pub mod utils;

pub mod adapters;
pub mod core;

// Re-export the specific types needed by the binary crate
pub use crate::{
    adapters::{FileSystemAdapter, HttpClientAdapter, HttpHandler, router},
    core::GatewayService,
    ports::http_client::HttpClient,
    utils::shutdown_signal,
};
