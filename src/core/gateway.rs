//! Core gateway orchestration service.
//!
//! The `GatewayService` owns the immutable configuration and answers the
//! questions the HTTP adapter asks per request:
//! * Which surface does a path belong to
//! * Whether a call is bounded by the retrieval timeout
//! * What the outbound request for an inbound one looks like
//!
//! It performs no I/O, so it stays fast and easily testable in isolation.
use std::{sync::Arc, time::Duration};

use axum::body::Body as AxumBody;
use http::request::Parts;
use hyper::{HeaderMap, Method, Request, Uri, header, header::HeaderValue};

use crate::{
    config::GatewayConfig,
    core::{
        body::ForwardBody,
        rewrite::{Credentialing, RewriteError, rewrite_headers, rewrite_request, target_uri},
    },
};

pub const API_PREFIX: &str = "/api/";
pub const FILES_PREFIX: &str = "/files/";
pub const HEALTH_PATH: &str = "/health";
pub const PROBE_PATH: &str = "/test-erpnext";

/// Upstream endpoint used by the diagnostic probe.
pub const PROBE_TARGET: &str = "/api/method/frappe.auth.get_logged_user";

/// The surface an inbound path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Health,
    Probe,
    Api,
    Files,
    Frontend,
}

impl RouteKind {
    /// Credential policy for forwarded surfaces.
    pub fn credentialing(self) -> Credentialing {
        match self {
            RouteKind::Files => Credentialing::Anonymous,
            _ => Credentialing::Authenticated,
        }
    }
}

/// Central orchestrator shared by all request tasks. Cheap to clone.
#[derive(Clone)]
pub struct GatewayService {
    config: Arc<GatewayConfig>,
}

impl GatewayService {
    pub fn new(config: Arc<GatewayConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Map a request path to the surface that serves it.
    pub fn classify(&self, path: &str) -> RouteKind {
        match path {
            HEALTH_PATH => RouteKind::Health,
            PROBE_PATH if self.config.diagnostics => RouteKind::Probe,
            _ if path.starts_with(API_PREFIX) => RouteKind::Api,
            _ if path.starts_with(FILES_PREFIX) => RouteKind::Files,
            _ => RouteKind::Frontend,
        }
    }

    /// Retrieval calls are bounded; everything else waits on the transport.
    pub fn deadline_for(&self, method: &Method) -> Option<Duration> {
        if method == Method::GET || method == Method::HEAD {
            Some(self.config.upstream_timeout())
        } else {
            None
        }
    }

    /// Build the outbound request for a forwarded surface.
    pub fn outbound_request(
        &self,
        parts: &Parts,
        body: ForwardBody,
        kind: RouteKind,
    ) -> Result<Request<AxumBody>, RewriteError> {
        rewrite_request(parts, body, &self.config, kind.credentialing())
    }

    /// Build the fixed authenticated request issued by the diagnostic probe.
    pub fn probe_request(&self) -> Result<Request<AxumBody>, RewriteError> {
        let uri = target_uri(&self.config, &Uri::from_static(PROBE_TARGET))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        let headers = rewrite_headers(&headers, &self.config, Credentialing::Authenticated)?;

        let mut request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(AxumBody::empty())
            .map_err(|e| RewriteError::Build(e.to_string()))?;
        *request.headers_mut() = headers;
        Ok(request)
    }
}
