//! Inbound-to-outbound request transformation.
//!
//! [`rewrite_request`] is a pure function of the inbound request head, the
//! body and the gateway configuration. It performs no I/O, so every header
//! rule can be checked without a network stack.
use axum::body::Body as AxumBody;
use http::request::Parts;
use hyper::{
    HeaderMap, Request, Uri,
    header::{self, HeaderName, HeaderValue},
};
use thiserror::Error;

use crate::{
    config::{ExpectPolicy, GatewayConfig, SiteIdentityMode},
    core::body::{BodyError, ForwardBody},
};

/// Headers that describe a single connection and must never cross the proxy.
pub const HOP_BY_HOP_HEADERS: [HeaderName; 6] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::TE,
    header::TRAILER,
    header::UPGRADE,
];

/// Headers carrying browser context the upstream must not see.
pub const BROWSER_CONTEXT_HEADERS: [HeaderName; 3] =
    [header::ORIGIN, header::REFERER, header::COOKIE];

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RewriteError {
    #[error("Upstream URL is not configured")]
    UpstreamNotConfigured,

    #[error("API credentials are not configured")]
    CredentialsNotConfigured,

    #[error("Invalid upstream target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("Invalid value for header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("{0}")]
    Body(#[from] BodyError),

    #[error("Failed to build upstream request: {0}")]
    Build(String),
}

/// Whether the outbound request carries the gateway's credential pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credentialing {
    Authenticated,
    Anonymous,
}

/// Concatenate the upstream base with the inbound path and query verbatim.
pub fn target_uri(config: &GatewayConfig, inbound: &Uri) -> Result<Uri, RewriteError> {
    let base = config
        .erp_url
        .as_deref()
        .ok_or(RewriteError::UpstreamNotConfigured)?;
    let path_and_query = inbound.path_and_query().map_or("/", |pq| pq.as_str());
    let target = format!("{base}{path_and_query}");

    target
        .parse::<Uri>()
        .map_err(|e| RewriteError::InvalidTarget {
            reason: e.to_string(),
            target,
        })
}

/// Apply the header policy to a copy of the inbound headers.
pub fn rewrite_headers(
    inbound: &HeaderMap,
    config: &GatewayConfig,
    credentialing: Credentialing,
) -> Result<HeaderMap, RewriteError> {
    let mut headers = inbound.clone();

    for name in connection_tokens(inbound) {
        headers.remove(&name);
    }
    for name in HOP_BY_HOP_HEADERS.iter().chain(BROWSER_CONTEXT_HEADERS.iter()) {
        headers.remove(name);
    }
    // Framing is recomputed for the outbound body.
    headers.remove(header::TRANSFER_ENCODING);
    headers.remove(header::HOST);

    match credentialing {
        Credentialing::Authenticated => {
            let credentials = config
                .credentials()
                .ok_or(RewriteError::CredentialsNotConfigured)?;
            let value = header_value(header::AUTHORIZATION.as_str(), &credentials.header_value())?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Credentialing::Anonymous => {
            headers.remove(header::AUTHORIZATION);
        }
    }

    match config.site_identity {
        SiteIdentityMode::Inject => {
            let site_header = HeaderName::from_bytes(config.site_header.as_bytes()).map_err(|e| {
                RewriteError::InvalidHeader {
                    name: config.site_header.clone(),
                    reason: e.to_string(),
                }
            })?;
            let site = header_value(&config.site_header, &config.site_name)?;
            headers.insert(site_header, site.clone());
            headers.insert(header::HOST, site);
        }
        SiteIdentityMode::Upstream => {}
    }

    match config.expect_header {
        ExpectPolicy::Strip => {
            headers.remove(header::EXPECT);
        }
        ExpectPolicy::Empty => {
            headers.insert(header::EXPECT, HeaderValue::from_static(""));
        }
    }

    Ok(headers)
}

/// Build the outbound request for an inbound request head and body.
pub fn rewrite_request(
    parts: &Parts,
    body: ForwardBody,
    config: &GatewayConfig,
    credentialing: Credentialing,
) -> Result<Request<AxumBody>, RewriteError> {
    let uri = target_uri(config, &parts.uri)?;
    let mut headers = rewrite_headers(&parts.headers, config, credentialing)?;
    let body = body.into_outbound(&mut headers)?;

    let mut request = Request::builder()
        .method(parts.method.clone())
        .uri(uri)
        .body(body)
        .map_err(|e| RewriteError::Build(e.to_string()))?;
    *request.headers_mut() = headers;

    Ok(request)
}

/// Headers the sender declared hop-by-hop by listing them in `Connection`.
fn connection_tokens(headers: &HeaderMap) -> Vec<HeaderName> {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect()
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, RewriteError> {
    HeaderValue::from_str(value).map_err(|e| RewriteError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}
