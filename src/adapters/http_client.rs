use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body as AxumBody;
use eyre::Result;
use hyper::{Request, Response, Version, header, header::HeaderValue};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use rustls_native_certs::load_native_certs;
use tracing::Instrument;

use crate::ports::http_client::{HttpClient, HttpClientError, HttpClientResult};

const GATEWAY_USER_AGENT: &str = concat!("erp-gateway/", env!("CARGO_PKG_VERSION"));
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upstream HTTP client adapter using Hyper with Rustls.
///
/// Responsibilities:
/// * Holds one pooled client shared by every request task
/// * Fills in `Host` from the target URI unless the rewrite already set it
/// * Adds a gateway `User-Agent` when the caller sent none
/// * Converts between Hyper body and Axum body types
///
/// One attempt per call. Retries are left to the caller.
pub struct HttpClientAdapter {
    client: Client<HttpsConnector<HttpConnector>, AxumBody>,
    connect_timeout: Duration,
}

impl HttpClientAdapter {
    /// Create a new HTTP client adapter with the default connect timeout.
    pub fn new() -> Result<Self> {
        Self::with_connect_timeout(DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a client whose TCP connect attempts give up after `connect_timeout`.
    pub fn with_connect_timeout(connect_timeout: Duration) -> Result<Self> {
        // Install default crypto provider for rustls if not already set
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let mut http_connector = HttpConnector::new();
        http_connector.enforce_http(false); // Allow HTTPS URLs
        http_connector.set_connect_timeout(Some(connect_timeout));

        let mut root_cert_store = rustls::RootCertStore::empty();
        let native_certs = load_native_certs();

        if !native_certs.certs.is_empty() {
            for cert in native_certs.certs {
                if root_cert_store.add(cert).is_err() {
                    tracing::warn!("Failed to add native certificate to rustls RootCertStore");
                }
            }
            tracing::debug!("Loaded {} native root certificates.", root_cert_store.len());
        }

        if !native_certs.errors.is_empty() {
            tracing::warn!(
                "Some native certificates failed to load: {:?}",
                native_certs.errors
            );
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_cert_store)
            .with_no_client_auth();

        let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector);

        let client = Client::builder(TokioExecutor::new()).build::<_, AxumBody>(https_connector);

        tracing::info!(
            "Created upstream HTTP client (connect timeout {}s)",
            connect_timeout.as_secs()
        );
        Ok(Self {
            client,
            connect_timeout,
        })
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Fill in headers every upstream request needs if the rewrite left them out.
    fn add_common_headers(req: &mut Request<AxumBody>) -> HttpClientResult<()> {
        let host_header = match req.uri().host() {
            Some(host) => match req.uri().port_u16() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            },
            None => {
                tracing::error!("Outgoing URI has no host: {}", req.uri());
                return Err(HttpClientError::InvalidRequest(
                    "Outgoing URI has no host".to_string(),
                ));
            }
        };

        let headers = req.headers_mut();
        if !headers.contains_key(header::HOST) {
            let value = HeaderValue::from_str(&host_header)
                .map_err(|e| HttpClientError::InvalidRequest(e.to_string()))?;
            headers.insert(header::HOST, value);
        }
        if !headers.contains_key(header::USER_AGENT) {
            headers.insert(
                header::USER_AGENT,
                HeaderValue::from_static(GATEWAY_USER_AGENT),
            );
        }
        Ok(())
    }
}

#[async_trait]
impl HttpClient for HttpClientAdapter {
    async fn send_request(
        &self,
        mut req: Request<AxumBody>,
    ) -> HttpClientResult<Response<AxumBody>> {
        Self::add_common_headers(&mut req)?;

        let (mut parts, axum_body) = req.into_parts();
        parts.version = Version::HTTP_11;

        let span = tracing::info_span!(
            "upstream_request",
            http.method = %parts.method,
            http.url = %parts.uri,
            http.status_code = tracing::field::Empty,
        );

        let method_for_error_log = parts.method.clone();
        let uri_for_error_log = parts.uri.clone();
        let outgoing_request = Request::from_parts(parts, axum_body);
        let client = self.client.clone();

        async move {
            tracing::debug!("Outgoing request headers: {:?}", outgoing_request.headers());

            match client.request(outgoing_request).await {
                Ok(response) => {
                    let status_code = response.status().as_u16();
                    tracing::Span::current().record("http.status_code", status_code);
                    tracing::info!(
                        "Upstream answered {} {} with {}",
                        method_for_error_log,
                        uri_for_error_log,
                        status_code
                    );

                    let (mut parts, hyper_body) = response.into_parts();

                    // The body is re-framed by the inbound server.
                    parts.headers.remove(header::TRANSFER_ENCODING);
                    parts.headers.remove(header::CONNECTION);

                    Ok(Response::from_parts(parts, AxumBody::new(hyper_body)))
                }
                Err(e) => {
                    tracing::Span::current().record("http.status_code", 599u16);

                    tracing::error!(
                        "Error making request to upstream ({} {}): {}",
                        method_for_error_log,
                        uri_for_error_log,
                        e
                    );

                    Err(HttpClientError::ConnectionError(format!(
                        "Request to {method_for_error_log} {uri_for_error_log} failed: {e}"
                    )))
                }
            }
        }
        .instrument(span)
        .await
    }
}
