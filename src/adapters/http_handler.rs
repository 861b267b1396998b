use std::{future::Future, sync::Arc, time::Duration};

use axum::{
    Json, Router,
    body::Body as AxumBody,
    extract::Request as AxumRequest,
    http::{StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::any,
};
use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::{Method, Request, Response};
use serde_json::{Value, json};
use tokio::time::Instant;
use tower_http::trace::TraceLayer;

use crate::{
    adapters::{
        FileSystemAdapter,
        deadline_body::DeadlineBody,
        middleware::{CorsPolicy, cors_middleware, request_id_middleware},
    },
    config::{BodyMode, ResponseRelay},
    core::{ForwardBody, GatewayService, HealthReport, RouteKind},
    ports::{
        file_system::FileSystem,
        http_client::{HttpClient, HttpClientError},
        http_server::HandlerError,
    },
};

/// Number of characters of the upstream reply echoed by the probe.
const PROBE_SNIPPET_CHARS: usize = 200;

type HandlerResult = Result<Response<AxumBody>, HandlerError>;

/// HTTP handler for the gateway
#[derive(Clone)]
pub struct HttpHandler {
    gateway_service: Arc<GatewayService>,
    http_client: Arc<dyn HttpClient>,
    file_system: Arc<FileSystemAdapter>,
}

impl HttpHandler {
    pub fn new(
        gateway_service: Arc<GatewayService>,
        http_client: Arc<dyn HttpClient>,
        file_system: Arc<FileSystemAdapter>,
    ) -> Self {
        Self {
            gateway_service,
            http_client,
            file_system,
        }
    }

    /// Main request handler. Always yields a complete response; failures are
    /// rendered at this boundary.
    pub async fn handle_request(&self, req: Request<AxumBody>) -> Response<AxumBody> {
        let kind = self.gateway_service.classify(req.uri().path());

        tracing::info!("Handling {} request to {} ({:?})", req.method(), req.uri().path(), kind);

        let result = match kind {
            RouteKind::Health => self.handle_health_check(),
            RouteKind::Probe => Ok(self.handle_probe().await),
            RouteKind::Api => self.handle_api_request(req).await,
            RouteKind::Files => self.handle_file_request(req).await,
            RouteKind::Frontend => self.handle_static_file(req).await,
        };

        result.unwrap_or_else(IntoResponse::into_response)
    }

    fn handle_health_check(&self) -> HandlerResult {
        let report = HealthReport::for_config(self.gateway_service.config());
        Ok((StatusCode::OK, Json(report)).into_response())
    }

    /// Forward an API call with credentials and relay the upstream answer.
    async fn handle_api_request(&self, req: Request<AxumBody>) -> HandlerResult {
        let config = self.gateway_service.config();
        let (parts, body) = req.into_parts();

        let forward_body = match config.body_mode {
            BodyMode::Streaming => ForwardBody::Streaming(body),
            BodyMode::Buffered => {
                let bytes = ForwardBody::buffer(body, config.max_body_bytes).await?;
                ForwardBody::decode(bytes, &parts.headers)?
            }
        };

        let outbound =
            self.gateway_service
                .outbound_request(&parts, forward_body, RouteKind::Api)?;
        let deadline = self.gateway_service.deadline_for(&parts.method);

        match config.api_response {
            ResponseRelay::Json => bounded(deadline, self.exchange_json(outbound)).await,
            ResponseRelay::Passthrough => self.exchange(outbound, deadline).await,
        }
    }

    /// Forward a public file request without credentials; the response is
    /// streamed back with its headers untouched.
    async fn handle_file_request(&self, req: Request<AxumBody>) -> HandlerResult {
        if req.method() != Method::GET && req.method() != Method::HEAD {
            return Err(HandlerError::MethodNotAllowed(req.method().to_string()));
        }

        let (parts, _body) = req.into_parts();
        let outbound = self.gateway_service.outbound_request(
            &parts,
            ForwardBody::Raw(Bytes::new()),
            RouteKind::Files,
        )?;
        let deadline = self.gateway_service.deadline_for(&parts.method);

        self.exchange(outbound, deadline).await
    }

    /// Issue the fixed authenticated probe and report what came back.
    async fn handle_probe(&self) -> Response<AxumBody> {
        let erp_url = self.gateway_service.config().erp_url.clone();
        let deadline = Some(self.gateway_service.config().upstream_timeout());

        let outcome: Result<(StatusCode, String), HandlerError> = async {
            let request = self.gateway_service.probe_request()?;
            bounded(deadline, async {
                let response = self.http_client.send_request(request).await?;
                let status = response.status();
                let bytes = read_upstream_body(response.into_body()).await?;
                Ok::<_, HandlerError>((status, String::from_utf8_lossy(&bytes).into_owned()))
            })
            .await
        }
        .await;

        match outcome {
            Ok((status, text)) => {
                tracing::info!("Upstream probe answered {}", status);
                let snippet: String = text.chars().take(PROBE_SNIPPET_CHARS).collect();
                Json(json!({
                    "status": status.as_u16(),
                    "erpUrl": erp_url,
                    "response": snippet,
                }))
                .into_response()
            }
            Err(e) => {
                tracing::error!("Upstream probe failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": e.to_string(),
                        "erpUrl": erp_url,
                    })),
                )
                    .into_response()
            }
        }
    }

    /// Serve the frontend bundle for every path no other surface claims.
    async fn handle_static_file(&self, req: Request<AxumBody>) -> HandlerResult {
        let root = &self.gateway_service.config().static_dir;
        let path = req.uri().path().to_string();

        match self.file_system.serve_file(root, req).await {
            Ok(response) => Ok(response),
            Err(e) => {
                tracing::warn!("Failed to serve static file {}: {}", path, e);
                Ok((StatusCode::NOT_FOUND, "File not found").into_response())
            }
        }
    }

    /// Single upstream attempt, response passed through as is. The deadline
    /// covers the streamed body as well as the response head.
    async fn exchange(
        &self,
        outbound: Request<AxumBody>,
        deadline: Option<Duration>,
    ) -> HandlerResult {
        let expires_at = deadline.map(|limit| (Instant::now() + limit, limit));

        let response = bounded(deadline, async {
            Ok::<_, HandlerError>(self.http_client.send_request(outbound).await?)
        })
        .await?;

        Ok(match expires_at {
            Some((at, limit)) => {
                response.map(|body| AxumBody::new(DeadlineBody::new(body, at, limit)))
            }
            None => response,
        })
    }

    /// Single upstream attempt, body re-emitted as JSON with the upstream status.
    async fn exchange_json(&self, outbound: Request<AxumBody>) -> HandlerResult {
        let response = self.http_client.send_request(outbound).await?;
        let status = response.status();
        let bytes = read_upstream_body(response.into_body()).await?;
        json_relay(status, &bytes)
    }
}

/// Assemble the gateway router around a handler.
pub fn router(handler: Arc<HttpHandler>) -> Router {
    let policy = Arc::new(CorsPolicy::new(
        &handler.gateway_service.config().frontend_url,
    ));

    let make_request_route = |handler: Arc<HttpHandler>| {
        any(move |req: AxumRequest| {
            let handler = handler.clone();
            async move { handler.handle_request(req).await }
        })
    };

    Router::new()
        .route("/{*path}", make_request_route(handler.clone()))
        .route("/", make_request_route(handler))
        .layer(middleware::from_fn(move |req, next| {
            let policy = policy.clone();
            async move { cors_middleware(req, next, policy).await }
        }))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Bound a future by the retrieval deadline, if one applies.
async fn bounded<T, F>(deadline: Option<Duration>, fut: F) -> Result<T, HandlerError>
where
    F: Future<Output = Result<T, HandlerError>>,
{
    match deadline {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(HttpClientError::Timeout(limit.as_secs()).into()),
        },
        None => fut.await,
    }
}

async fn read_upstream_body(body: AxumBody) -> Result<Bytes, HandlerError> {
    let collected = body.collect().await.map_err(|e| {
        HttpClientError::ConnectionError(format!("Failed to read upstream body: {e}"))
    })?;
    Ok(collected.to_bytes())
}

/// Re-emit an upstream body as JSON under the upstream status. An empty body
/// stays empty; anything that is not JSON is a malformed upstream reply.
fn json_relay(status: StatusCode, bytes: &Bytes) -> HandlerResult {
    if bytes.is_empty() {
        let mut response = Response::new(AxumBody::empty());
        *response.status_mut() = status;
        return Ok(response);
    }

    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| HandlerError::MalformedUpstreamBody(e.to_string()))?;
    let mut response = (status, Json(value)).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json; charset=utf-8"),
    );
    Ok(response)
}
