//! Axum middleware attached to the gateway router.
//!
//! Both layers are stateless apart from the immutable CORS policy, so they add
//! no contention between concurrent requests.
use std::sync::Arc;

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;

use crate::tracing_setup::create_request_span;

const ALLOWED_METHODS: &str = "GET,HEAD,PUT,PATCH,POST,DELETE";

/// Cross-origin policy derived from the configured frontend origin.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_origin: Option<HeaderValue>,
}

impl CorsPolicy {
    /// `*` allows any origin. Because credentials are allowed, the caller's
    /// origin is echoed back rather than a literal `*`.
    pub fn new(frontend_url: &str) -> Self {
        let allowed_origin = match frontend_url {
            "*" => None,
            origin => match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!("Invalid FRONTEND_URL '{}': {}; allowing any origin", origin, e);
                    None
                }
            },
        };
        Self { allowed_origin }
    }

    fn allow_origin(&self, request_origin: Option<&HeaderValue>) -> HeaderValue {
        match (&self.allowed_origin, request_origin) {
            (Some(origin), _) => origin.clone(),
            (None, Some(origin)) => origin.clone(),
            (None, None) => HeaderValue::from_static("*"),
        }
    }

    fn apply(&self, headers: &mut HeaderMap, request_origin: Option<&HeaderValue>) {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            self.allow_origin(request_origin),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.append(header::VARY, HeaderValue::from_static("Origin"));
    }
}

fn is_preflight(req: &Request) -> bool {
    req.method() == Method::OPTIONS
        && req
            .headers()
            .contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
}

/// Answer preflights locally and decorate every other response with CORS headers.
pub async fn cors_middleware(req: Request, next: Next, policy: Arc<CorsPolicy>) -> Response {
    let origin = req.headers().get(header::ORIGIN).cloned();

    if is_preflight(&req) {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        let headers = response.headers_mut();
        policy.apply(headers, origin.as_ref());
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        if let Some(requested) = req.headers().get(header::ACCESS_CONTROL_REQUEST_HEADERS) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
            headers.append(
                header::VARY,
                HeaderValue::from_static("Access-Control-Request-Headers"),
            );
        }
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("0"));
        return response;
    }

    let mut response = next.run(req).await;
    policy.apply(response.headers_mut(), origin.as_ref());
    response
}

/// Generate a per‑request UUID and expose it via tracing plus `X-Request-ID`.
pub async fn request_id_middleware(req: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();

    let span = create_request_span(req.method().as_str(), req.uri().path(), &request_id);

    let mut response = next.run(req).instrument(span).await;

    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("X-Request-ID", header_value);
    }

    response
}

#[cfg(test)]
mod tests {
    use axum::{Router, middleware, routing::get};
    use tower::ServiceExt; // for oneshot

    use super::*;

    fn app(frontend_url: &str) -> Router {
        let policy = Arc::new(CorsPolicy::new(frontend_url));
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn(move |req, next| {
                let policy = policy.clone();
                async move { cors_middleware(req, next, policy).await }
            }))
    }

    #[tokio::test]
    async fn test_configured_origin_with_credentials() {
        let response = app("https://shop.example.com")
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(header::ORIGIN, "https://evil.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let headers = response.headers();

        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://shop.example.com"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }

    #[tokio::test]
    async fn test_wildcard_reflects_caller_origin() {
        let response = app("*")
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:5173"
        );
    }

    #[tokio::test]
    async fn test_preflight_answered_locally() {
        let response = app("https://shop.example.com")
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/")
                    .header(header::ORIGIN, "https://shop.example.com")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let headers = response.headers();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], ALLOWED_METHODS);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "content-type");
    }

    #[tokio::test]
    async fn test_request_id_middleware() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn(request_id_middleware));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let headers = response.headers();

        assert!(headers.contains_key("X-Request-ID"));

        let request_id = headers.get("X-Request-ID").unwrap().to_str().unwrap();
        assert!(uuid::Uuid::parse_str(request_id).is_ok());
    }
}
