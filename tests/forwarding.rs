// End-to-end forwarding through the real upstream client against a local backend
#[cfg(test)]
mod test {
    use std::{
        net::SocketAddr,
        sync::Arc,
        time::{Duration, Instant},
    };

    use axum::{
        Json, Router,
        body::{Body, Bytes},
        http::{HeaderMap, Method, Request, Response, StatusCode, Uri, header},
        response::Html,
        routing::{any, get, post},
    };
    use erp_gateway::{
        FileSystemAdapter, GatewayService, HttpClientAdapter, HttpHandler,
        config::{GatewayConfig, ResponseRelay},
        router,
    };
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };
    use tower::ServiceExt;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n', 0x00, 0xff, 0x10];

    fn headers_json(headers: &HeaderMap) -> Value {
        let fields = headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    Value::String(value.to_str().unwrap_or_default().to_string()),
                )
            })
            .collect();
        Value::Object(fields)
    }

    async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Value> {
        Json(json!({
            "method": method.as_str(),
            "query": uri.query(),
            "headers": headers_json(&headers),
            "body": String::from_utf8_lossy(&body),
        }))
    }

    async fn create_lead(headers: HeaderMap, Json(lead): Json<Value>) -> (StatusCode, Json<Value>) {
        (
            StatusCode::CREATED,
            Json(json!({
                "data": { "name": "CRM-LEAD-0001", "lead_name": lead["lead_name"] },
                "headers": headers_json(&headers),
            })),
        )
    }

    async fn logo(headers: HeaderMap) -> Response<Body> {
        let saw_auth = if headers.contains_key(header::AUTHORIZATION) {
            "yes"
        } else {
            "no"
        };
        Response::builder()
            .header(header::CONTENT_TYPE, "image/png")
            .header(header::CACHE_CONTROL, "max-age=3600")
            .header("x-saw-auth", saw_auth)
            .body(Body::from(PNG))
            .unwrap()
    }

    async fn start_upstream() -> SocketAddr {
        let app = Router::new()
            .route("/api/resource/Lead", post(create_lead))
            .route("/api/echo", any(echo))
            .route(
                "/api/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Json(json!({}))
                }),
            )
            .route("/api/login-page", get(|| async { Html("<h1>Login</h1>") }))
            .route("/files/logo.png", get(logo));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    /// Answers every request with headers promising 100 bytes, sends 10, then stalls.
    async fn start_stalling_upstream() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut request = [0u8; 4096];
                    let _ = socket.read(&mut request).await;
                    let _ = socket
                        .write_all(
                            b"HTTP/1.1 200 OK\r\n\
                              Content-Type: application/octet-stream\r\n\
                              Content-Length: 100\r\n\r\n\
                              0123456789",
                        )
                        .await;
                    tokio::time::sleep(Duration::from_secs(30)).await;
                });
            }
        });
        addr
    }

    fn config_for(upstream: &str) -> GatewayConfig {
        GatewayConfig {
            erp_url: Some(upstream.to_string()),
            api_key: Some("key123".to_string()),
            api_secret: Some("secret456".to_string()),
            upstream_timeout_secs: 1,
            ..GatewayConfig::default()
        }
    }

    fn gateway(config: GatewayConfig) -> Router {
        let handler = HttpHandler::new(
            Arc::new(GatewayService::new(Arc::new(config))),
            Arc::new(HttpClientAdapter::new().unwrap()),
            Arc::new(FileSystemAdapter::new()),
        );
        router(Arc::new(handler))
    }

    async fn body_bytes(response: Response<Body>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    async fn body_json(response: Response<Body>) -> Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_lead_creation_is_authenticated_and_relayed() {
        let upstream = start_upstream().await;
        let app = gateway(config_for(&format!("http://{upstream}")));
        let payload = r#"{ "lead_name": "Ada" }"#;

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/resource/Lead")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::ORIGIN, "https://shop.example.com")
                    .header(header::REFERER, "https://shop.example.com/contact")
                    .header(header::COOKIE, "sid=browser")
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://shop.example.com"
        );
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
            "true"
        );

        let body = body_json(response).await;
        assert_eq!(body["data"]["name"], "CRM-LEAD-0001");
        assert_eq!(body["data"]["lead_name"], "Ada");

        let seen = &body["headers"];
        assert_eq!(seen["authorization"], "token key123:secret456");
        assert_eq!(seen["x-frappe-site-name"], "frontend");
        assert_eq!(seen["host"], "frontend");
        assert_eq!(seen["content-length"], r#"{"lead_name":"Ada"}"#.len().to_string());
        assert!(seen["user-agent"].as_str().unwrap().starts_with("erp-gateway/"));
        for stripped in ["origin", "referer", "cookie", "expect"] {
            assert!(seen.get(stripped).is_none(), "{stripped} reached the upstream");
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_query_string_is_forwarded_verbatim() {
        let upstream = start_upstream().await;
        let app = gateway(config_for(&format!("http://{upstream}")));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/echo?filters=%5B%5B%22status%22%2C%22%3D%22%2C%22Open%22%5D%5D&limit_page_length=5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["method"], "GET");
        assert_eq!(
            body["query"],
            "filters=%5B%5B%22status%22%2C%22%3D%22%2C%22Open%22%5D%5D&limit_page_length=5"
        );
        assert_eq!(body["body"], "");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_form_body_is_forwarded_as_json() {
        let upstream = start_upstream().await;
        let app = gateway(config_for(&format!("http://{upstream}")));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/echo")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("subject=Hello+there&priority=High"))
                    .unwrap(),
            )
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["headers"]["content-type"], "application/json");
        let forwarded: Value = serde_json::from_str(body["body"].as_str().unwrap()).unwrap();
        assert_eq!(forwarded, json!({ "subject": "Hello there", "priority": "High" }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_files_are_relayed_anonymously_byte_for_byte() {
        let upstream = start_upstream().await;
        let app = gateway(config_for(&format!("http://{upstream}")));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/files/logo.png")
                    .header(header::AUTHORIZATION, "Bearer browser-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(response.headers()[header::CACHE_CONTROL], "max-age=3600");
        assert_eq!(response.headers()["x-saw-auth"], "no");
        assert_eq!(body_bytes(response).await.as_ref(), PNG);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_slow_retrieval_times_out_with_500() {
        let upstream = start_upstream().await;
        let app = gateway(config_for(&format!("http://{upstream}")));

        let started = Instant::now();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/slow")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(body["error"].is_string());
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_non_json_api_reply_is_500() {
        let upstream = start_upstream().await;
        let app = gateway(config_for(&format!("http://{upstream}")));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/login-page")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unreachable_upstream_is_500() {
        let app = gateway(config_for("http://127.0.0.1:1"));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/resource/Lead")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"lead_name":"Ada"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_health_never_reveals_secrets() {
        let app = gateway(config_for("http://127.0.0.1:1"));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let raw = body_bytes(response).await;
        let text = String::from_utf8_lossy(&raw);
        assert!(!text.contains("key123"));
        assert!(!text.contains("secret456"));

        let body: Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["config"]["erpUrl"], "configured");
        assert_eq!(body["config"]["apiKey"], "configured");
        assert_eq!(body["config"]["apiSecret"], "configured");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_frontend_bundle_is_the_fallback() {
        let bundle = tempfile::tempdir().unwrap();
        std::fs::write(bundle.path().join("index.html"), "<h1>Shop</h1>").unwrap();

        let app = gateway(GatewayConfig {
            static_dir: bundle.path().to_string_lossy().into_owned(),
            ..config_for("http://127.0.0.1:1")
        });

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await.as_ref(), b"<h1>Shop</h1>");
    }

    async fn assert_stalled_relay_is_cut(app: Router, uri: &str) {
        let started = Instant::now();
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let collected = tokio::time::timeout(Duration::from_secs(5), response.into_body().collect())
            .await
            .expect("relayed body must end once the deadline passes");
        assert!(collected.is_err());
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stalled_file_body_is_cut_at_deadline() {
        let upstream = start_stalling_upstream().await;
        let app = gateway(config_for(&format!("http://{upstream}")));

        assert_stalled_relay_is_cut(app, "/files/stall.bin").await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stalled_passthrough_api_body_is_cut_at_deadline() {
        let upstream = start_stalling_upstream().await;
        let app = gateway(GatewayConfig {
            api_response: ResponseRelay::Passthrough,
            ..config_for(&format!("http://{upstream}"))
        });

        assert_stalled_relay_is_cut(app, "/api/method/export").await;
    }
}
