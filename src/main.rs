use std::sync::Arc;

use clap::Parser;
use color_eyre::{Result, eyre::Context};
use erp_gateway::{
    FileSystemAdapter, GatewayService, HttpClient, HttpClientAdapter, HttpHandler,
    config::{ConfigValidator, GatewayConfig, load_config},
    router, shutdown_signal, tracing_setup,
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Optional settings file (TOML, YAML or JSON); environment variables win
    #[clap(short, long)]
    config: Option<String>,
}

fn describe(value: Option<&str>) -> &str {
    value.unwrap_or("not set")
}

fn log_startup(config: &GatewayConfig) {
    tracing::info!("Gateway listening on {}", config.listen_addr());
    tracing::info!("ERP_URL: {}", describe(config.erp_url.as_deref()));
    tracing::info!(
        "API_KEY: {}",
        if config.api_key.is_some() { "set" } else { "not set" }
    );
    tracing::info!(
        "API_SECRET: {}",
        if config.api_secret.is_some() { "set" } else { "not set" }
    );
    tracing::info!("FRONTEND_URL: {}", config.frontend_url);
    tracing::info!(
        "Body mode {:?}, API relay {:?}, site identity {:?}, Expect {:?}",
        config.body_mode,
        config.api_response,
        config.site_identity,
        config.expect_header
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;

    tracing_setup::init_tracing(config.log_format)?;

    ConfigValidator::enforce(&config)?;

    let config = Arc::new(config);
    let http_client: Arc<dyn HttpClient> = Arc::new(
        HttpClientAdapter::with_connect_timeout(config.upstream_timeout())
            .context("Failed to create HTTP client adapter")?,
    );
    let file_system = Arc::new(FileSystemAdapter::new());
    let gateway_service = Arc::new(GatewayService::new(config.clone()));

    let handler = Arc::new(HttpHandler::new(gateway_service, http_client, file_system));
    let app = router(handler);

    let listen_addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("Failed to bind {listen_addr}"))?;

    log_startup(&config);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Gateway stopped");
    Ok(())
}
