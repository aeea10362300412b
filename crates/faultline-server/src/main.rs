//! Faultline governance HTTP server
//!
//! Serves the circuit-breaker admin API over REST.

use anyhow::Result;
use faultline_server::{
    api,
    config::{LogFormat, ServerConfig},
    governance,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first so its log level can seed the filter
    let config = ServerConfig::load()?;

    init_tracing(&config)?;
    info!("Loaded configuration: {:?}", config);

    let (service, directory) = governance::init_service(&config).await?;
    info!(
        backend = service.repository().backend_name(),
        services = directory.len(),
        "Governance service initialized"
    );

    let app = api::create_router(service);

    let addr = config.bind_address();
    info!("Starting server on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    info!("  Health check: http://{}/health", addr);
    info!("  Admin API: http://{}/v1/circuitbreakers", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Initialize tracing subscriber
fn init_tracing(config: &ServerConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.log_filter().into());
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    Ok(())
}
