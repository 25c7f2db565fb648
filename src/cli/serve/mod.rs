//! Serve command - HTTP API plus background event processing

use std::net::SocketAddr;

use futures::future::join_all;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use super::shutdown_signal;
use crate::api::create_router;
use crate::config::AppConfig;
use crate::infrastructure::events::StreamBackendType;
use crate::infrastructure::observability::{init_metrics, init_tracing, shutdown_tracing};

/// Run the API server
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_tracing(&config.logging, &config.observability.tracing);

    check_workers(&config)?;

    let app = crate::create_application(&config).await?;
    let metrics = init_metrics(&config.observability.metrics)
        .map(|m| (m, config.observability.metrics.path.clone()));
    let router = create_router(app.state.clone(), metrics);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let background =
        crate::spawn_background(&app, &config, config.events.embedded_workers, &shutdown_rx)?;

    let addr = build_socket_addr(&config)?;
    info!(%addr, embedded_workers = config.events.embedded_workers, "Starting API server");

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown_tx.send(true).ok();
    for result in join_all(background).await {
        if let Err(e) = result {
            warn!(error = %e, "Background task ended abnormally");
        }
    }

    shutdown_tracing();
    info!("API server shutdown complete");

    Ok(())
}

/// An in-memory stream has no reader outside this process
fn check_workers(config: &AppConfig) -> anyhow::Result<()> {
    if config.events.stream == StreamBackendType::Memory && !config.events.embedded_workers {
        anyhow::bail!("events.embedded_workers must be enabled with the memory stream");
    }
    Ok(())
}

fn build_socket_addr(config: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_stream_needs_embedded_workers() {
        let mut config = AppConfig::default();
        assert!(check_workers(&config).is_ok());

        config.events.embedded_workers = false;
        assert!(check_workers(&config).is_err());

        config.events.stream = StreamBackendType::Redis;
        assert!(check_workers(&config).is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let mut config = AppConfig::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 9090;

        assert_eq!(build_socket_addr(&config).unwrap().to_string(), "127.0.0.1:9090");

        config.server.host = "not-an-ip".to_string();
        assert!(build_socket_addr(&config).is_err());
    }
}
