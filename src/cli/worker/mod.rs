//! Worker command - outbox sweeper and event consumers without HTTP

use futures::future::join_all;
use tokio::sync::watch;
use tracing::{info, warn};

use super::shutdown_signal;
use crate::config::AppConfig;
use crate::infrastructure::events::StreamBackendType;
use crate::infrastructure::observability::init_logging;
use crate::infrastructure::storage::StorageType;

/// Run the event workers until a shutdown signal
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_logging(&config.logging);

    check_deployment(&config)?;

    let app = crate::create_application(&config).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handles = crate::spawn_background(&app, &config, true, &shutdown_rx)?;
    info!(tasks = handles.len(), "Event workers started");

    shutdown_signal().await;

    shutdown_tx.send(true).ok();
    for result in join_all(handles).await {
        if let Err(e) = result {
            warn!(error = %e, "Background task ended abnormally");
        }
    }

    info!("Event workers stopped");
    Ok(())
}

/// A separate process shares nothing held in memory by `serve`
fn check_deployment(config: &AppConfig) -> anyhow::Result<()> {
    if config.events.stream != StreamBackendType::Redis {
        anyhow::bail!("worker requires events.stream = \"redis\"");
    }

    if config.storage.backend.parse::<StorageType>()? != StorageType::Postgres {
        anyhow::bail!("worker requires storage.backend = \"postgres\"");
    }

    Ok(())
}
