//! CLI module for the automation orchestrator
//!
//! - `serve`: HTTP API, outbox sweeper and (optionally) embedded workers
//! - `worker`: outbox sweeper and event workers only

pub mod serve;
pub mod worker;

use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info};

/// Conversational automation orchestrator
#[derive(Parser)]
#[command(name = "automation-orchestrator")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API with the outbox sweeper
    Serve,

    /// Run the event workers against the shared stream
    Worker,
}

/// Resolves on Ctrl+C or SIGTERM
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let cli = Cli::try_parse_from(["automation-orchestrator", "serve"]).unwrap();
        assert!(matches!(cli.command, Command::Serve));

        let cli = Cli::try_parse_from(["automation-orchestrator", "worker"]).unwrap();
        assert!(matches!(cli.command, Command::Worker));

        assert!(Cli::try_parse_from(["automation-orchestrator", "ui"]).is_err());
    }
}
