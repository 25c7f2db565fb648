//! Background loop republishing pending outbox records

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info};

use super::dispatcher::EventDispatcher;

#[derive(Debug)]
pub struct OutboxSweeper {
    dispatcher: Arc<EventDispatcher>,
    interval: Duration,
}

impl OutboxSweeper {
    pub fn new(dispatcher: Arc<EventDispatcher>, interval: Duration) -> Self {
        Self {
            dispatcher,
            interval,
        }
    }

    /// Sweeps every interval until the shutdown signal flips to `true`
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(
            interval_ms = self.interval.as_millis() as u64,
            stream = self.dispatcher.stream_name(),
            "Outbox sweeper started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.dispatcher.sweep().await {
                        error!(error = %e, "Outbox sweep failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Outbox sweeper stopped");
    }
}
