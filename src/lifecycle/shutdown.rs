//! Shutdown coordination for the controller.

use std::sync::Arc;

use tokio::sync::broadcast;

/// Coordinator for process shutdown.
///
/// Long-running tasks subscribe before they start; the signal handler
/// triggers once. A subscriber that joins after the trigger misses the
/// message, so subscriptions happen at task spawn time.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Broadcast the shutdown signal to every subscriber.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Trigger the coordinator on the first interrupt signal.
pub fn listen_for_interrupt(shutdown: Arc<Shutdown>) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("interrupt received, shutting down");
                shutdown.trigger();
            }
            Err(error) => {
                tracing::error!(%error, "failed to install interrupt handler");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trigger_reaches_existing_subscribers() {
        let shutdown = Shutdown::new();
        let mut first = shutdown.subscribe();
        let mut second = shutdown.subscribe();

        shutdown.trigger();

        assert!(first.recv().await.is_ok());
        assert!(second.recv().await.is_ok());
    }

    #[tokio::test]
    async fn trigger_without_subscribers_is_a_noop() {
        Shutdown::new().trigger();
    }
}
