//! Shutdown coordination for the gateway.

use tokio::sync::broadcast;

use crate::lifecycle::signals;

/// Coordinator for graceful shutdown.
///
/// Tests and embedders call [`Shutdown::trigger`]; the binary also reacts to
/// OS signals through [`Shutdown::signalled`].
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Resolve when `rx` fires or its sender is dropped.
    pub async fn wait(mut rx: broadcast::Receiver<()>) {
        let _ = rx.recv().await;
    }

    /// Resolve on an OS signal or when `rx` fires, whichever comes first.
    pub async fn signalled(rx: broadcast::Receiver<()>) {
        tokio::select! {
            _ = signals::wait_for_signal() => {}
            _ = Self::wait(rx) => {}
        }
        tracing::info!("Shutdown signal received");
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
