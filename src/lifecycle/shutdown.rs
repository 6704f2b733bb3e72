//! Shutdown coordination for the balancer.

use tokio::sync::watch;

/// Coordinator for graceful shutdown.
///
/// Built on watch channels so a task that subscribes after the trigger
/// still observes it.
#[derive(Debug)]
pub struct Shutdown {
    /// Set once shutdown has been requested.
    requested: watch::Sender<bool>,
    /// Set once the listener has finished draining.
    completed: watch::Sender<bool>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (requested, _) = watch::channel(false);
        let (completed, _) = watch::channel(false);
        Self {
            requested,
            completed,
        }
    }

    /// Subscribe to the shutdown request.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.requested.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        self.requested.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.requested.borrow()
    }

    /// Record that the listener has stopped.
    pub fn complete(&self) {
        self.completed.send_replace(true);
    }

    pub fn is_complete(&self) -> bool {
        *self.completed.borrow()
    }

    /// Wait until [`Shutdown::complete`] has been called.
    pub async fn wait_for_completion(&self) {
        let mut rx = self.completed.subscribe();
        let _ = rx.wait_for(|done| *done).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve once `rx` reports a shutdown request.
pub async fn requested(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|requested| *requested).await;
}
