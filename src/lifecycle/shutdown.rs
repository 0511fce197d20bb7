//! Shutdown coordination between the signal listener and the check server.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

/// One-shot stop signal shared by every clone.
///
/// The server drains in-flight checks once it sees the signal; later
/// triggers (a second Ctrl+C, a test teardown after SIGTERM) are ignored.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    fired: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribe before triggering; late subscribers miss the signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Fire the signal once. Returns how many listeners were told to drain.
    pub fn trigger(&self) -> usize {
        if self.fired.swap(true, Ordering::SeqCst) {
            tracing::debug!("Shutdown already triggered");
            return 0;
        }
        let draining = self.tx.send(()).unwrap_or(0);
        tracing::info!(listeners = draining, "Shutdown triggered");
        draining
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_reaches_subscribers() {
        let shutdown = Shutdown::new();
        let mut a = shutdown.subscribe();
        let mut b = shutdown.clone().subscribe();

        assert_eq!(shutdown.trigger(), 2);
        assert!(a.recv().await.is_ok());
        assert!(b.recv().await.is_ok());
    }

    #[test]
    fn test_trigger_fires_once_across_clones() {
        let shutdown = Shutdown::new();
        let _server = shutdown.subscribe();
        let signals = shutdown.clone();

        assert_eq!(signals.trigger(), 1);
        assert_eq!(shutdown.trigger(), 0);
    }

    #[test]
    fn test_trigger_without_listeners() {
        assert_eq!(Shutdown::default().trigger(), 0);
    }
}
