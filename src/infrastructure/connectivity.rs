use crate::application::ports::ConnectivityMonitor;
use tokio::sync::watch;
use tracing::info;

/// Watch-channel backed connectivity monitor.
///
/// Starts offline: until the platform reports reachability the engine queues
/// instead of attempting requests.
pub struct SharedConnectivity {
    tx: watch::Sender<bool>,
}

impl SharedConnectivity {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    fn set(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current != online {
                *current = online;
                true
            } else {
                false
            }
        });
        if changed {
            info!(online, "connectivity changed");
        }
    }
}

impl Default for SharedConnectivity {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectivityMonitor for SharedConnectivity {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    fn mark_online(&self) {
        self.set(true);
    }

    fn mark_offline(&self) {
        self.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_starts_offline() {
        let monitor = SharedConnectivity::new();
        assert!(!monitor.is_online());
    }

    #[tokio::test]
    async fn test_transition_notifies_subscribers() {
        let monitor = SharedConnectivity::new();
        let mut rx = monitor.subscribe();

        monitor.mark_online();
        rx.changed().await.unwrap();
        assert!(*rx.borrow());

        monitor.mark_offline();
        rx.changed().await.unwrap();
        assert!(!*rx.borrow());
    }

    #[tokio::test]
    async fn test_repeated_report_does_not_renotify() {
        let monitor = SharedConnectivity::new();
        let mut rx = monitor.subscribe();
        rx.borrow_and_update();

        monitor.mark_offline();
        assert!(!rx.has_changed().unwrap());
    }
}
