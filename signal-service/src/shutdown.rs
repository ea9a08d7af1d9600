//! A cloneable, awaitable shutdown signal. Grounded on the call-site shape of
//! the teacher's `ShutdownSignal` (`tesser-cli/src/control.rs`:
//! `shutdown.clone()`, `async move { shutdown.wait().await }`,
//! `shutdown.triggered()`) — its own source lived in `tesser-cli::live`,
//! which the retrieved pack doesn't carry, so this is a fresh implementation
//! of that observed contract over a `tokio::sync::watch` channel.

use tokio::sync::watch;

#[derive(Clone)]
pub struct ShutdownSignal {
    tx: std::sync::Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        ShutdownSignal {
            tx: std::sync::Arc::new(tx),
            rx,
        }
    }

    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    pub fn triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once `trigger()` has been called, from this clone or any
    /// other. Safe to call after the signal already fired.
    pub async fn wait(&self) {
        let mut rx = self.rx.clone();
        if *rx.borrow() {
            return;
        }
        while rx.changed().await.is_ok() {
            if *rx.borrow() {
                return;
            }
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wait_resolves_after_trigger() {
        let signal = ShutdownSignal::new();
        let waiter = signal.clone();
        let handle = tokio::spawn(async move {
            waiter.wait().await;
        });
        assert!(!signal.triggered());
        signal.trigger();
        handle.await.unwrap();
        assert!(signal.triggered());
    }

    #[tokio::test]
    async fn wait_returns_immediately_if_already_triggered() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        tokio::time::timeout(std::time::Duration::from_millis(50), signal.wait())
            .await
            .expect("wait() should resolve immediately");
    }
}
