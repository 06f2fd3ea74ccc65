//! Cooperative done-signal shared by every pipeline stage.
//!
//! A [`ShutdownHandle`] triggers the signal; each stage holds its own
//! [`Shutdown`] receiver and selects on [`Shutdown::cancelled`] at every
//! suspension point. Triggering is idempotent and observable by receivers
//! subscribed before or after the fact.
//!
//! This is a stop *request*, distinct from the per-operation socket
//! deadlines in [`crate::connection`].

use std::sync::Arc;

use tokio::sync::watch;

/// Triggering side of the done-signal. Cheap to clone.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

/// Receiving side of the done-signal, one per stage.
#[derive(Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

/// Create a connected handle/receiver pair.
pub fn channel() -> (ShutdownHandle, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownHandle { tx: Arc::new(tx) }, Shutdown { rx })
}

impl ShutdownHandle {
    /// Request an orderly stop. Idempotent.
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    /// Create another receiver for a stage.
    pub fn subscribe(&self) -> Shutdown {
        Shutdown {
            rx: self.tx.subscribe(),
        }
    }

    /// Wire the process interrupt signal to this handle.
    pub fn listen_ctrl_c(&self) {
        let handle = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, stopping pipeline");
                handle.trigger();
            }
        });
    }
}

impl Shutdown {
    /// Resolve once the signal has been triggered.
    ///
    /// If every handle is dropped without triggering, this pends forever;
    /// stages then stop through their normal end-of-input paths.
    pub async fn cancelled(&mut self) {
        if *self.rx.borrow() {
            return;
        }
        while self.rx.changed().await.is_ok() {
            if *self.rx.borrow() {
                return;
            }
        }
        std::future::pending::<()>().await;
    }

    /// Non-blocking check of the signal.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_wakes_receiver() {
        let (handle, mut shutdown) = channel();
        assert!(!shutdown.is_cancelled());

        let waiter = tokio::spawn(async move {
            shutdown.cancelled().await;
        });
        handle.trigger();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("receiver should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn test_subscribe_after_trigger_resolves_immediately() {
        let (handle, _shutdown) = channel();
        handle.trigger();

        let mut late = handle.subscribe();
        assert!(late.is_cancelled());
        tokio::time::timeout(Duration::from_millis(100), late.cancelled())
            .await
            .expect("already-triggered signal should resolve");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_handle_without_trigger_pends() {
        let (handle, mut shutdown) = channel();
        drop(handle);

        let result =
            tokio::time::timeout(Duration::from_secs(5), shutdown.cancelled()).await;
        assert!(result.is_err(), "signal must not fire on handle drop");
    }
}
