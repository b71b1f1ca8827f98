//! Per-request cancellation signal.
//!
//! Every inbound HTTP request gets a `CancelHandle`/`CancelToken` pair.
//! The handle lives in the request-handling task; the token travels into
//! the backend call. Cancellation fires either explicitly or when the
//! handle is dropped, which is what ties the signal to the HTTP
//! connection's lifetime: hyper drops the handler future on client
//! disconnect, the handle goes with it, and every waiter wakes.

use tokio::sync::watch;

/// Cancelling side of the pair. Dropping it counts as cancellation.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Observing side of the pair. Cheap to clone; safe to share.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelHandle {
    /// Create a fresh handle/token pair.
    pub fn new() -> (CancelHandle, CancelToken) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelToken { rx })
    }

    /// Cancel explicitly. Equivalent to dropping the handle.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl CancelToken {
    /// Whether cancellation has fired (explicitly or by handle drop).
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves once cancellation fires. Never resolves otherwise.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // Err means the handle was dropped, which also counts.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn explicit_cancel_wakes_waiter() {
        let (handle, token) = CancelHandle::new();
        assert!(!token.is_cancelled());

        let waiter = tokio::spawn(async move { token.cancelled().await });
        handle.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake after cancel")
            .unwrap();
    }

    #[tokio::test]
    async fn dropping_handle_cancels() {
        let (handle, token) = CancelHandle::new();
        let observer = token.clone();

        let waiter = tokio::spawn(async move { token.cancelled().await });
        drop(handle);

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake after handle drop")
            .unwrap();
        assert!(observer.is_cancelled());
    }

    #[tokio::test]
    async fn token_reports_state_transitions() {
        let (handle, token) = CancelHandle::new();
        assert!(!token.is_cancelled());
        handle.cancel();
        assert!(token.is_cancelled());
    }
}
