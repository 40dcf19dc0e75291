//! Caller-side cancellation of an in-flight purchase.
//!
//! A [`CancelHandle`] stays with the caller and a [`CancelSignal`] goes to the
//! orchestrator. Dropping the handle counts as cancelling, so an HTTP handler
//! whose future is dropped mid-purchase still triggers the release path.

use tokio::sync::watch;

/// Caller side: flips the signal.
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

impl CancelHandle {
    /// Cancel the purchase. Idempotent.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

/// Orchestrator side: resolves once the purchase is cancelled.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    receiver: Option<watch::Receiver<bool>>,
}

impl CancelSignal {
    /// A handle/signal pair.
    #[must_use]
    pub fn new() -> (CancelHandle, Self) {
        let (sender, receiver) = watch::channel(false);
        (
            CancelHandle { sender },
            Self {
                receiver: Some(receiver),
            },
        )
    }

    /// A signal that never fires.
    #[must_use]
    pub const fn never() -> Self {
        Self { receiver: None }
    }

    /// Whether cancellation was already requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.receiver
            .as_ref()
            .is_some_and(|receiver| *receiver.borrow() || receiver.has_changed().is_err())
    }

    /// Wait until the handle cancels or is dropped.
    pub async fn cancelled(&mut self) {
        match &mut self.receiver {
            Some(receiver) => {
                // Err means the handle was dropped
                let _ = receiver.wait_for(|cancelled| *cancelled).await;
            }
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn cancel_wakes_the_signal() {
        let (handle, mut signal) = CancelSignal::new();
        assert!(!signal.is_cancelled());

        handle.cancel();

        assert!(signal.is_cancelled());
        assert!(timeout(Duration::from_secs(1), signal.cancelled()).await.is_ok());
    }

    #[tokio::test]
    async fn dropping_the_handle_cancels() {
        let (handle, mut signal) = CancelSignal::new();
        drop(handle);

        assert!(signal.is_cancelled());
        assert!(timeout(Duration::from_secs(1), signal.cancelled()).await.is_ok());
    }

    #[tokio::test]
    async fn never_stays_pending() {
        let mut signal = CancelSignal::never();
        assert!(!signal.is_cancelled());
        assert!(timeout(Duration::from_millis(20), signal.cancelled()).await.is_err());
    }
}
