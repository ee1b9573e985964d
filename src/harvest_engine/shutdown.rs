use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct ShutdownState {
    requested: AtomicBool,
    fatal: Mutex<Option<String>>,
    notify: Notify,
}

/// Cooperative stop flag shared by every executor.
///
/// Executors check it before claiming each item; an in-flight item always
/// runs to its own terminal state.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    state: Arc<ShutdownState>,
}

impl ShutdownSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask executors to stop after their current item.
    pub fn request(&self) {
        self.state.requested.store(true, Ordering::SeqCst);
        self.state.notify.notify_waiters();
    }

    /// Stop the pool because a shared resource failed. The first reason wins.
    pub fn trip_fatal(&self, reason: impl Into<String>) {
        let mut fatal = self.state.fatal.lock();
        if fatal.is_none() {
            *fatal = Some(reason.into());
        }
        drop(fatal);
        self.request();
    }

    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.state.requested.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn fatal_reason(&self) -> Option<String> {
        self.state.fatal.lock().clone()
    }

    /// Resolves once a stop has been requested.
    pub async fn requested(&self) {
        loop {
            // Register before checking the flag so a concurrent request is not missed
            let notified = self.state.notify.notified();
            if self.is_requested() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_first_fatal_reason_wins() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_requested());

        let clone = signal.clone();
        clone.trip_fatal("connection refused");
        signal.trip_fatal("second");

        assert!(signal.is_requested());
        assert_eq!(signal.fatal_reason().as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_plain_request_is_not_fatal() {
        let signal = ShutdownSignal::new();
        signal.request();
        assert!(signal.is_requested());
        assert_eq!(signal.fatal_reason(), None);
    }

    #[tokio::test]
    async fn test_requested_wakes_waiters() {
        let signal = ShutdownSignal::new();
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.requested().await })
        };

        tokio::task::yield_now().await;
        signal.request();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .expect("waiter should not panic");

        // Already requested: resolves immediately
        signal.requested().await;
    }
}
