//! Shutdown signal shared by background [`Task`]s.

use tokio::sync::watch;

#[cfg(doc)]
use crate::Task;

/// Creates a new pair of a [`Trigger`] and a [`Shutdown`] signal it fires.
#[must_use]
pub fn channel() -> (Trigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (Trigger(tx), Shutdown(rx))
}

/// Firing side of a [`Shutdown`] signal.
///
/// Dropping it requests the shutdown as well.
#[derive(Debug)]
pub struct Trigger(watch::Sender<bool>);

impl Trigger {
    /// Requests the shutdown of every [`Task`] observing the [`Shutdown`]
    /// signal.
    pub fn fire(&self) {
        let _ = self.0.send_replace(true);
    }
}

/// Shutdown signal observed by any number of [`Task`]s.
#[derive(Clone, Debug)]
pub struct Shutdown(watch::Receiver<bool>);

impl Shutdown {
    /// Resolves once the shutdown is requested.
    pub async fn requested(&mut self) {
        let _ = self.0.wait_for(|fired| *fired).await;
    }

    /// Indicates whether the shutdown has been requested already.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        *self.0.borrow() || self.0.has_changed().is_err()
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use tokio::time;

    use super::channel;

    #[tokio::test]
    async fn wakes_every_waiter() {
        let (trigger, shutdown) = channel();
        let waiters = (0..3)
            .map(|_| {
                let mut shutdown = shutdown.clone();
                tokio::spawn(async move { shutdown.requested().await })
            })
            .collect::<Vec<_>>();

        trigger.fire();

        for waiter in waiters {
            time::timeout(Duration::from_secs(1), waiter)
                .await
                .unwrap()
                .unwrap();
        }
        assert!(shutdown.is_requested());
    }

    #[tokio::test]
    async fn resolves_when_trigger_is_dropped() {
        let (trigger, mut shutdown) = channel();
        assert!(!shutdown.is_requested());

        drop(trigger);

        time::timeout(Duration::from_secs(1), shutdown.requested())
            .await
            .unwrap();
        assert!(shutdown.is_requested());
    }

    #[tokio::test]
    async fn observes_signal_fired_before_waiting() {
        let (trigger, shutdown) = channel();
        trigger.fire();

        let mut late = shutdown.clone();
        time::timeout(Duration::from_secs(1), late.requested())
            .await
            .unwrap();
    }
}
