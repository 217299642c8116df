//! Cooperative cancellation for the polling loops.
//!
//! The CLI flips the flag on Ctrl-C. The workflow checks it before every
//! remote side effect; the publisher and monitor also check it at every
//! sleep boundary.

use std::time::Duration;

use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: Option<watch::Receiver<bool>>,
}

impl Shutdown {
    /// A shutdown signal plus the sender that triggers it.
    pub fn channel() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self { rx: Some(rx) })
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_triggered(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Sleep for `duration`. Returns `false` if shutdown fired first.
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        let Some(rx) = self.rx.as_mut() else {
            tokio::time::sleep(duration).await;
            return true;
        };
        if *rx.borrow_and_update() {
            return false;
        }

        let sleep = tokio::time::sleep(duration);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                changed = rx.changed() => {
                    if changed.is_err() {
                        // Sender gone: nobody can cancel any more.
                        (&mut sleep).await;
                        return true;
                    }
                    if *rx.borrow_and_update() {
                        return false;
                    }
                }
            }
        }
    }
}
