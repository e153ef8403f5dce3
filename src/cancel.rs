//! Cancellation signal threaded through every suspending call.
//!
//! Built on a `tokio::sync::watch` channel holding a single `bool`. A
//! [`Cancellation`] whose [`CancelHandle`] has been dropped never fires.

use tokio::sync::watch;

/// Sender side; cancelling is sticky.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiver side, cheap to clone into each workflow.
#[derive(Debug, Clone)]
pub struct Cancellation {
    rx: watch::Receiver<bool>,
}

impl Cancellation {
    pub fn new() -> (CancelHandle, Cancellation) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, Cancellation { rx })
    }

    /// A signal that is never raised.
    #[cfg(test)]
    pub fn never() -> Cancellation {
        Self::new().1
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested; pends forever otherwise.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender gone without cancelling.
                std::future::pending::<()>().await;
            }
        }
    }
}
