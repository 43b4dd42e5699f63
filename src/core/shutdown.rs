//! Cooperative shutdown signal
//!
//! Workflows check the signal only at safe checkpoints; nothing is killed
//! mid-mutation.

use tokio::sync::watch;

use crate::error::{FlowError, FlowResult};

/// Sending half, owned by whoever decides to stop
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

/// Receiving half, cloned into every workflow
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        // Receivers may already be gone at exit
        let _ = self.tx.send(true);
    }
}

impl Shutdown {
    /// A signal that never fires, for one-shot commands and tests
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        // Keeping the sender alive would be pointless; a closed channel keeps `false`
        drop(tx);
        Self { rx }
    }

    pub fn is_requested(&self) -> bool {
        *self.rx.borrow()
    }

    /// Returns `Cancelled` if shutdown was requested
    pub fn checkpoint(&self) -> FlowResult<()> {
        if self.is_requested() {
            Err(FlowError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves once shutdown is requested; pends forever if it never will be
    pub async fn requested(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
