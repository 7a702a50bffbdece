//! Cancellation token shared between a poll and its owner.

use std::sync::Arc;

use tokio::sync::watch;

/// Cloneable cancellation flag.
///
/// Every clone observes the same flag. Cancelling is permanent and wakes all
/// tasks awaiting [`CancelToken::cancelled`].
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the token has been cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}
