// Cancellation signal shared between a recording session and the work it owns.
//
// Purpose
// - Let a caller abort an in-flight wait, and let the session stop its background workers.
//
// Responsibilities
// - Flip once from "running" to "cancelled" and wake every waiter when it does.
// - Stay cancelled. There is no reset.

use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct Cancellation {
    state: Arc<watch::Sender<bool>>,
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

impl Cancellation {
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
        }
    }

    /// Returns `true` only for the call that actually performed the cancellation.
    pub fn cancel(&self) -> bool {
        !self.state.send_replace(true)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.state.borrow()
    }

    /// Resolves once `cancel` has been called, immediately if it already was.
    pub async fn cancelled(&self) {
        let mut receiver = self.state.subscribe();
        // The sender lives as long as `self`, so this only returns once the flag is set.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}
