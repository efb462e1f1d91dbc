//! Native change events from a shared in-memory backend.

use tokio::sync::broadcast::{self, error::RecvError};

use crate::backend::{ContextId, StoreChange};
use crate::error::Result;

use super::{current_runtime, ChangeListener, ChangeSource};

/// Change source fed by the backend's own write events.
///
/// Events originating from `context` are dropped, matching how a browser
/// never delivers a storage event to the window that made the write.
#[derive(Clone)]
pub struct BroadcastChangeSource {
    changes: broadcast::Sender<StoreChange>,
    context: ContextId,
}

impl BroadcastChangeSource {
    /// Listen on `changes` on behalf of `context`.
    pub fn new(changes: broadcast::Sender<StoreChange>, context: ContextId) -> Self {
        Self { changes, context }
    }
}

impl ChangeSource for BroadcastChangeSource {
    fn subscribe(&self, mut listener: ChangeListener) -> Result<()> {
        let runtime = current_runtime()?;
        let mut rx = self.changes.subscribe();
        let own = self.context;

        runtime.spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(change) if change.origin == own => {}
                    Ok(_) => listener(),
                    Err(RecvError::Lagged(skipped)) => {
                        log::debug!("change listener lagged by {skipped} events");
                        listener();
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Ok(())
    }
}
