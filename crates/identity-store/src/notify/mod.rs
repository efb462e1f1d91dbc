//! Cross-context change notification.
//!
//! A context learns that another context wrote to the shared store through
//! a [`ChangeSource`]. Two implementations exist:
//!
//! - [`BroadcastChangeSource`]: native events published by the backend.
//! - [`PollingChangeSource`]: a fixed-interval timer, for backends that
//!   cannot publish events.
//!
//! Listeners run as tasks on the current Tokio runtime and are invoked
//! sequentially, never concurrently with themselves. There is no
//! unsubscribe: a listener lives as long as the runtime.

pub mod broadcast;
pub mod polling;

use crate::error::{Result, StoreError};

pub use self::broadcast::BroadcastChangeSource;
pub use self::polling::PollingChangeSource;

/// Callback fired whenever the store may have been changed externally.
pub type ChangeListener = Box<dyn FnMut() + Send + 'static>;

/// Capability to observe writes made by other execution contexts.
pub trait ChangeSource: Send + Sync {
    /// Register `listener` and return immediately.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NoRuntime` when called outside a Tokio runtime.
    fn subscribe(&self, listener: ChangeListener) -> Result<()>;
}

fn current_runtime() -> Result<tokio::runtime::Handle> {
    tokio::runtime::Handle::try_current().map_err(|_| StoreError::NoRuntime)
}
