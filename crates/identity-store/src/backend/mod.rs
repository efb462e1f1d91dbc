//! Backing key-value stores.
//!
//! The core only ever sees the [`KeyValueStore`] capability: string keys,
//! string values, synchronous get/set/remove. Which implementation backs it
//! is decided once, at construction, by [`open_backend`].
//!
//! # Modules
//!
//! - [`file`]: persistent store, one file per key.
//! - [`memory`]: shared in-memory store; the fallback when no persistent
//!   directory is usable, and the fake used by tests.

pub mod file;
pub mod memory;

use std::sync::Arc;

use crate::config::StoreConfig;
use crate::error::Result;
use crate::notify::{ChangeSource, PollingChangeSource};

pub use file::FileStore;
pub use memory::{ContextId, MemoryBackend, MemoryStore, StoreChange};

/// The raw storage capability every component is built on.
///
/// Values are opaque strings; the namespace layer is responsible for
/// encoding. Implementations must be shareable across tasks.
pub trait KeyValueStore: Send + Sync {
    /// Read the value under `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// A backend together with the change source matching it.
pub struct OpenedBackend {
    /// The selected store.
    pub store: Arc<dyn KeyValueStore>,
    /// How this context learns about writes made by other contexts.
    pub changes: Arc<dyn ChangeSource>,
    /// `true` when the persistent store could not be used.
    pub is_fallback: bool,
}

/// Select a backend for `config`.
///
/// A configured, creatable directory yields a [`FileStore`]. Anything else
/// falls back to a private [`MemoryBackend`] context, which lives only as
/// long as the process. Both are observed through polling, since neither
/// receives native notifications from other processes.
pub fn open_backend(config: &StoreConfig) -> OpenedBackend {
    let changes: Arc<dyn ChangeSource> =
        Arc::new(PollingChangeSource::new(config.poll_interval));

    if let Some(dir) = &config.dir {
        match FileStore::new(dir) {
            Ok(store) => {
                return OpenedBackend {
                    store: Arc::new(store),
                    changes,
                    is_fallback: false,
                }
            }
            Err(e) => {
                log::warn!(
                    "cannot use {} for persistent storage, falling back to memory: {e}",
                    dir.display()
                );
            }
        }
    } else {
        log::warn!("no storage directory configured, falling back to memory");
    }

    OpenedBackend {
        store: Arc::new(MemoryBackend::new().context()),
        changes,
        is_fallback: true,
    }
}
