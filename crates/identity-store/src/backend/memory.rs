//! In-memory key-value store shared between execution contexts.
//!
//! A [`MemoryBackend`] is the shared map. Each call to
//! [`MemoryBackend::context`] hands out a [`MemoryStore`] standing for one
//! execution context (a tab, a window, a task). Every write through a
//! context publishes a [`StoreChange`] tagged with that context, which is
//! what [`BroadcastChangeSource`] listens to.
//!
//! Nothing here persists beyond the process.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;

use crate::error::Result;
use crate::notify::BroadcastChangeSource;

use super::KeyValueStore;

/// Capacity of the change channel before slow listeners start lagging.
const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Identifies the execution context that made a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(pub u64);

/// A write observed on the shared store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    /// The key that was set or removed.
    pub key: String,
    /// The context that made the write.
    pub origin: ContextId,
}

struct Shared {
    values: RwLock<HashMap<String, String>>,
    changes: broadcast::Sender<StoreChange>,
    next_context: AtomicU64,
}

/// The shared map behind one or more [`MemoryStore`] contexts.
#[derive(Clone)]
pub struct MemoryBackend {
    shared: Arc<Shared>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                values: RwLock::new(HashMap::new()),
                changes,
                next_context: AtomicU64::new(1),
            }),
        }
    }

    /// Open a new execution context on this backend.
    pub fn context(&self) -> MemoryStore {
        let id = self.shared.next_context.fetch_add(1, Ordering::Relaxed);
        MemoryStore {
            id: ContextId(id),
            shared: Arc::clone(&self.shared),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.shared
            .values
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// One execution context's handle on a [`MemoryBackend`].
#[derive(Clone)]
pub struct MemoryStore {
    id: ContextId,
    shared: Arc<Shared>,
}

impl MemoryStore {
    /// The context this handle writes as.
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Native change notifications for this context.
    ///
    /// The returned source reports writes made by every *other* context on
    /// the same backend; writes made through this handle are not reported.
    pub fn change_source(&self) -> BroadcastChangeSource {
        BroadcastChangeSource::new(self.shared.changes.clone(), self.id)
    }

    fn publish(&self, key: &str) {
        // No subscribers is the common case and not an error.
        let _ = self.shared.changes.send(StoreChange {
            key: key.to_string(),
            origin: self.id,
        });
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.shared.values.read().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        {
            let mut values = self.shared.values.write().unwrap_or_else(|e| e.into_inner());
            values.insert(key.to_string(), value.to_string());
        }
        self.publish(key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let removed = {
            let mut values = self.shared.values.write().unwrap_or_else(|e| e.into_inner());
            values.remove(key).is_some()
        };
        if removed {
            self.publish(key);
        }
        Ok(())
    }
}
