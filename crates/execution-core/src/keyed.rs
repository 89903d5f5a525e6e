//! Per-key serialization.
//!
//! Operations on the same key (an order id, a pair's placement slot) run one
//! at a time; different keys never contend.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Held while an operation owns its key. Dropping it releases the key.
#[derive(Debug)]
pub struct KeyGuard {
    key: String,
    _guard: OwnedMutexGuard<()>,
}

impl KeyGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Registry of async mutexes keyed by string.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &str) -> Arc<Mutex<()>> {
        // Clone out of the map so no shard lock is held across an await
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Wait for `key` and hold it until the guard drops.
    pub async fn lock(&self, key: &str) -> KeyGuard {
        let guard = self.slot(key).lock_owned().await;
        KeyGuard {
            key: key.to_string(),
            _guard: guard,
        }
    }

    /// Take `key` if nobody holds it.
    pub fn try_lock(&self, key: &str) -> Option<KeyGuard> {
        let guard = self.slot(key).try_lock_owned().ok()?;
        Some(KeyGuard {
            key: key.to_string(),
            _guard: guard,
        })
    }

    pub fn is_locked(&self, key: &str) -> bool {
        let Some(slot) = self.locks.get(key) else {
            return false;
        };
        let held = slot.try_lock().is_err();
        held
    }

    /// Number of keys with a registered mutex.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Drop mutexes nobody holds or waits on.
    pub fn prune(&self) {
        self.locks.retain(|_, slot| Arc::strong_count(slot) > 1);
    }
}

/// Shared handle to a lock registry.
pub type SharedKeyedLocks = Arc<KeyedLocks>;

pub fn create_keyed_locks() -> SharedKeyedLocks {
    Arc::new(KeyedLocks::new())
}
