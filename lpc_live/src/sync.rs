//! Entity-scoped async locks.
//!
//! Eliminations are serialized per tournament, votes and resolution per poll,
//! and balance checks per (tournament, player). Callers that need several
//! locks take them in a fixed order: poll first, then players ascending.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Idle entries are swept once the map grows past this many keys.
const PRUNE_THRESHOLD: usize = 1024;

/// A set of async mutexes addressed by key.
pub struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Clone + Ord,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone + Ord,
{
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the lock for `key`, waiting for any current holder.
    pub async fn lock(&self, key: K) -> OwnedMutexGuard<()> {
        let entry = {
            let mut locks = self.locks.lock().await;
            if locks.len() > PRUNE_THRESHOLD {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            locks
                .entry(key)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        entry.lock_owned().await
    }

    /// Acquire several locks in ascending key order. Duplicate keys are
    /// locked once.
    pub async fn lock_many(&self, keys: impl IntoIterator<Item = K>) -> Vec<OwnedMutexGuard<()>> {
        let mut keys: Vec<K> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            guards.push(self.lock(key).await);
        }
        guards
    }

    /// Number of keys currently tracked.
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
