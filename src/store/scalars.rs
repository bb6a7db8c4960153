use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::time::{Duration, Instant};

type Key = String;

pub struct Value {
    pub data: Bytes,
    pub expires_at: Option<Instant>,
}

impl Value {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

/// Scalar keyspace. Expired entries are never swept in the background: an entry past its
/// expiration is reported as missing and removed by the next read that notices it. Entries that are
/// never read again stay in memory.
#[derive(Default)]
pub struct Scalars {
    entries: RwLock<HashMap<Key, Value>>,
}

impl Scalars {
    /// Inserts or overwrites `key`. With a `ttl` the entry expires once that much time has passed,
    /// a zero `ttl` makes it expired right away.
    pub fn set(&self, key: Key, data: Bytes, ttl: Option<Duration>) {
        // A deadline too far away to be represented never comes.
        let expires_at = ttl.and_then(|ttl| Instant::now().checked_add(ttl));

        self.write().insert(key, Value { data, expires_at });
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        let now = Instant::now();

        {
            let entries = self.read();
            match entries.get(key) {
                None => return None,
                Some(value) if !value.is_expired(now) => return Some(value.data.clone()),
                Some(_) => {}
            }
        }

        // The entry is stale. It may have been overwritten while no lock was held, so check again
        // before removing it.
        let mut entries = self.write();
        match entries.get(key) {
            Some(value) if value.is_expired(now) => {
                entries.remove(key);
                None
            }
            Some(value) => Some(value.data.clone()),
            None => None,
        }
    }

    /// Number of entries held, including expired entries that haven't been read since.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // The maps are left consistent by every operation, so a panic in another thread while holding
    // the lock doesn't invalidate them.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<Key, Value>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Key, Value>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}
