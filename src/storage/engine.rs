//! Expiring Key-Value Store
//!
//! One `HashMap` behind one `Mutex`. Every lookup, insert and lazy removal
//! holds the lock for the duration of a single synchronous map operation, so
//! a `set` and a `get` from different sessions are each atomic and
//! last-write-wins.
//!
//! ## Expiry
//!
//! Expiry is stored as an absolute UNIX timestamp in milliseconds. An entry
//! is visible while `expires_at > now`. Expired entries are removed the next
//! time they are looked up; nothing reclaims them earlier unless the optional
//! [`ExpirySweeper`](crate::storage::ExpirySweeper) is running.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds since the UNIX epoch.
#[inline]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A stored value with optional expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub value: Bytes,
    /// Absolute expiry in epoch milliseconds (None = never expires)
    pub expires_at: Option<u64>,
}

impl Entry {
    /// Creates an entry that never expires.
    pub fn new(value: Bytes) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    /// Creates an entry expiring `ttl` after `now`.
    ///
    /// A deadline past `u64::MAX` milliseconds is clamped to `u64::MAX`.
    pub fn with_ttl(value: Bytes, ttl: Duration, now: u64) -> Self {
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        Self {
            value,
            expires_at: Some(now.saturating_add(ttl_ms)),
        }
    }

    /// Returns true once `now` has reached the expiry timestamp.
    #[inline]
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// Operation counters, read with relaxed ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub keys: u64,
    pub gets: u64,
    pub sets: u64,
    pub expired: u64,
}

/// The shared key-value store.
///
/// Construct once, wrap in an `Arc`, and hand a clone to every
/// [`CommandHandler`](crate::commands::CommandHandler).
///
/// # Example
///
/// ```
/// use respkv::storage::Store;
/// use bytes::Bytes;
/// use std::time::Duration;
///
/// let store = Store::new();
/// store.set(Bytes::from("name"), Bytes::from("respkv"), None);
/// assert_eq!(store.get(b"name"), Some(Bytes::from("respkv")));
///
/// store.set(Bytes::from("session"), Bytes::from("abc"), Some(Duration::from_secs(60)));
/// assert!(store.get(b"session").is_some());
/// ```
#[derive(Debug, Default)]
pub struct Store {
    data: Mutex<HashMap<Bytes, Entry>>,
    gets: AtomicU64,
    sets: AtomicU64,
    expired: AtomicU64,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the map half-updated, so a
    // poisoned mutex is still safe to use.
    fn lock(&self) -> MutexGuard<'_, HashMap<Bytes, Entry>> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts or overwrites `key`.
    ///
    /// The previous value and expiry are both replaced: setting without a TTL
    /// makes a key persistent again.
    pub fn set(&self, key: Bytes, value: Bytes, ttl: Option<Duration>) {
        self.sets.fetch_add(1, Ordering::Relaxed);

        let entry = match ttl {
            Some(ttl) => Entry::with_ttl(value, ttl, now_millis()),
            None => Entry::new(value),
        };
        self.lock().insert(key, entry);
    }

    /// Returns the value for `key`, removing it if it has expired.
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.gets.fetch_add(1, Ordering::Relaxed);

        let now = now_millis();
        let mut data = self.lock();
        match data.get(key) {
            None => return None,
            Some(entry) if !entry.is_expired_at(now) => return Some(entry.value.clone()),
            Some(_) => {}
        }

        data.remove(key);
        self.expired.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Number of entries held, including expired ones not yet removed.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every expired entry and returns how many were dropped.
    pub fn cleanup_expired(&self) -> u64 {
        let now = now_millis();
        let mut data = self.lock();
        let before = data.len();
        data.retain(|_, entry| !entry.is_expired_at(now));
        let removed = (before - data.len()) as u64;
        drop(data);

        if removed > 0 {
            self.expired.fetch_add(removed, Ordering::Relaxed);
        }
        removed
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            keys: self.len() as u64,
            gets: self.gets.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
        }
    }
}
