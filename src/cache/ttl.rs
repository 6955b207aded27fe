//! Bounded key/value store with expiry.
//!
//! # Responsibilities
//! - Return values younger than the TTL, treat older ones as absent
//! - Evict expired entries lazily on read and in bulk on prune
//! - Keep the entry count under a ceiling by dropping the oldest half
//!
//! # Design Decisions
//! - Insertion order is tracked with a sequence number per entry; the order
//!   queue may hold stale slots for removed keys, skipped on eviction and
//!   compacted on prune
//! - Updating an existing key keeps its original position in the order
//! - A TTL of `None` never expires (used for memoized classification)

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::cache::clock::Clock;

/// A stored value and the time it was written.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub stored_at_millis: i64,
    seq: u64,
}

struct Inner<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    order: VecDeque<(K, u64)>,
    next_seq: u64,
}

impl<K: Eq + Hash + Clone, V> Inner<K, V> {
    fn is_live(&self, key: &K, seq: u64) -> bool {
        self.entries.get(key).is_some_and(|e| e.seq == seq)
    }

    fn compact_order(&mut self) {
        let entries = &self.entries;
        self.order
            .retain(|(k, seq)| entries.get(k).is_some_and(|e| e.seq == *seq));
    }
}

/// Thread-safe TTL cache with insertion-order eviction.
pub struct TtlCache<K, V> {
    name: &'static str,
    ttl: Option<Duration>,
    capacity: Option<usize>,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner<K, V>>,
}

impl<K, V> std::fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("name", &self.name)
            .field("ttl", &self.ttl)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    /// Create a new cache.
    pub fn new(
        name: &'static str,
        ttl: Option<Duration>,
        capacity: Option<usize>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            name,
            ttl,
            capacity,
            clock,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
                next_seq: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        // Poisoning is ignored; entries are never left half-written
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, entry: &CacheEntry<V>, now: i64) -> bool {
        match self.ttl {
            Some(ttl) => now - entry.stored_at_millis >= ttl.as_millis() as i64,
            None => false,
        }
    }

    /// Look up a live value. Expired entries are removed and reported absent.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now_millis();
        let mut inner = self.lock();
        let expired = self.is_expired(inner.entries.get(key)?, now);
        if expired {
            inner.entries.remove(key);
            return None;
        }
        inner.entries.get(key).map(|e| e.value.clone())
    }

    /// Store a value, then trim the cache if it grew past its ceiling.
    pub fn insert(&self, key: K, value: V) {
        let now = self.clock.now_millis();
        {
            let mut inner = self.lock();
            if let Some(entry) = inner.entries.get_mut(&key) {
                entry.value = value;
                entry.stored_at_millis = now;
            } else {
                let seq = inner.next_seq;
                inner.next_seq += 1;
                inner.order.push_back((key.clone(), seq));
                inner.entries.insert(
                    key,
                    CacheEntry {
                        value,
                        stored_at_millis: now,
                        seq,
                    },
                );
            }
        }
        self.evict_if_over_capacity();
    }

    /// Remove every expired entry. Returns the number removed.
    pub fn prune_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let mut inner = self.lock();
        let before = inner.entries.len();
        if self.ttl.is_some() {
            inner.entries.retain(|_, entry| !self.is_expired(entry, now));
        }
        inner.compact_order();
        before - inner.entries.len()
    }

    /// Drop the oldest half of the entries once the ceiling is exceeded.
    /// Returns the number removed.
    pub fn evict_if_over_capacity(&self) -> usize {
        let Some(capacity) = self.capacity else {
            return 0;
        };
        let mut inner = self.lock();
        if inner.entries.len() <= capacity {
            return 0;
        }

        let target = inner.entries.len() / 2;
        let mut removed = 0;
        while removed < target {
            let Some((key, seq)) = inner.order.pop_front() else {
                break;
            };
            if inner.is_live(&key, seq) {
                inner.entries.remove(&key);
                removed += 1;
            }
        }

        tracing::debug!(cache = self.name, removed, remaining = inner.entries.len(), "Evicted oldest cache entries");
        removed
    }

    /// Number of stored entries, including expired ones not yet pruned.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }
}
