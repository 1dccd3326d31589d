// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Size- and age-bounded query cache.
//!
//! Entries are evicted least-recently-used first when the cache is full, and
//! lazily when they are found to be older than the configured age on lookup.
//! Nothing is cleared wholesale on a timer.

use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1000) {
    Some(n) => n,
    None => unreachable!(),
};

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// LRU cache with a per-entry age limit.
pub struct QueryCache<K: Hash + Eq, V: Clone> {
    store: Mutex<LruCache<K, CacheEntry<V>>>,
    max_age: Duration,
}

impl<K: Hash + Eq, V: Clone> QueryCache<K, V> {
    /// A capacity of zero falls back to the default capacity.
    pub fn new(capacity: usize, max_age: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(DEFAULT_CAPACITY);
        Self {
            store: Mutex::new(LruCache::new(capacity)),
            max_age,
        }
    }

    /// Look up a fresh entry, marking it most recently used.
    pub async fn get(&self, key: &K) -> Option<V> {
        let mut store = self.store.lock().await;
        let expired = match store.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.max_age => {
                return Some(entry.value.clone())
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            store.pop(key);
        }
        None
    }

    /// Insert or replace, evicting the least recently used entry when full.
    pub async fn insert(&self, key: K, value: V) {
        self.store.lock().await.put(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Return the fresh entry for `key`, or store `value` and return it.
    pub async fn get_or_insert(&self, key: K, value: V) -> V {
        let mut store = self.store.lock().await;
        if let Some(entry) = store.get(&key) {
            if entry.inserted_at.elapsed() < self.max_age {
                return entry.value.clone();
            }
        }
        store.put(
            key,
            CacheEntry {
                value: value.clone(),
                inserted_at: Instant::now(),
            },
        );
        value
    }

    /// Change a fresh entry in place and restart its age.
    ///
    /// Returns `None` when there is no fresh entry for `key`.
    pub async fn update<R>(&self, key: &K, change: impl FnOnce(&mut V) -> R) -> Option<R> {
        let mut store = self.store.lock().await;
        let expired = match store.get_mut(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.max_age => {
                let result = change(&mut entry.value);
                entry.inserted_at = Instant::now();
                return Some(result);
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            store.pop(key);
        }
        None
    }

    /// Remove and return an entry, fresh or not.
    pub async fn remove(&self, key: &K) -> Option<V> {
        self.store.lock().await.pop(key).map(|entry| entry.value)
    }

    pub async fn invalidate(&self, key: &K) {
        self.store.lock().await.pop(key);
    }

    pub async fn len(&self) -> usize {
        self.store.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_used() {
        let cache = QueryCache::new(2, Duration::from_secs(60));
        cache.insert("a", 1).await;
        cache.insert("b", 2).await;

        // Touch "a" so "b" becomes the eviction candidate.
        assert_eq!(cache.get(&"a").await, Some(1));
        cache.insert("c", 3).await;

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get(&"b").await, None);
        assert_eq!(cache.get(&"a").await, Some(1));
        assert_eq!(cache.get(&"c").await, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_by_age() {
        let cache = QueryCache::new(10, Duration::from_secs(30));
        cache.insert(1u32, "fresh").await;

        tokio::time::advance(Duration::from_secs(29)).await;
        assert_eq!(cache.get(&1).await, Some("fresh"));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get(&1).await, None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_restarts_age() {
        let cache = QueryCache::new(10, Duration::from_secs(30));
        cache.insert("k", 1).await;

        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(cache.update(&"k", |v| *v += 1).await, Some(()));

        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(cache.get(&"k").await, Some(2));

        assert_eq!(cache.update(&"missing", |v| *v += 1).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_or_insert_keeps_fresh_entry() {
        let cache = QueryCache::new(10, Duration::from_secs(30));
        assert_eq!(cache.get_or_insert("k", 1).await, 1);
        assert_eq!(cache.get_or_insert("k", 2).await, 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(cache.get_or_insert("k", 3).await, 3);
    }

    #[tokio::test]
    async fn test_invalidate_removes_entry() {
        let cache = QueryCache::new(10, Duration::from_secs(30));
        cache.insert("k", 7).await;
        cache.invalidate(&"k").await;
        assert_eq!(cache.get(&"k").await, None);
    }
}
