//! Content cache — keyed bundle storage with LRU eviction and TTL expiry.
//!
//! [`ContentCache`] stores one [`CacheEntry`] per `(namespace, language)`
//! key. Two bounds are enforced:
//!
//! - **Size**: after an insertion pushes the map past `max_size`, the
//!   least-recently-accessed entries are evicted down to a hysteresis
//!   target (80% of capacity), so eviction doesn't run on every insert.
//! - **Age**: an entry older than `max_age` is never returned as a hit.
//!   It is treated as absent on read and physically removed by the
//!   periodic sweep (see [`maintenance`](crate::gateway::maintenance)).
//!
//! # Locking
//!
//! A single mutex guards the entry map. All mutation — `put`, eviction,
//! the sweep, `clear` — and the read-side bookkeeping (`last_access`,
//! `hits`) run under it, so concurrent readers can't lose updates.
//! Running counters are atomics and are read without the lock.
//!
//! # Failure semantics
//!
//! Cache operations are pure in-memory map mutation and never fail.
//! Failures originate only in the persistence adapter ([`persist`]) or
//! the upstream fetch, which are handled by their callers.

pub mod persist;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::telemetry;
use crate::types::ContentBundle;
use persist::{DirtySignal, PersistedEntry};

/// Default maximum entry age: 10 minutes.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_millis(600_000);

/// Default maximum number of entries.
pub const DEFAULT_MAX_SIZE: usize = 50;

/// Composite cache key: one logical content grouping in one language.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Logical grouping of related content (CMS collection, UI section).
    pub namespace: String,
    /// Language code the bundle is in.
    pub language: String,
}

impl CacheKey {
    /// Create a key from namespace and language.
    pub fn new(namespace: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            language: language.into(),
        }
    }
}

/// One cached bundle plus its bookkeeping metadata.
///
/// Timestamps are epoch milliseconds so entries survive a snapshot/restore
/// round trip across sessions unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached content bundle.
    pub data: ContentBundle,
    /// Creation/refresh time (epoch ms).
    pub timestamp: u64,
    /// Time of the most recent live hit (epoch ms).
    pub last_access: u64,
    /// Monotonic hit counter. Preserved across a refresh of the same key —
    /// see [`ContentCache::put`].
    pub hits: u64,
}

impl CacheEntry {
    fn is_expired(&self, now: u64, max_age_ms: u64) -> bool {
        now.saturating_sub(self.timestamp) > max_age_ms
    }
}

/// Current epoch time in milliseconds.
///
/// A clock before the epoch yields 0, which makes every entry look ancient —
/// the safe direction (expired, refetch) rather than immortal.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Keyed bundle store with LRU eviction, TTL expiry, and hit/miss counters.
///
/// Constructed once by [`BragiBuilder`](crate::BragiBuilder) and shared via
/// `Arc` — the explicit-instance replacement for the singleton cache the
/// original UI layer kept in module scope.
pub struct ContentCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    max_age_ms: u64,
    max_size: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
    dirty: DirtySignal,
}

impl ContentCache {
    /// Create an empty cache with the given bounds.
    pub fn new(max_age: Duration, max_size: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_age_ms: max_age.as_millis() as u64,
            // A zero-capacity cache would evict everything it's handed.
            max_size: max_size.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
            dirty: DirtySignal::new(),
        }
    }

    /// Create a cache with the default bounds (10 min, 50 entries).
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_MAX_AGE, DEFAULT_MAX_SIZE)
    }

    /// Look up a bundle.
    ///
    /// Returns `None` if no entry exists or the entry has outlived
    /// `max_age` (expired entries count as a miss but stay in the map
    /// until the next sweep). A live hit updates `last_access` and the
    /// entry's hit counter as an observable side effect.
    pub fn get(&self, namespace: &str, language: &str) -> Option<ContentBundle> {
        self.get_at(namespace, language, now_millis(), true)
    }

    /// Like [`get`](Self::get), but without miss accounting.
    ///
    /// The resolver uses this on its fetch path: a miss is only counted
    /// after the fetch future actually completes, so a caller cancelling
    /// mid-fetch leaves the statistics untouched.
    pub(crate) fn lookup(&self, namespace: &str, language: &str) -> Option<ContentBundle> {
        self.get_at(namespace, language, now_millis(), false)
    }

    fn get_at(
        &self,
        namespace: &str,
        language: &str,
        now: u64,
        count_miss: bool,
    ) -> Option<ContentBundle> {
        let key = CacheKey::new(namespace, language);
        let found = {
            let mut entries = self.lock();
            match entries.get_mut(&key) {
                Some(entry) if !entry.is_expired(now, self.max_age_ms) => {
                    entry.last_access = now;
                    entry.hits += 1;
                    Some(entry.data.clone())
                }
                _ => None,
            }
        };
        match found {
            Some(data) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                Some(data)
            }
            None => {
                if count_miss {
                    self.record_miss();
                }
                None
            }
        }
    }

    /// Record a cache miss in the running counters.
    ///
    /// Called by the resolver once a fetch attempt has completed (either
    /// way), per the cancellation rule on [`lookup`](Self::lookup).
    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
    }

    /// Insert or replace the bundle for a key.
    ///
    /// Sets `timestamp = last_access = now`. Overwriting an existing key —
    /// the common TTL-refresh path — preserves its accumulated hit count;
    /// resetting it would undercount exactly the keys popular enough to be
    /// refreshed often. A fresh insert starts at one hit. If the insertion
    /// pushes the map past `max_size`, LRU eviction runs before returning.
    pub fn put(&self, namespace: &str, language: &str, data: ContentBundle) {
        self.put_at(namespace, language, data, now_millis());
    }

    fn put_at(&self, namespace: &str, language: &str, data: ContentBundle, now: u64) {
        let key = CacheKey::new(namespace, language);
        let mut entries = self.lock();
        let hits = entries.get(&key).map(|e| e.hits).unwrap_or(1);
        entries.insert(
            key,
            CacheEntry {
                data,
                timestamp: now,
                last_access: now,
                hits,
            },
        );
        if entries.len() > self.max_size {
            self.evict_locked(&mut entries);
        }
        drop(entries);
        self.dirty.mark();
    }

    /// Evict least-recently-accessed entries down to the hysteresis target.
    ///
    /// Returns the number of entries removed. Normally runs automatically
    /// from [`put`](Self::put); exposed for explicit pressure relief.
    pub fn evict_lru(&self) -> usize {
        let mut entries = self.lock();
        let evicted = self.evict_locked(&mut entries);
        drop(entries);
        if evicted > 0 {
            self.dirty.mark();
        }
        evicted
    }

    /// Eviction target: 80% of capacity, rounded up.
    ///
    /// Rounding up keeps tiny caches honest — a `max_size` of 2 must still
    /// hold 2 entries after eviction, not be flushed to 1 on every insert.
    fn eviction_target(&self) -> usize {
        (self.max_size * 4).div_ceil(5)
    }

    fn evict_locked(&self, entries: &mut HashMap<CacheKey, CacheEntry>) -> usize {
        let target = self.eviction_target();
        if entries.len() <= target {
            return 0;
        }
        let mut by_access: Vec<(CacheKey, u64)> = entries
            .iter()
            .map(|(k, e)| (k.clone(), e.last_access))
            .collect();
        by_access.sort_by_key(|(_, last_access)| *last_access);

        let mut evicted = 0;
        for (key, _) in by_access {
            if entries.len() <= target {
                break;
            }
            entries.remove(&key);
            evicted += 1;
        }
        if evicted > 0 {
            self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL).increment(evicted as u64);
            tracing::debug!(evicted, target, "evicted least-recently-used entries");
        }
        evicted
    }

    /// Remove every entry older than `max_age`. Returns the count removed.
    ///
    /// Intended to run on a fixed interval from the maintenance sweeper,
    /// independent of read/write traffic.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(now_millis())
    }

    fn sweep_expired_at(&self, now: u64) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now, self.max_age_ms));
        let swept = before - entries.len();
        drop(entries);
        if swept > 0 {
            self.expirations.fetch_add(swept as u64, Ordering::Relaxed);
            metrics::counter!(telemetry::CACHE_EXPIRATIONS_TOTAL).increment(swept as u64);
            tracing::debug!(swept, "swept expired entries");
            self.dirty.mark();
        }
        swept
    }

    /// Remove one `(namespace, language)` entry. Returns whether it existed.
    ///
    /// Used when a single CMS entry is republished and its cached bundle
    /// is known stale.
    pub fn remove(&self, namespace: &str, language: &str) -> bool {
        let key = CacheKey::new(namespace, language);
        let removed = self.lock().remove(&key).is_some();
        if removed {
            self.dirty.mark();
        }
        removed
    }

    /// Drop every language's bundle for one namespace. Returns the count
    /// removed. Collection-level counterpart of [`remove`](Self::remove).
    pub fn invalidate_namespace(&self, namespace: &str) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|key, _| key.namespace != namespace);
        let removed = before - entries.len();
        drop(entries);
        if removed > 0 {
            self.dirty.mark();
        }
        removed
    }

    /// Drop all entries and reset the running counters.
    pub fn clear(&self) {
        self.lock().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.expirations.store(0, Ordering::Relaxed);
        self.dirty.mark();
    }

    /// Number of entries currently in the cache (live and expired-unswept).
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the running counters and per-entry bookkeeping.
    pub fn stats(&self) -> CacheStats {
        let now = now_millis();
        let entries = self.lock();
        let per_entry: Vec<EntryStats> = entries
            .iter()
            .map(|(key, entry)| EntryStats {
                namespace: key.namespace.clone(),
                language: key.language.clone(),
                hits: entry.hits,
                age: Duration::from_millis(now.saturating_sub(entry.timestamp)),
                idle: Duration::from_millis(now.saturating_sub(entry.last_access)),
            })
            .collect();
        let total_entries = entries.len();
        let persisted: Vec<PersistedEntry> = entries
            .iter()
            .map(|(key, entry)| PersistedEntry::from_parts(key, entry))
            .collect();
        drop(entries);

        // Serialized size is an estimate of payload weight, not process
        // memory — map overhead and string capacity aren't in it.
        let size_bytes = serde_json::to_vec(&persisted).map(|v| v.len()).unwrap_or(0);

        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        CacheStats {
            total_entries,
            hits,
            misses,
            hit_rate: if lookups > 0 {
                hits as f64 / lookups as f64
            } else {
                0.0
            },
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            size_bytes,
            per_entry,
        }
    }

    /// Clone out all entries for the persistence adapter.
    pub(crate) fn export(&self) -> Vec<PersistedEntry> {
        self.lock()
            .iter()
            .map(|(key, entry)| PersistedEntry::from_parts(key, entry))
            .collect()
    }

    /// Absorb entries from a persisted snapshot.
    ///
    /// Entries already past `max_age` are dropped here rather than loaded
    /// and immediately swept. Later writes win over snapshot data, so this
    /// only runs at startup on an empty cache.
    pub(crate) fn absorb(&self, persisted: Vec<PersistedEntry>) -> usize {
        let now = now_millis();
        let mut entries = self.lock();
        let mut loaded = 0;
        for item in persisted {
            let (key, entry) = item.into_parts();
            if entry.is_expired(now, self.max_age_ms) {
                continue;
            }
            entries.insert(key, entry);
            loaded += 1;
        }
        // Respect the size bound even against an oversized or
        // foreign snapshot.
        if entries.len() > self.max_size {
            self.evict_locked(&mut entries);
        }
        loaded
    }

    /// Signal checked by the debounced persister task.
    pub(crate) fn dirty_signal(&self) -> &DirtySignal {
        &self.dirty
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        // A poisoned lock means a panic mid-mutation elsewhere; the map
        // itself is still a valid map, so recover it rather than spreading
        // the panic through every cache call site.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Counters and per-entry bookkeeping reported by [`ContentCache::stats`].
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Entries currently held (live and expired-unswept).
    pub total_entries: usize,
    /// Live hits since construction or the last [`ContentCache::clear`].
    pub hits: u64,
    /// Misses, counted per completed lookup-plus-fetch attempt.
    pub misses: u64,
    /// `hits / (hits + misses)`, 0.0 when there has been no traffic.
    pub hit_rate: f64,
    /// Entries removed by LRU eviction.
    pub evictions: u64,
    /// Entries removed by the TTL sweep.
    pub expirations: u64,
    /// Serialized-JSON size estimate of the cached payload. An estimate
    /// only — not process memory usage.
    pub size_bytes: usize,
    /// Per-entry breakdown, unordered.
    pub per_entry: Vec<EntryStats>,
}

/// Per-entry slice of [`CacheStats`].
#[derive(Debug, Clone)]
pub struct EntryStats {
    /// Entry namespace.
    pub namespace: String,
    /// Entry language.
    pub language: String,
    /// Hits recorded against this entry (survives refresh).
    pub hits: u64,
    /// Time since the entry was created or refreshed.
    pub age: Duration,
    /// Time since the entry was last read.
    pub idle: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bundle(title: &str) -> ContentBundle {
        let mut b = ContentBundle::new();
        b.insert("title".into(), json!(title));
        b
    }

    fn cache(max_age_ms: u64, max_size: usize) -> ContentCache {
        ContentCache::new(Duration::from_millis(max_age_ms), max_size)
    }

    #[test]
    fn miss_on_empty_cache() {
        let c = ContentCache::with_defaults();
        assert!(c.get("page", "en").is_none());
        assert_eq!(c.stats().misses, 1);
    }

    #[test]
    fn put_then_get() {
        let c = ContentCache::with_defaults();
        c.put("page", "en", bundle("Hello"));
        let got = c.get("page", "en").unwrap();
        assert_eq!(got.get("title"), Some(&json!("Hello")));
        assert_eq!(c.stats().hits, 1);
    }

    #[test]
    fn keys_are_per_language() {
        let c = ContentCache::with_defaults();
        c.put("page", "en", bundle("Hello"));
        c.put("page", "tr", bundle("Merhaba"));
        assert_eq!(c.len(), 2);
        assert_eq!(c.get("page", "tr").unwrap()["title"], json!("Merhaba"));
    }

    #[test]
    fn overwrite_replaces_not_duplicates() {
        let c = ContentCache::with_defaults();
        c.put("page", "en", bundle("v1"));
        c.put("page", "en", bundle("v2"));
        assert_eq!(c.len(), 1);
        assert_eq!(c.get("page", "en").unwrap()["title"], json!("v2"));
    }

    #[test]
    fn overwrite_preserves_hit_count() {
        let c = ContentCache::with_defaults();
        c.put("page", "en", bundle("v1"));
        c.get("page", "en");
        c.get("page", "en");
        c.put("page", "en", bundle("v2")); // refresh
        c.get("page", "en");
        let stats = c.stats();
        let entry = &stats.per_entry[0];
        // 2 hits before refresh + 1 after, on top of the initial insert.
        assert_eq!(entry.hits, 4);
    }

    #[test]
    fn expired_entry_is_absent_before_sweep() {
        let c = cache(1_000, 10);
        c.put_at("page", "en", bundle("old"), 0);
        // t=1000 is exactly max_age: still live.
        assert!(c.get_at("page", "en", 1_000, true).is_some());
        // t=1001 exceeds max_age: treated as absent, but still in the map.
        assert!(c.get_at("page", "en", 1_001, true).is_none());
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn expired_hit_does_not_touch_bookkeeping() {
        let c = cache(1_000, 10);
        c.put_at("page", "en", bundle("old"), 0);
        assert!(c.get_at("page", "en", 5_000, true).is_none());
        let stats = c.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.per_entry[0].hits, 1);
    }

    #[test]
    fn sweep_removes_only_expired() {
        let c = cache(1_000, 10);
        c.put_at("a", "en", bundle("old"), 0);
        c.put_at("b", "en", bundle("fresh"), 900);
        let swept = c.sweep_expired_at(1_500);
        assert_eq!(swept, 1);
        assert_eq!(c.len(), 1);
        assert!(c.get_at("b", "en", 1_500, true).is_some());
        assert_eq!(c.stats().expirations, 1);
    }

    #[test]
    fn eviction_keeps_capacity_entries_for_tiny_caches() {
        let c = cache(60_000, 2);
        c.put_at("a", "en", bundle("a"), 1);
        c.put_at("b", "en", bundle("b"), 2);
        c.put_at("c", "en", bundle("c"), 3);
        // Oldest-accessed entry (a) is evicted; b and c survive.
        assert!(c.get_at("a", "en", 4, true).is_none());
        assert!(c.get_at("b", "en", 4, true).is_some());
        assert!(c.get_at("c", "en", 4, true).is_some());
        assert_eq!(c.stats().evictions, 1);
    }

    #[test]
    fn eviction_removes_oldest_accessed_first() {
        let c = cache(60_000, 4);
        c.put_at("a", "en", bundle("a"), 1);
        c.put_at("b", "en", bundle("b"), 2);
        c.put_at("c", "en", bundle("c"), 3);
        c.put_at("d", "en", bundle("d"), 4);
        // Touch a so it becomes the most recently used.
        assert!(c.get_at("a", "en", 5, true).is_some());
        // Fifth insert: evict down to ceil(4 * 0.8) = 4.
        c.put_at("e", "en", bundle("e"), 6);
        assert!(c.get_at("b", "en", 7, true).is_none());
        assert!(c.get_at("a", "en", 7, true).is_some());
        assert!(c.get_at("e", "en", 7, true).is_some());
    }

    #[test]
    fn eviction_hysteresis_for_default_capacity() {
        let c = cache(60_000, 50);
        for i in 0..51 {
            c.put_at(&format!("ns{i}"), "en", bundle("x"), i as u64);
        }
        // One insert past capacity drains down to ceil(50 * 0.8) = 40.
        assert_eq!(c.len(), 40);
        assert_eq!(c.stats().evictions, 11);
    }

    #[test]
    fn size_bound_holds_after_every_put() {
        let c = cache(60_000, 5);
        for i in 0..100u64 {
            c.put_at(&format!("ns{i}"), "en", bundle("x"), i);
            assert!(c.len() <= 5);
        }
    }

    #[test]
    fn remove_single_key() {
        let c = ContentCache::with_defaults();
        c.put("page", "en", bundle("x"));
        c.put("page", "tr", bundle("y"));
        assert!(c.remove("page", "en"));
        assert!(!c.remove("page", "en"));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn invalidate_namespace_drops_all_languages() {
        let c = ContentCache::with_defaults();
        c.put("page", "en", bundle("x"));
        c.put("page", "tr", bundle("y"));
        c.put("footer", "en", bundle("z"));
        assert_eq!(c.invalidate_namespace("page"), 2);
        assert_eq!(c.len(), 1);
        assert!(c.get("footer", "en").is_some());
    }

    #[test]
    fn clear_resets_counters() {
        let c = ContentCache::with_defaults();
        c.put("page", "en", bundle("x"));
        c.get("page", "en");
        c.get("page", "de");
        c.clear();
        let stats = c.stats();
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn hit_rate_reflects_traffic() {
        let c = ContentCache::with_defaults();
        c.put("page", "en", bundle("x"));
        c.get("page", "en");
        c.get("page", "en");
        c.get("page", "de");
        c.get("page", "fr");
        let stats = c.stats();
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn hit_rate_zero_without_traffic() {
        let c = ContentCache::with_defaults();
        assert_eq!(c.stats().hit_rate, 0.0);
    }

    #[test]
    fn lookup_does_not_count_miss() {
        let c = ContentCache::with_defaults();
        assert!(c.lookup("page", "en").is_none());
        assert_eq!(c.stats().misses, 0);
        c.record_miss();
        assert_eq!(c.stats().misses, 1);
    }

    #[test]
    fn size_bytes_grows_with_content() {
        let c = ContentCache::with_defaults();
        let empty = c.stats().size_bytes;
        c.put("page", "en", bundle("a fairly long title for measurement"));
        assert!(c.stats().size_bytes > empty);
    }

    #[test]
    fn absorb_drops_stale_entries() {
        let c = cache(1_000, 10);
        let now = now_millis();
        let stale = PersistedEntry {
            namespace: "old".into(),
            language: "en".into(),
            data: bundle("stale"),
            timestamp: now.saturating_sub(10_000),
            last_access: now.saturating_sub(10_000),
            hits: 3,
        };
        let fresh = PersistedEntry {
            namespace: "new".into(),
            language: "en".into(),
            data: bundle("fresh"),
            timestamp: now,
            last_access: now,
            hits: 1,
        };
        assert_eq!(c.absorb(vec![stale, fresh]), 1);
        assert!(c.get("new", "en").is_some());
        assert!(c.lookup("old", "en").is_none());
    }

    #[test]
    fn thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let c = Arc::new(ContentCache::with_defaults());
        let mut handles = Vec::new();
        for i in 0..10 {
            let c = Arc::clone(&c);
            handles.push(thread::spawn(move || {
                c.put(&format!("ns{i}"), "en", bundle("x"));
            }));
        }
        for i in 0..10 {
            let c = Arc::clone(&c);
            handles.push(thread::spawn(move || {
                // May or may not see the entry yet — shouldn't panic.
                let _ = c.get(&format!("ns{i}"), "en");
            }));
        }
        for h in handles {
            h.join().expect("thread panicked");
        }
    }
}
