/*!
 * Translation caching functionality.
 *
 * Translated chunks are stored under a fingerprint of their exact source
 * text plus the language pair, so repeated paragraphs (within one document
 * or across documents) reach the backend only once. The cache is an explicit
 * object shared by cloning; clones see the same storage.
 *
 * Eviction is optional: a capacity bound evicts the least recently used
 * entry, and a TTL expires entries on read. Both default to off.
 */

use log::debug;
use parking_lot::{Mutex, RwLock};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OwnedMutexGuard;

/// Fixed-length digest of a chunk's exact text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// SHA-256 of the text, as 64 lowercase hex characters
    pub fn of(text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cache key combining source fingerprint, source language, and target language
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    fingerprint: Fingerprint,
    source_language: String,
    target_language: String,
}

impl CacheKey {
    /// Create a new cache key
    pub fn new(source_text: &str, source_language: &str, target_language: &str) -> Self {
        Self {
            fingerprint: Fingerprint::of(source_text),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
        }
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}

/// Eviction settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachePolicy {
    /// Maximum number of entries; the least recently used is evicted beyond it
    pub max_entries: Option<usize>,
    /// Maximum age of an entry
    pub ttl: Option<Duration>,
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub evictions: usize,
    pub hit_rate: f64,
}

#[derive(Debug)]
struct CacheEntry {
    translation: String,
    inserted_at: Instant,
    last_access: u64,
}

type InFlight = Arc<Mutex<HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>>>;

/// Translation cache for storing and retrieving translations
#[derive(Debug, Clone)]
pub struct TranslationCache {
    /// Internal cache storage
    entries: Arc<RwLock<HashMap<CacheKey, CacheEntry>>>,

    /// Per-key locks held while a translation for that key is being produced
    in_flight: InFlight,

    hits: Arc<AtomicUsize>,
    misses: Arc<AtomicUsize>,
    evictions: Arc<AtomicUsize>,

    /// Logical clock for recency ordering
    clock: Arc<AtomicU64>,

    policy: CachePolicy,

    /// Whether caching is enabled
    enabled: bool,
}

impl TranslationCache {
    /// Create an unbounded translation cache
    pub fn new(enabled: bool) -> Self {
        Self::build(enabled, CachePolicy::default())
    }

    /// Create an enabled cache with the given eviction policy
    pub fn with_policy(policy: CachePolicy) -> Self {
        Self::build(true, policy)
    }

    fn build(enabled: bool, policy: CachePolicy) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            hits: Arc::new(AtomicUsize::new(0)),
            misses: Arc::new(AtomicUsize::new(0)),
            evictions: Arc::new(AtomicUsize::new(0)),
            clock: Arc::new(AtomicU64::new(0)),
            policy,
            enabled,
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        self.policy.ttl.is_some_and(|ttl| entry.inserted_at.elapsed() >= ttl)
    }

    /// Get a translation from the cache
    pub fn get(&self, key: &CacheKey) -> Option<String> {
        if !self.enabled {
            return None;
        }

        let mut entries = self.entries.write();
        let expired = entries.get(key).is_some_and(|entry| self.is_expired(entry));
        if expired {
            entries.remove(key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!("Cache entry {} expired", short(key));
        }

        match entries.get_mut(key) {
            Some(entry) => {
                entry.last_access = self.tick();
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit for {} ({} -> {})", short(key), key.source_language, key.target_language);
                Some(entry.translation.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache miss for {} ({} -> {})", short(key), key.source_language, key.target_language);
                None
            }
        }
    }

    /// Store a translation in the cache
    pub fn store(&self, key: &CacheKey, translation: &str) {
        if !self.enabled {
            return;
        }

        let mut entries = self.entries.write();

        if let Some(max) = self.policy.max_entries {
            while !entries.contains_key(key) && entries.len() >= max.max(1) {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_access)
                    .map(|(k, _)| k.clone());
                match oldest {
                    Some(oldest) => {
                        entries.remove(&oldest);
                        self.evictions.fetch_add(1, Ordering::Relaxed);
                        debug!("Evicted least recently used entry {}", short(&oldest));
                    }
                    None => break,
                }
            }
        }

        entries.insert(
            key.clone(),
            CacheEntry {
                translation: translation.to_string(),
                inserted_at: Instant::now(),
                last_access: self.tick(),
            },
        );

        debug!("Cached translation for {}", short(key));
    }

    /// Acquire the in-flight lock for a key.
    ///
    /// While the returned guard is alive, other tasks asking for the same key
    /// wait, so lookup, translation and store happen once per key.
    pub async fn lock_key(&self, key: &CacheKey) -> KeyGuard {
        let lock = {
            let mut in_flight = self.in_flight.lock();
            in_flight
                .entry(key.clone())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };

        let guard = lock.clone().lock_owned().await;

        KeyGuard {
            key: key.clone(),
            lock,
            registry: self.in_flight.clone(),
            _guard: guard,
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        CacheStats {
            hits,
            misses,
            evictions: self.evictions.load(Ordering::Relaxed),
            hit_rate,
        }
    }

    /// Clear the cache and its counters
    pub fn clear(&self) {
        self.entries.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);

        debug!("Translation cache cleared");
    }

    /// Get the number of entries in the cache
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Check if the cache is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }
}

impl Default for TranslationCache {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Exclusive hold on one cache key; see [`TranslationCache::lock_key`]
pub struct KeyGuard {
    key: CacheKey,
    lock: Arc<tokio::sync::Mutex<()>>,
    registry: InFlight,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        let mut in_flight = self.registry.lock();
        // registry + self.lock + the owned guard; anything more is a waiter
        if Arc::strong_count(&self.lock) <= 3 {
            in_flight.remove(&self.key);
        }
    }
}

fn short(key: &CacheKey) -> &str {
    &key.fingerprint.as_str()[..12]
}
