use lru::LruCache;
use std::collections::HashMap;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::time::Instant;

use crate::language::Language;

/// Translations keyed by the exact source text and target language.
///
/// Unbounded unless built with a capacity, in which case the least recently
/// used entry is evicted first.
#[derive(Debug)]
pub struct TranslationCache {
    entries: LruCache<(String, Language), String>,
}

impl TranslationCache {
    pub fn unbounded() -> Self {
        Self {
            entries: LruCache::unbounded(),
        }
    }

    pub fn bounded(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// `0` means unbounded.
    pub fn with_capacity(capacity: usize) -> Self {
        match NonZeroUsize::new(capacity) {
            Some(capacity) => Self::bounded(capacity),
            None => Self::unbounded(),
        }
    }

    pub fn get(&mut self, text: &str, language: Language) -> Option<String> {
        self.entries.get(&(text.to_string(), language)).cloned()
    }

    pub fn put(&mut self, text: &str, language: Language, translation: String) {
        self.entries.put((text.to_string(), language), translation);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TranslationCache {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Map whose entries go stale after a fixed time-to-live.
#[derive(Debug)]
pub struct TimedCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, (Instant, V)>,
}

impl<K: Eq + Hash, V: Clone> TimedCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries
            .get(key)
            .filter(|(stored_at, _)| stored_at.elapsed() < self.ttl)
            .map(|(_, value)| value.clone())
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(key, (Instant::now(), value));
    }

    /// Drop stale entries, returning how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, (stored_at, _)| stored_at.elapsed() < ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
