//! In-memory TTL cache
//!
//! Entries expire lazily: an expired entry is dropped on the read that
//! finds it. There is no background sweeper; `purge_expired` can be called
//! by whoever owns the store if memory pressure ever matters.

use crate::store::{CacheStats, CacheStore};
use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// Process-local cache store with per-entry TTL and hit/miss counters
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
    hits: Mutex<u64>,
    misses: Mutex<u64>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current counters and live entry count
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: *self.hits.lock().unwrap(),
            misses: *self.misses.lock().unwrap(),
            entries: self.entries.lock().unwrap().len(),
        }
    }

    /// Drop every entry whose TTL has elapsed
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries
            .lock()
            .unwrap()
            .retain(|_, entry| entry.expires_at > now);
    }

    /// Drop all entries and reset counters
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
        *self.hits.lock().unwrap() = 0;
        *self.misses.lock().unwrap() = 0;
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut entries = self.entries.lock().unwrap();
        let live = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        };
        drop(entries);

        if live.is_some() {
            *self.hits.lock().unwrap() += 1;
            debug!("cache hit: {}", key);
        } else {
            *self.misses.lock().unwrap() += 1;
            debug!("cache miss: {}", key);
        }
        Ok(live)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.lock().unwrap().insert(key.to_string(), entry);
        Ok(())
    }
}
