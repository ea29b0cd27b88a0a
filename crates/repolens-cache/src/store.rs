//! Cache store trait and statistics
//!
//! The gateway only ever issues `get` and `set` against the store. Entries
//! are serialized JSON strings; the store does not interpret them. A store
//! error is not fatal to a request: callers treat a failed `get` as a miss
//! and a failed `set` as a skipped write.

use async_trait::async_trait;
use std::time::Duration;

/// Key-value store with per-entry expiration
///
/// Implementations must be `Send + Sync` so a single store can be shared
/// across concurrently served requests. Concurrent writers for the same key
/// are allowed; last writer wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up a live entry, `None` on miss or expiry
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Insert or overwrite an entry with the given time-to-live
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()>;
}

/// Counters exposed by stores that track their own effectiveness
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    /// Hit rate in percent, 0.0 when nothing was looked up yet
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        {
            self.hits as f64 / total as f64 * 100.0
        }
    }
}
