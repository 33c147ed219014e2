use dashmap::DashMap;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::interval;

use crate::metrics::{CACHE_HITS, CACHE_MISSES, CACHE_SIZE};

// Cache entry with timestamp
#[derive(Clone)]
pub struct CacheEntry {
    pub body: Value,
    pub created_at: Instant,
}

// Create a cache key (hash of endpoint + query params)
pub fn make_cache_key(endpoint: &str, params: &[(&str, &str)]) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update(endpoint);
    for (name, value) in sorted {
        hasher.update([0u8]);
        hasher.update(name);
        hasher.update([b'=']);
        hasher.update(value);
    }
    format!("{:x}", hasher.finalize())
}

// In-process cache for anonymous public reads
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(entry) = self.entries.get(key) {
            if entry.created_at.elapsed() < self.ttl {
                CACHE_HITS.inc();
                return Some(entry.body.clone());
            }
        }
        CACHE_MISSES.inc();
        None
    }

    pub fn insert(&self, key: String, body: Value) {
        self.entries.insert(
            key,
            CacheEntry {
                body,
                created_at: Instant::now(),
            },
        );
        CACHE_SIZE.set(self.entries.len() as f64);
    }

    // Drop expired entries
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.created_at.elapsed() < self.ttl);
        CACHE_SIZE.set(self.entries.len() as f64);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// Periodically purges expired entries so stale keys don't pile up
pub async fn cache_janitor(cache: Arc<ResponseCache>, every: Duration) {
    let mut ticker = interval(every);
    loop {
        ticker.tick().await;
        let purged = cache.purge_expired();
        if purged > 0 {
            tracing::debug!(purged, remaining = cache.len(), "purged expired cache entries");
        }
    }
}
