use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

// Rate limit bucket - request timestamps for one IP or session key,
// oldest first
#[derive(Debug, Clone)]
pub struct Bucket {
    pub timestamps: VecDeque<Instant>,
    pub last_touch: Instant,
}

impl Bucket {
    fn new(now: Instant) -> Self {
        Self {
            timestamps: VecDeque::new(),
            last_touch: now,
        }
    }
}

/// Backing storage for limiter buckets.
///
/// The limiter owns its store and serializes every call, so implementations
/// need no internal locking. A shared cache (Redis, KV) can sit behind this
/// without touching the sliding-window logic.
pub trait BucketStore: Send {
    fn get(&self, key: &str) -> Option<&Bucket>;

    /// Drops timestamps at or before `cutoff` and marks the bucket touched.
    /// Returns how many timestamps remain; a missing bucket has none.
    fn prune(&mut self, key: &str, cutoff: Option<Instant>, now: Instant) -> usize;

    /// Records a request at `at`, creating the bucket on first use.
    fn append(&mut self, key: &str, at: Instant);

    fn delete(&mut self, key: &str) -> bool;

    /// Keys whose last touch is more than `idle` before `now`.
    fn idle_keys(&self, now: Instant, idle: Duration) -> Vec<String>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct MemoryBucketStore {
    buckets: HashMap<String, Bucket>,
}

impl MemoryBucketStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BucketStore for MemoryBucketStore {
    fn get(&self, key: &str) -> Option<&Bucket> {
        self.buckets.get(key)
    }

    fn prune(&mut self, key: &str, cutoff: Option<Instant>, now: Instant) -> usize {
        let Some(bucket) = self.buckets.get_mut(key) else {
            return 0;
        };

        // timestamps are chronological, so expired ones sit at the front
        if let Some(cutoff) = cutoff {
            while bucket.timestamps.front().is_some_and(|&t| t <= cutoff) {
                bucket.timestamps.pop_front();
            }
        }
        bucket.last_touch = now;
        bucket.timestamps.len()
    }

    fn append(&mut self, key: &str, at: Instant) {
        let bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| Bucket::new(at));
        bucket.timestamps.push_back(at);
        bucket.last_touch = at;
    }

    fn delete(&mut self, key: &str) -> bool {
        self.buckets.remove(key).is_some()
    }

    fn idle_keys(&self, now: Instant, idle: Duration) -> Vec<String> {
        self.buckets
            .iter()
            .filter(|(_, bucket)| now.saturating_duration_since(bucket.last_touch) > idle)
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.buckets.len()
    }
}
