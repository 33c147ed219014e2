//! Sliding-window rate limiting for the public edge functions.
//!
//! Two independent bucket maps: one keyed by client IP (with a short burst
//! sub-limit layered under the main window) and one keyed by
//! `"{session_id}:{identifier}"` for per-visitor actions such as one vote
//! per feedback item. Limits are per process; instances do not share state.

mod http;
mod store;

pub use http::{SessionLimit, apply_rate_limit, client_ip};
pub use store::{Bucket, BucketStore, MemoryBucketStore};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::time::interval;

use crate::metrics::RATE_LIMIT_BUCKETS;

/// Interval the burst sub-limit counts over.
pub const BURST_WINDOW: Duration = Duration::from_secs(10);

/// `retry_after` reported for burst rejections.
pub const BURST_RETRY_AFTER_SECS: u64 = 10;

/// Buckets untouched for longer than this are dropped by the sweep.
pub const DEFAULT_BUCKET_RETENTION: Duration = Duration::from_secs(60 * 60);

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPreset {
    pub window: Duration,
    pub max_requests: u32,
    pub burst: u32,
}

impl RateLimitPreset {
    pub const fn new(window: Duration, max_requests: u32, burst: u32) -> Self {
        Self {
            window,
            max_requests,
            burst,
        }
    }

    // Anonymous reads of roadmap / changelog
    pub const PUBLIC_READ: Self = Self::new(Duration::from_secs(60), 60, 10);

    // Anonymous writes (feedback, votes)
    pub const PUBLIC_WRITE: Self = Self::new(Duration::from_secs(60), 10, 3);

    // Page view beacons
    pub const TRACKING: Self = Self::new(Duration::from_secs(60), 120, 20);

    // One feedback submission per board per visitor every five minutes
    pub const FEEDBACK_SESSION: Self = Self::new(Duration::from_secs(5 * 60), 1, 1);

    // One vote per feedback item per visitor per day
    pub const VOTE_SESSION: Self = Self::new(Duration::from_secs(24 * 60 * 60), 1, 1);
}

/// Outcome of a single limiter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Seconds until a retry can succeed; set only on rejection.
    pub retry_after: Option<u64>,
    pub burst_exceeded: bool,
}

impl RateLimitResult {
    fn allowed(limit: u32, remaining: u32) -> Self {
        Self {
            allowed: true,
            limit,
            remaining,
            retry_after: None,
            burst_exceeded: false,
        }
    }

    fn rejected(limit: u32, retry_after: u64, burst_exceeded: bool) -> Self {
        Self {
            allowed: false,
            limit,
            remaining: 0,
            retry_after: Some(retry_after),
            burst_exceeded,
        }
    }
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_nanos().div_ceil(1_000_000_000) as u64
}

pub struct RateLimiter<S: BucketStore = MemoryBucketStore> {
    ip_buckets: Mutex<S>,
    session_buckets: Mutex<S>,
}

impl RateLimiter<MemoryBucketStore> {
    pub fn new() -> Self {
        Self::with_stores(MemoryBucketStore::new(), MemoryBucketStore::new())
    }
}

impl Default for RateLimiter<MemoryBucketStore> {
    fn default() -> Self {
        Self::new()
    }
}

// A panic mid-check leaves at worst one missing timestamp; keep serving.
fn lock<S>(store: &Mutex<S>) -> MutexGuard<'_, S> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: BucketStore> RateLimiter<S> {
    pub fn with_stores(ip_store: S, session_store: S) -> Self {
        Self {
            ip_buckets: Mutex::new(ip_store),
            session_buckets: Mutex::new(session_store),
        }
    }

    pub fn check_ip_limit(&self, ip: &str, preset: &RateLimitPreset) -> RateLimitResult {
        self.check_ip_limit_at(ip, preset, Instant::now())
    }

    pub fn check_ip_limit_at(
        &self,
        ip: &str,
        preset: &RateLimitPreset,
        now: Instant,
    ) -> RateLimitResult {
        let mut store = lock(&self.ip_buckets);
        check_window(&mut *store, ip, preset, now, true)
    }

    pub fn check_session_limit(
        &self,
        session_id: &str,
        identifier: &str,
        preset: &RateLimitPreset,
    ) -> RateLimitResult {
        self.check_session_limit_at(session_id, identifier, preset, Instant::now())
    }

    // Same window as the IP check, without the burst layer
    pub fn check_session_limit_at(
        &self,
        session_id: &str,
        identifier: &str,
        preset: &RateLimitPreset,
        now: Instant,
    ) -> RateLimitResult {
        let key = format!("{session_id}:{identifier}");
        let mut store = lock(&self.session_buckets);
        check_window(&mut *store, &key, preset, now, false)
    }

    /// Removes buckets idle for longer than `retention` from both maps and
    /// returns how many were dropped.
    pub fn sweep(&self, retention: Duration) -> usize {
        self.sweep_at(Instant::now(), retention)
    }

    pub fn sweep_at(&self, now: Instant, retention: Duration) -> usize {
        [&self.ip_buckets, &self.session_buckets]
            .into_iter()
            .map(|buckets| {
                let mut store = lock(buckets);
                store
                    .idle_keys(now, retention)
                    .iter()
                    .filter(|key| store.delete(key))
                    .count()
            })
            .sum()
    }

    pub fn tracked_buckets(&self) -> usize {
        lock(&self.ip_buckets).len() + lock(&self.session_buckets).len()
    }
}

fn check_window<S: BucketStore + ?Sized>(
    store: &mut S,
    key: &str,
    preset: &RateLimitPreset,
    now: Instant,
    with_burst: bool,
) -> RateLimitResult {
    let count = store.prune(key, now.checked_sub(preset.window), now);

    if count >= preset.max_requests as usize {
        let oldest = store
            .get(key)
            .and_then(|b| b.timestamps.front().copied())
            .unwrap_or(now);
        let wait = (oldest + preset.window).saturating_duration_since(now);
        return RateLimitResult::rejected(preset.max_requests, ceil_secs(wait), false);
    }

    if with_burst {
        let burst_cutoff = now.checked_sub(BURST_WINDOW);
        let recent = store
            .get(key)
            .map(|b| {
                b.timestamps
                    .iter()
                    .filter(|&&t| burst_cutoff.is_none_or(|cutoff| t > cutoff))
                    .count()
            })
            .unwrap_or(0);

        if recent >= preset.burst as usize {
            return RateLimitResult::rejected(preset.max_requests, BURST_RETRY_AFTER_SECS, true);
        }
    }

    store.append(key, now);
    let remaining = preset.max_requests as usize - count - 1;
    RateLimitResult::allowed(preset.max_requests, remaining as u32)
}

// Background sweep - drops idle buckets so memory tracks active callers
pub async fn bucket_sweeper(limiter: Arc<RateLimiter>, every: Duration, retention: Duration) {
    let mut ticker = interval(every);

    tracing::info!(?every, ?retention, "rate limit sweeper started");

    loop {
        ticker.tick().await;

        let removed = limiter.sweep(retention);
        let tracked = limiter.tracked_buckets();
        RATE_LIMIT_BUCKETS.set(tracked as f64);

        if removed > 0 {
            tracing::debug!(removed, tracked, "swept idle rate limit buckets");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IP: &str = "203.0.113.7";

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn burst_rejects_eleventh_rapid_request() {
        let limiter = RateLimiter::new();
        let preset = RateLimitPreset::new(secs(60), 60, 10);
        let base = Instant::now();

        for i in 0..10 {
            let res = limiter.check_ip_limit_at(IP, &preset, base + Duration::from_millis(i * 100));
            assert!(res.allowed, "request {i} should pass");
            assert_eq!(res.remaining, 60 - (i as u32) - 1);
        }

        let res = limiter.check_ip_limit_at(IP, &preset, base + secs(1));
        assert!(!res.allowed);
        assert!(res.burst_exceeded);
        assert_eq!(res.retry_after, Some(10));
    }

    #[test]
    fn burst_clears_after_ten_seconds() {
        let limiter = RateLimiter::new();
        let preset = RateLimitPreset::new(secs(60), 60, 2);
        let base = Instant::now();

        assert!(limiter.check_ip_limit_at(IP, &preset, base).allowed);
        assert!(limiter.check_ip_limit_at(IP, &preset, base).allowed);
        let res = limiter.check_ip_limit_at(IP, &preset, base + secs(1));
        assert!(res.burst_exceeded);

        let later = base + secs(1) + secs(res.retry_after.unwrap());
        assert!(limiter.check_ip_limit_at(IP, &preset, later).allowed);
    }

    #[test]
    fn window_rejection_reports_time_until_oldest_expires() {
        let limiter = RateLimiter::new();
        let preset = RateLimitPreset::new(secs(60), 3, 10);
        let base = Instant::now();

        for offset in [0, 15, 30] {
            assert!(limiter.check_ip_limit_at(IP, &preset, base + secs(offset)).allowed);
        }

        let res = limiter.check_ip_limit_at(IP, &preset, base + Duration::from_millis(40_500));
        assert!(!res.allowed);
        assert!(!res.burst_exceeded);
        // oldest at 0s expires at 60s; 19.5s away rounds up
        assert_eq!(res.retry_after, Some(20));
        assert_eq!(res.remaining, 0);
    }

    #[test]
    fn waiting_retry_after_yields_acceptance() {
        let limiter = RateLimiter::new();
        let preset = RateLimitPreset::new(secs(60), 2, 10);
        let base = Instant::now();

        assert!(limiter.check_ip_limit_at(IP, &preset, base).allowed);
        assert!(limiter.check_ip_limit_at(IP, &preset, base + secs(20)).allowed);

        let rejected_at = base + Duration::from_millis(25_250);
        let res = limiter.check_ip_limit_at(IP, &preset, rejected_at);
        assert!(!res.allowed);

        let retry_at = rejected_at + secs(res.retry_after.unwrap());
        assert!(limiter.check_ip_limit_at(IP, &preset, retry_at).allowed);
    }

    #[test]
    fn accepted_requests_never_exceed_window_limit() {
        let limiter = RateLimiter::new();
        let preset = RateLimitPreset::new(secs(30), 5, 5);
        let base = Instant::now();

        // one attempt per second for two minutes
        let accepted: Vec<Instant> = (0..120)
            .map(|s| base + secs(s))
            .filter(|&at| limiter.check_ip_limit_at(IP, &preset, at).allowed)
            .collect();

        for (i, &start) in accepted.iter().enumerate() {
            let in_window = accepted[i..]
                .iter()
                .take_while(|&&t| t < start + preset.window)
                .count();
            assert!(in_window <= preset.max_requests as usize);

            let in_burst = accepted[i..]
                .iter()
                .take_while(|&&t| t < start + BURST_WINDOW)
                .count();
            assert!(in_burst <= preset.burst as usize);
        }
        assert!(accepted.len() >= 15);
    }

    #[test]
    fn session_limit_keys_on_session_and_identifier() {
        let limiter = RateLimiter::new();
        let preset = RateLimitPreset::new(secs(300), 1, 10);
        let base = Instant::now();

        assert!(limiter.check_session_limit_at("sess1", "board42", &preset, base).allowed);

        let res = limiter.check_session_limit_at("sess1", "board42", &preset, base + secs(60));
        assert!(!res.allowed);
        assert!(!res.burst_exceeded);
        assert_eq!(res.retry_after, Some(240));

        // other board, other session: independent buckets
        let later = base + secs(60);
        assert!(limiter.check_session_limit_at("sess1", "board43", &preset, later).allowed);
        assert!(limiter.check_session_limit_at("sess2", "board42", &preset, later).allowed);
    }

    #[test]
    fn session_limit_has_no_burst_layer() {
        let limiter = RateLimiter::new();
        let preset = RateLimitPreset::new(secs(60), 5, 1);
        let base = Instant::now();

        for i in 0..5 {
            let at = base + Duration::from_millis(i);
            assert!(limiter.check_session_limit_at("s", "x", &preset, at).allowed);
        }
    }

    #[test]
    fn ip_and_session_maps_are_separate() {
        let limiter = RateLimiter::new();
        let preset = RateLimitPreset::new(secs(60), 1, 1);
        let base = Instant::now();

        assert!(limiter.check_ip_limit_at("sess:thing", &preset, base).allowed);
        assert!(limiter.check_session_limit_at("sess", "thing", &preset, base).allowed);
        assert_eq!(limiter.tracked_buckets(), 2);
    }

    #[test]
    fn sweep_drops_buckets_idle_over_an_hour() {
        let limiter = RateLimiter::new();
        let preset = RateLimitPreset::PUBLIC_READ;
        let base = Instant::now();

        limiter.check_ip_limit_at("idle", &preset, base);
        limiter.check_session_limit_at("s1", "board", &preset, base);
        limiter.check_ip_limit_at("busy", &preset, base + secs(3000));

        let removed = limiter.sweep_at(base + secs(3601), DEFAULT_BUCKET_RETENTION);
        assert_eq!(removed, 2);
        assert_eq!(limiter.tracked_buckets(), 1);

        // the swept key starts from scratch
        let res = limiter.check_ip_limit_at("idle", &preset, base + secs(3602));
        assert_eq!(res.remaining, preset.max_requests - 1);
    }

    #[test]
    fn sweep_keeps_recently_touched_buckets() {
        let limiter = RateLimiter::new();
        let base = Instant::now();
        limiter.check_ip_limit_at(IP, &RateLimitPreset::PUBLIC_READ, base);

        assert_eq!(limiter.sweep_at(base + secs(3600), DEFAULT_BUCKET_RETENTION), 0);
        assert_eq!(limiter.tracked_buckets(), 1);
    }
}
