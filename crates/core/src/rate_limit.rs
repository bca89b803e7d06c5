//! Per-client token-bucket admission control.
//!
//! Each client key owns an independent bucket holding up to `burst` tokens
//! that refills continuously at `requests_per_second`. Buckets are created
//! full on first sight of a key and evicted by [`RateLimiter::evict_idle`]
//! once the key has been quiet for `idle_timeout`.
//!
//! Buckets live in a sharded [`DashMap`]: an `allow` call only locks the shard
//! holding its key, and eviction walks shards one at a time, so neither path
//! blocks unrelated keys for longer than a single bucket update.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Default steady-state refill rate.
pub const DEFAULT_REQUESTS_PER_SECOND: f64 = 2.0;

/// Default bucket capacity.
pub const DEFAULT_BURST: u32 = 4;

/// Default quiet period after which a client's bucket is dropped.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(180);

/// Default interval between eviction sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// When false every call is admitted and no state is kept.
    pub enabled: bool,
    /// Tokens added per second.
    pub requests_per_second: f64,
    /// Bucket capacity, and the number of tokens a new bucket starts with.
    pub burst: u32,
    pub idle_timeout: Duration,
    pub sweep_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
            burst: DEFAULT_BURST,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
    last_seen: Instant,
}

impl Bucket {
    fn full(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_refill: now,
            last_seen: now,
        }
    }

    fn refill(&mut self, now: Instant, rate: f64, capacity: f64) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * rate).min(capacity);
        self.last_refill = now;
    }
}

/// Process-wide registry of client buckets.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    clients: DashMap<String, Bucket>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            clients: DashMap::new(),
        }
    }

    /// A limiter that admits everything.
    pub fn disabled() -> Self {
        Self::new(RateLimitConfig {
            enabled: false,
            ..RateLimitConfig::default()
        })
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Admit or reject one request from `key`.
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    /// [`allow`](Self::allow) with an explicit monotonic timestamp.
    pub fn allow_at(&self, key: &str, now: Instant) -> bool {
        if !self.config.enabled {
            return true;
        }
        let capacity = f64::from(self.config.burst);

        let mut bucket = self
            .clients
            .entry(key.to_owned())
            .or_insert_with(|| Bucket::full(capacity, now));
        bucket.refill(now, self.config.requests_per_second, capacity);
        bucket.last_seen = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Drop buckets whose key has not been seen for `idle_timeout`.
    /// Returns the number of buckets removed.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let idle = self.config.idle_timeout;
        let before = self.clients.len();
        self.clients
            .retain(|_, bucket| now.saturating_duration_since(bucket.last_seen) < idle);
        before.saturating_sub(self.clients.len())
    }

    /// Number of keys currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }
}
