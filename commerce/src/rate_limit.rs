//! Fixed-window rate limiting per client.
//!
//! Each window is a KV counter `ratelimit:{namespace}:{client}:{bucket}`
//! where `bucket = now / window`. The first hit in a window sets a TTL of
//! the window plus a few seconds. When the KV store fails, counting falls
//! back to process memory so a store outage does not disable the limit.

use std::collections::HashMap;
use std::sync::Arc;
use storefront_core::{Clock, KvStore};
use tokio::sync::Mutex;
use tracing::{debug, error};

/// Extra TTL past the window end.
const EXPIRY_SLACK_SECS: u64 = 5;

/// Limit for one namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Requests allowed per window (at least 1).
    pub limit: u64,
    /// Window length in seconds (at least 1).
    pub window_secs: u64,
}

impl RateLimitPolicy {
    /// Checkout default: 20 per minute.
    pub const CHECKOUT: Self = Self::new(20, 60);

    /// Admin login default: 10 per five minutes.
    pub const LOGIN: Self = Self::new(10, 300);

    /// Create a policy, clamping both values to at least 1.
    #[must_use]
    pub const fn new(limit: u64, window_secs: u64) -> Self {
        Self {
            limit: if limit == 0 { 1 } else { limit },
            window_secs: if window_secs == 0 { 1 } else { window_secs },
        }
    }
}

/// Verdict for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Policy limit.
    pub limit: u64,
    /// Requests left in this window.
    pub remaining: u64,
    /// Seconds until the window resets (at least 1).
    pub retry_after_secs: u64,
}

#[derive(Debug, Clone, Copy)]
struct MemoryBucket {
    count: u64,
    expires_at_ms: i64,
}

/// Rate limiter over a KV store.
#[derive(Clone)]
pub struct RateLimiter<K> {
    kv: K,
    clock: Arc<dyn Clock>,
    memory: Arc<Mutex<HashMap<String, MemoryBucket>>>,
}

impl<K: KvStore> RateLimiter<K> {
    /// Create a limiter.
    pub fn new(kv: K, clock: Arc<dyn Clock>) -> Self {
        Self {
            kv,
            clock,
            memory: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Count a hit for `client` in `namespace` and decide.
    pub async fn check(&self, namespace: &str, client: &str, policy: RateLimitPolicy) -> RateLimitDecision {
        let policy = RateLimitPolicy::new(policy.limit, policy.window_secs);
        let now_ms = self.clock.unix_millis();
        let window_ms = i64::try_from(policy.window_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
        let bucket = now_ms.div_euclid(window_ms);
        let window_end_ms = bucket.saturating_add(1).saturating_mul(window_ms);
        let retry_after_secs = u64::try_from((window_end_ms - now_ms + 999) / 1000)
            .unwrap_or(1)
            .max(1);
        let key = bucket_key(namespace, client, bucket);

        let count = match self.count_in_store(&key, policy.window_secs).await {
            Ok(count) => count,
            Err(err) => {
                error!(namespace, error = %err, "Rate limit store error; counting in memory");
                self.count_in_memory(&key, now_ms, window_ms).await
            }
        };

        let decision = RateLimitDecision {
            allowed: count <= policy.limit,
            limit: policy.limit,
            remaining: policy.limit.saturating_sub(count),
            retry_after_secs,
        };
        if !decision.allowed {
            debug!(namespace, client, count, "Rate limit exceeded");
        }
        decision
    }

    async fn count_in_store(&self, key: &str, window_secs: u64) -> storefront_core::Result<u64> {
        let count = self.kv.incr_by(key, 1).await?;
        if count == 1 {
            self.kv.expire(key, window_secs + EXPIRY_SLACK_SECS).await?;
        }
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn count_in_memory(&self, key: &str, now_ms: i64, window_ms: i64) -> u64 {
        let mut memory = self.memory.lock().await;
        memory.retain(|_, bucket| bucket.expires_at_ms > now_ms);
        let bucket = memory.entry(key.to_string()).or_insert(MemoryBucket {
            count: 0,
            expires_at_ms: now_ms.saturating_add(window_ms),
        });
        bucket.count += 1;
        bucket.count
    }
}

/// Replace characters outside `[A-Za-z0-9_.:-]` with `_`.
fn key_part(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn bucket_key(namespace: &str, client: &str, bucket: i64) -> String {
    format!("ratelimit:{}:{}:{bucket}", key_part(namespace), key_part(client))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use storefront_testing::{FixedClock, MemoryKvStore};

    #[test]
    fn test_key_sanitizing() {
        assert_eq!(bucket_key("admin-login", "10.0.0.1", 7), "ratelimit:admin-login:10.0.0.1:7");
        assert_eq!(bucket_key("x", "2001:db8::1 ", 1), "ratelimit:x:2001:db8::1_:1");
        assert_eq!(key_part("a/b?c"), "a_b_c");
    }

    #[test]
    fn test_policy_clamps() {
        assert_eq!(RateLimitPolicy::new(0, 0), RateLimitPolicy { limit: 1, window_secs: 1 });
    }

    #[tokio::test]
    async fn test_limit_within_window() {
        let kv = MemoryKvStore::new();
        let clock = Arc::new(FixedClock::at_unix(1_000_010));
        let limiter = RateLimiter::new(kv.clone(), clock);
        let policy = RateLimitPolicy::new(2, 60);

        let first = limiter.check("checkout", "1.2.3.4", policy).await;
        assert!(first.allowed);
        assert_eq!(first.remaining, 1);
        assert_eq!(first.retry_after_secs, 10);

        assert!(limiter.check("checkout", "1.2.3.4", policy).await.allowed);
        let third = limiter.check("checkout", "1.2.3.4", policy).await;
        assert!(!third.allowed);
        assert_eq!(third.remaining, 0);

        assert!(limiter.check("checkout", "5.6.7.8", policy).await.allowed);
        assert_eq!(kv.ttl("ratelimit:checkout:1.2.3.4:16666").await, Some(65));
    }

    #[tokio::test]
    async fn test_memory_fallback_when_store_fails() {
        let kv = MemoryKvStore::new();
        kv.fail_writes(true);
        let limiter = RateLimiter::new(kv, Arc::new(FixedClock::at_unix(0)));
        let policy = RateLimitPolicy::new(1, 10);

        assert!(limiter.check("login", "c", policy).await.allowed);
        assert!(!limiter.check("login", "c", policy).await.allowed);
    }
}
