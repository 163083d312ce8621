//! Non-blocking token-bucket rate limiter.
//!
//! Tokens accrue at a constant rate up to a burst cap. Consumption either
//! succeeds immediately or fails immediately; the caller never waits.
//! One limiter instance is shared by all request handlers of a tenant,
//! so the bucket state sits behind a short-lived mutex that is never
//! held across I/O.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Token bucket with fractional refill.
///
/// Tokens are tracked as `f64` so that sub-second refill of low rates and
/// byte-granularity consumption of throughput limits both work without
/// scaling tricks.
pub struct RateLimiter {
    /// Tokens added per second.
    rate: f64,

    /// Bucket capacity. Requests for more than `burst` tokens can never
    /// succeed and are denied without consuming anything.
    burst: f64,

    bucket: Mutex<Bucket>,
}

struct Bucket {
    /// Currently available tokens, `0.0..=burst`.
    tokens: f64,

    /// Instant of the last refill.
    refilled_at: Instant,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bucket = self.bucket.lock();
        f.debug_struct("RateLimiter")
            .field("rate", &self.rate)
            .field("burst", &self.burst)
            .field("tokens", &bucket.tokens)
            .finish()
    }
}

impl RateLimiter {
    /// Create a limiter refilling at `rate` tokens/sec with capacity `burst`.
    /// The bucket starts full, so a fresh limiter admits an initial burst.
    pub fn new(rate: f64, burst: f64) -> Self {
        Self {
            rate,
            burst,
            bucket: Mutex::new(Bucket {
                tokens: burst,
                refilled_at: Instant::now(),
            }),
        }
    }

    /// Consume one token if available.
    #[inline]
    pub fn allow(&self) -> bool {
        self.allow_n(1.0)
    }

    /// Consume `n` tokens if at least `n` are available now.
    #[inline]
    pub fn allow_n(&self, n: f64) -> bool {
        self.allow_n_at(Instant::now(), n)
    }

    /// Consume `n` tokens as of time `now`.
    ///
    /// Exposed separately so callers (and tests) can drive the clock
    /// explicitly; `now` values earlier than the last refill are treated
    /// as the last refill time, tokens never drain backwards.
    pub fn allow_n_at(&self, now: Instant, n: f64) -> bool {
        if n > self.burst {
            // Can never be satisfied; deny without draining the bucket.
            return false;
        }

        let mut bucket = self.bucket.lock();
        self.refill(&mut bucket, now);

        if bucket.tokens >= n {
            bucket.tokens -= n;
            true
        } else {
            false
        }
    }

    /// Estimate of the currently available tokens.
    pub fn tokens(&self) -> f64 {
        let mut bucket = self.bucket.lock();
        self.refill(&mut bucket, Instant::now());
        bucket.tokens
    }

    /// Bucket capacity.
    #[inline]
    pub fn burst(&self) -> f64 {
        self.burst
    }

    /// Refill rate in tokens/sec.
    #[inline]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    fn refill(&self, bucket: &mut Bucket, now: Instant) {
        let elapsed = now.saturating_duration_since(bucket.refilled_at);
        if elapsed.is_zero() {
            return;
        }

        bucket.tokens = (bucket.tokens + elapsed.as_secs_f64() * self.rate).min(self.burst);
        bucket.refilled_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_burst() {
        let limiter = RateLimiter::new(100.0, 10.0);
        let now = Instant::now();

        for _ in 0..10 {
            assert!(limiter.allow_n_at(now, 1.0));
        }
        assert!(!limiter.allow_n_at(now, 1.0));
    }

    #[test]
    fn test_refill_over_time() {
        let limiter = RateLimiter::new(100.0, 10.0);
        let now = Instant::now();

        for _ in 0..10 {
            assert!(limiter.allow_n_at(now, 1.0));
        }
        assert!(!limiter.allow_n_at(now, 1.0));

        // 50ms at 100 tokens/sec refills 5 tokens.
        let later = now + Duration::from_millis(50);
        for _ in 0..5 {
            assert!(limiter.allow_n_at(later, 1.0));
        }
        assert!(!limiter.allow_n_at(later, 1.0));
    }

    #[test]
    fn test_refill_caps_at_burst() {
        let limiter = RateLimiter::new(1000.0, 10.0);
        let now = Instant::now();

        assert!(limiter.allow_n_at(now, 10.0));

        // A long idle period banks at most `burst` tokens.
        let later = now + Duration::from_secs(3600);
        assert!(limiter.allow_n_at(later, 10.0));
        assert!(!limiter.allow_n_at(later, 1.0));
    }

    #[test]
    fn test_allow_n_consumes_in_bulk() {
        let limiter = RateLimiter::new(1_000_000.0, 1_000_000.0);
        let now = Instant::now();

        assert!(limiter.allow_n_at(now, 600_000.0));
        assert!(limiter.allow_n_at(now, 400_000.0));
        assert!(!limiter.allow_n_at(now, 1.0));
    }

    #[test]
    fn test_over_burst_denied_without_drain() {
        let limiter = RateLimiter::new(1_000_000.0, 1_000_000.0);
        let now = Instant::now();

        // Larger than the bucket can ever hold: denied, nothing consumed.
        assert!(!limiter.allow_n_at(now, 2_000_000.0));
        assert!(limiter.allow_n_at(now, 1_000_000.0));
    }

    #[test]
    fn test_zero_rate_never_refills() {
        let limiter = RateLimiter::new(0.0, 5.0);
        let now = Instant::now();

        assert!(limiter.allow_n_at(now, 5.0));
        assert!(!limiter.allow_n_at(now + Duration::from_secs(3600), 1.0));
    }

    #[test]
    fn test_clock_never_runs_backwards() {
        let limiter = RateLimiter::new(100.0, 10.0);
        let now = Instant::now();

        assert!(limiter.allow_n_at(now + Duration::from_secs(1), 10.0));
        // An earlier timestamp must not mint tokens or panic.
        assert!(!limiter.allow_n_at(now, 1.0));
    }

    #[test]
    fn test_tokens_estimate() {
        let limiter = RateLimiter::new(100.0, 10.0);
        assert!(limiter.tokens() >= 10.0 - f64::EPSILON);

        limiter.allow_n(4.0);
        let remaining = limiter.tokens();
        assert!(remaining >= 6.0 && remaining < 10.0, "remaining = {}", remaining);
    }
}
