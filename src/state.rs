//! Per-tenant quota state.
//!
//! One `TenantState` per namespace, created lazily on first contact and
//! never torn down. Request handlers share it concurrently:
//! - the three limiters do their own short-lived locking,
//! - the size cache and the two debounce timestamps are read atomically
//!   on the fast path and written only under the matching refresh lock.

use std::sync::atomic::{AtomicI64, Ordering};

use tokio::sync::Mutex;

use crate::config::QuotaConfig;
use crate::limiter::RateLimiter;

/// Fixed burst of the request-rate limiter. Small relative to any
/// realistic rate limit, so an idle tenant cannot bank large credit.
const RATE_BURST: f64 = 10.0;

/// Quota state for a single tenant.
pub struct TenantState {
    /// Requests/sec limiter, burst fixed at [`RATE_BURST`].
    pub(crate) rate: RateLimiter,

    /// Write bytes/sec limiter, burst equal to the per-second limit so a
    /// single large write passes while recent throughput is low.
    pub(crate) write_throughput: RateLimiter,

    /// Read bytes/sec limiter, same shape as the write limiter.
    pub(crate) read_throughput: RateLimiter,

    /// Last authoritative size snapshot, bytes.
    size: AtomicI64,

    /// Unix seconds of the last enforcement-cache refresh attempt.
    size_update_at: AtomicI64,

    /// Unix seconds of the last size metric emission.
    tenant_size_update_at: AtomicI64,

    /// Serializes enforcement-cache refreshes. Held across the catalog
    /// query, so this is an async mutex.
    pub(crate) size_lock: Mutex<()>,

    /// Serializes metric emission walks. Independent from `size_lock` so a
    /// slow telemetry walk cannot stall admission refreshes.
    pub(crate) tenant_size_lock: Mutex<()>,
}

impl TenantState {
    /// Build fresh state from the configured limits.
    ///
    /// `size` and both timestamps start at zero, which reads as maximally
    /// stale and forces a refresh on the first request that gets that far.
    pub(crate) fn new(config: &QuotaConfig) -> Self {
        Self {
            rate: RateLimiter::new(config.rate_limit as f64, RATE_BURST),
            write_throughput: RateLimiter::new(
                config.write_throughput_limit as f64,
                config.write_throughput_limit as f64,
            ),
            read_throughput: RateLimiter::new(
                config.read_throughput_limit as f64,
                config.read_throughput_limit as f64,
            ),
            size: AtomicI64::new(0),
            size_update_at: AtomicI64::new(0),
            tenant_size_update_at: AtomicI64::new(0),
            size_lock: Mutex::new(()),
            tenant_size_lock: Mutex::new(()),
        }
    }

    /// Request-rate limiter.
    pub fn rate(&self) -> &RateLimiter {
        &self.rate
    }

    /// Write-throughput limiter.
    pub fn write_throughput(&self) -> &RateLimiter {
        &self.write_throughput
    }

    /// Read-throughput limiter.
    pub fn read_throughput(&self) -> &RateLimiter {
        &self.read_throughput
    }

    /// Cached tenant size in bytes.
    #[inline]
    pub fn size(&self) -> i64 {
        self.size.load(Ordering::Acquire)
    }

    /// Unix seconds of the last enforcement refresh attempt.
    #[inline]
    pub fn size_update_at(&self) -> i64 {
        self.size_update_at.load(Ordering::Acquire)
    }

    /// Unix seconds of the last metric emission.
    #[inline]
    pub fn tenant_size_update_at(&self) -> i64 {
        self.tenant_size_update_at.load(Ordering::Acquire)
    }

    /// Store a freshly fetched authoritative size. Caller holds `size_lock`.
    pub(crate) fn store_size(&self, size: i64) {
        self.size.store(size, Ordering::Release);
    }

    /// Advance the enforcement refresh timestamp. Monotonic: an older
    /// timestamp never overwrites a newer one.
    pub(crate) fn advance_size_update_at(&self, now: i64) {
        self.size_update_at.fetch_max(now, Ordering::AcqRel);
    }

    /// Advance the metric emission timestamp, monotonically.
    pub(crate) fn advance_tenant_size_update_at(&self, now: i64) {
        self.tenant_size_update_at.fetch_max(now, Ordering::AcqRel);
    }
}

impl std::fmt::Debug for TenantState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantState")
            .field("size", &self.size())
            .field("size_update_at", &self.size_update_at())
            .field("tenant_size_update_at", &self.tenant_size_update_at())
            .finish()
    }
}
