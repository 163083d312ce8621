//! Quota observability.
//!
//! Lock-free counters for admission outcomes plus size gauges for
//! tenants, databases, and collections. Gauges are written by the
//! debounced telemetry walk and read by the stats surface of the
//! embedding server.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Relaxed ordering for counters (eventual visibility is fine for metrics).
const RELAXED: Ordering = Ordering::Relaxed;

static METRICS: OnceLock<QuotaMetrics> = OnceLock::new();

/// Process-wide quota metrics registry.
pub fn metrics() -> &'static QuotaMetrics {
    METRICS.get_or_init(QuotaMetrics::new)
}

/// Admission counters and size gauges.
pub struct QuotaMetrics {
    // Admission outcome counters
    pub requests_allowed: AtomicU64,
    pub requests_rate_limited: AtomicU64,
    pub requests_throughput_limited: AtomicU64,
    pub requests_storage_limited: AtomicU64,

    /// Enforcement refreshes aborted by a collaborator error.
    pub size_refresh_errors: AtomicU64,

    // Size gauges, keyed by namespace / (namespace, db) / (namespace, db, collection).
    // Updated at most once per refresh interval per tenant, read for stats.
    namespace_sizes: RwLock<FxHashMap<String, i64>>,
    db_sizes: RwLock<FxHashMap<(String, String), i64>>,
    collection_sizes: RwLock<FxHashMap<(String, String, String), i64>>,
}

impl QuotaMetrics {
    fn new() -> Self {
        Self {
            requests_allowed: AtomicU64::new(0),
            requests_rate_limited: AtomicU64::new(0),
            requests_throughput_limited: AtomicU64::new(0),
            requests_storage_limited: AtomicU64::new(0),
            size_refresh_errors: AtomicU64::new(0),
            namespace_sizes: RwLock::new(FxHashMap::default()),
            db_sizes: RwLock::new(FxHashMap::default()),
            collection_sizes: RwLock::new(FxHashMap::default()),
        }
    }

    // ========== Admission counters ==========

    #[inline]
    pub fn record_allowed(&self) {
        self.requests_allowed.fetch_add(1, RELAXED);
    }

    #[inline]
    pub fn record_rate_limited(&self) {
        self.requests_rate_limited.fetch_add(1, RELAXED);
    }

    #[inline]
    pub fn record_throughput_limited(&self) {
        self.requests_throughput_limited.fetch_add(1, RELAXED);
    }

    #[inline]
    pub fn record_storage_limited(&self) {
        self.requests_storage_limited.fetch_add(1, RELAXED);
    }

    #[inline]
    pub fn record_size_refresh_error(&self) {
        self.size_refresh_errors.fetch_add(1, RELAXED);
    }

    // ========== Size gauges ==========

    /// Record the total size of a tenant's namespace.
    pub fn update_namespace_size(&self, namespace: &str, size: i64) {
        self.namespace_sizes
            .write()
            .insert(namespace.to_string(), size);
    }

    /// Record the size of one database.
    pub fn update_db_size(&self, namespace: &str, db: &str, size: i64) {
        self.db_sizes
            .write()
            .insert((namespace.to_string(), db.to_string()), size);
    }

    /// Record the size of one collection.
    pub fn update_collection_size(&self, namespace: &str, db: &str, collection: &str, size: i64) {
        self.collection_sizes.write().insert(
            (namespace.to_string(), db.to_string(), collection.to_string()),
            size,
        );
    }

    /// Last emitted namespace size, if any.
    pub fn namespace_size(&self, namespace: &str) -> Option<i64> {
        self.namespace_sizes.read().get(namespace).copied()
    }

    /// Last emitted database size, if any.
    pub fn database_size(&self, namespace: &str, db: &str) -> Option<i64> {
        self.db_sizes
            .read()
            .get(&(namespace.to_string(), db.to_string()))
            .copied()
    }

    /// Last emitted collection size, if any.
    pub fn collection_size(&self, namespace: &str, db: &str, collection: &str) -> Option<i64> {
        self.collection_sizes
            .read()
            .get(&(namespace.to_string(), db.to_string(), collection.to_string()))
            .copied()
    }

    /// Get a snapshot of all metrics for reporting.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_allowed: self.requests_allowed.load(RELAXED),
            requests_rate_limited: self.requests_rate_limited.load(RELAXED),
            requests_throughput_limited: self.requests_throughput_limited.load(RELAXED),
            requests_storage_limited: self.requests_storage_limited.load(RELAXED),
            size_refresh_errors: self.size_refresh_errors.load(RELAXED),
            namespace_sizes: self.namespace_sizes.read().clone(),
            db_sizes: self.db_sizes.read().clone(),
            collection_sizes: self.collection_sizes.read().clone(),
        }
    }
}

/// Point-in-time copy of all quota metrics.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub requests_allowed: u64,
    pub requests_rate_limited: u64,
    pub requests_throughput_limited: u64,
    pub requests_storage_limited: u64,
    pub size_refresh_errors: u64,

    pub namespace_sizes: FxHashMap<String, i64>,
    pub db_sizes: FxHashMap<(String, String), i64>,
    pub collection_sizes: FxHashMap<(String, String, String), i64>,
}
