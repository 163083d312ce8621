//! Per-tenant quota admission.
//!
//! The manager owns the tenant-state map and decides, per request, whether
//! the originating tenant has exceeded its request rate, write throughput,
//! or stored data size. Rate and throughput are token buckets consulted
//! inline; the size check runs against a cached authoritative value that
//! is refreshed from the metadata catalog at most once per interval per
//! tenant. A second, independent debounce drives size telemetry so
//! operators see tenant sizes even when enforcement is off.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, error};

use crate::config::QuotaConfig;
use crate::error::{Error, Result};
use crate::metadata::{Database, MetadataCatalog, Tenant, TxManager};
use crate::metrics::metrics;
use crate::state::TenantState;

/// Quota manager for all tenants of this process.
///
/// Limits are per process: every node of a deployment enforces its own
/// share independently.
pub struct QuotaManager {
    config: QuotaConfig,
    catalog: Arc<dyn MetadataCatalog>,
    tx_mgr: Arc<dyn TxManager>,
    tenants: RwLock<FxHashMap<String, Arc<TenantState>>>,
}

impl QuotaManager {
    /// Create a manager over the given catalog and transaction manager.
    pub fn new(
        catalog: Arc<dyn MetadataCatalog>,
        tx_mgr: Arc<dyn TxManager>,
        config: QuotaConfig,
    ) -> Self {
        Self {
            config,
            catalog,
            tx_mgr,
            tenants: RwLock::new(FxHashMap::default()),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &QuotaConfig {
        &self.config
    }

    /// Admission check for a write request of `size` bytes.
    ///
    /// Checks run in order: request rate, write throughput, storage size.
    /// Earlier checks consume their tokens even when a later check
    /// rejects, so a rejected request still costs one request token.
    pub async fn allow(&self, namespace: &str, size: usize) -> Result<()> {
        let state = self.state(namespace);

        // Size telemetry runs whether or not enforcement is on.
        self.update_tenant_metrics(namespace, &state).await;

        if !self.config.enabled {
            return Ok(());
        }

        let verdict = self.check(namespace, &state, size).await;
        if verdict.is_ok() {
            metrics().record_allowed();
        }
        verdict
    }

    /// Admission check for a read of `size` bytes, against the
    /// read-throughput limiter only.
    pub async fn allow_read(&self, namespace: &str, size: usize) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let state = self.state(namespace);
        if !state.read_throughput.allow_n(size as f64) {
            metrics().record_throughput_limited();
            return Err(Error::ThroughputExceeded);
        }
        Ok(())
    }

    /// Quota state for a namespace, created on first contact.
    ///
    /// The returned handle is stable for the life of the process, so
    /// callers may cache it. All fields are read-only outside the
    /// admission path.
    pub fn state(&self, namespace: &str) -> Arc<TenantState> {
        if let Some(state) = self.tenants.read().get(namespace) {
            return Arc::clone(state);
        }

        // First contact: install exactly one state per namespace. Losers
        // of the write-lock race reuse the winner's entry.
        let mut tenants = self.tenants.write();
        Arc::clone(
            tenants
                .entry(namespace.to_string())
                .or_insert_with(|| Arc::new(TenantState::new(&self.config))),
        )
    }

    async fn check(&self, namespace: &str, state: &TenantState, size: usize) -> Result<()> {
        if !state.rate.allow() {
            metrics().record_rate_limited();
            return Err(Error::RateExceeded);
        }

        if !state.write_throughput.allow_n(size as f64) {
            metrics().record_throughput_limited();
            return Err(Error::ThroughputExceeded);
        }

        self.check_storage(namespace, state, size).await
    }

    /// Storage-size check against the enforcement cache.
    ///
    /// Fast path: the cache was refreshed within `limit_update_interval`,
    /// decide on the cached value without taking any lock. Slow path:
    /// serialize on `size_lock`, re-test staleness, and let only the
    /// first waiter query the catalog; the rest observe the advanced
    /// timestamp and fall through to the refreshed value.
    async fn check_storage(&self, namespace: &str, state: &TenantState, size: usize) -> Result<()> {
        let sz = state.size();
        let now = unix_seconds();

        if now < state.size_update_at() + self.config.limit_update_interval {
            return self.storage_verdict(sz, size);
        }

        let guard = state.size_lock.lock().await;

        if now >= state.size_update_at() + self.config.limit_update_interval {
            // The timestamp advances before the catalog answers: a failed
            // or cancelled refresh still counts as recently attempted and
            // the previously cached value stays in force for the rest of
            // the interval.
            state.advance_size_update_at(now);

            match self.fetch_tenant_size(namespace).await {
                Ok(authoritative) => state.store_size(authoritative),
                Err(e) => {
                    metrics().record_size_refresh_error();
                    return Err(e);
                }
            }
        }

        let sz = state.size();
        drop(guard);

        self.storage_verdict(sz, size)
    }

    fn storage_verdict(&self, cached: i64, size: usize) -> Result<()> {
        // The cap is exclusive: landing exactly on it rejects.
        if cached + size as i64 >= self.config.data_size_limit {
            metrics().record_storage_limited();
            return Err(Error::StorageSizeExceeded);
        }
        Ok(())
    }

    async fn fetch_tenant_size(&self, namespace: &str) -> Result<i64> {
        let tenant = self
            .catalog
            .get_tenant(namespace, self.tx_mgr.as_ref())
            .await?;
        tenant.size().await
    }

    /// Debounced size telemetry for a tenant.
    ///
    /// Emission is best-effort: collaborator errors are logged and never
    /// turn a successful admission into a failure. Does not write back
    /// into the enforcement cache.
    async fn update_tenant_metrics(&self, namespace: &str, state: &TenantState) {
        let sz = state.size();
        let now = unix_seconds();

        if now < state.tenant_size_update_at() + self.config.tenant_size_refresh_interval {
            return;
        }

        let _guard = state.tenant_size_lock.lock().await;
        state.advance_tenant_size_update_at(now);

        // Publish the cached value immediately; the walk below replaces
        // it with the authoritative number once the catalog answers.
        metrics().update_namespace_size(namespace, sz);
        self.update_tenant_size(namespace).await;
    }

    /// Walk the catalog and emit database, collection, and namespace
    /// sizes for the tenant.
    async fn update_tenant_size(&self, namespace: &str) {
        let tenant = match self
            .catalog
            .get_tenant(namespace, self.tx_mgr.as_ref())
            .await
        {
            Ok(tenant) => tenant,
            Err(e) => {
                error!(namespace, error = %e, "tenant lookup failed, skipping size metrics");
                return;
            }
        };

        for db_name in tenant.list_databases().await {
            let db = match tenant.get_database(&db_name).await {
                Ok(db) => db,
                Err(e) => {
                    error!(namespace, db = %db_name, error = %e, "database lookup failed, aborting size walk");
                    return;
                }
            };

            metrics().update_db_size(namespace, &db_name, db_size(&*tenant, &*db).await);

            for collection in db.list_collections() {
                metrics().update_collection_size(
                    namespace,
                    &db_name,
                    &collection,
                    collection_size(&*tenant, &*db, &collection).await,
                );
            }
        }

        match tenant.size().await {
            Ok(size) => metrics().update_namespace_size(namespace, size),
            Err(e) => error!(namespace, error = %e, "tenant size query failed"),
        }
    }
}

async fn db_size(tenant: &dyn Tenant, db: &dyn Database) -> i64 {
    match tenant.database_size(db).await {
        Ok(size) => size,
        Err(e) => {
            error!(db = db.name(), error = %e, "database size query failed");
            0
        }
    }
}

async fn collection_size(tenant: &dyn Tenant, db: &dyn Database, collection: &str) -> i64 {
    match tenant.collection_size(db, collection).await {
        Ok(size) => size,
        Err(e) => {
            error!(db = db.name(), collection, error = %e, "collection size query failed");
            0
        }
    }
}

fn unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

// ========== Process-global manager ==========

static MANAGER: RwLock<Option<Arc<QuotaManager>>> = RwLock::new(None);

/// Install the process-wide manager. Call once at startup, before serving
/// requests; calling again replaces the manager and resets all per-tenant
/// limiter state.
pub fn init(catalog: Arc<dyn MetadataCatalog>, tx_mgr: Arc<dyn TxManager>, config: QuotaConfig) {
    debug!(enabled = config.enabled, "installing quota manager");
    *MANAGER.write() = Some(Arc::new(QuotaManager::new(catalog, tx_mgr, config)));
}

fn manager() -> Option<Arc<QuotaManager>> {
    MANAGER.read().clone()
}

/// Admission check for a write against the process-wide manager.
/// Before [`init`] every request is admitted.
pub async fn allow(namespace: &str, size: usize) -> Result<()> {
    match manager() {
        Some(manager) => manager.allow(namespace, size).await,
        None => Ok(()),
    }
}

/// Admission check for a read against the process-wide manager.
pub async fn allow_read(namespace: &str, size: usize) -> Result<()> {
    match manager() {
        Some(manager) => manager.allow_read(namespace, size).await,
        None => Ok(()),
    }
}

/// Quota state of the namespace, or `None` before [`init`].
pub fn get_state(namespace: &str) -> Option<Arc<TenantState>> {
    manager().map(|manager| manager.state(namespace))
}
