use serde::Deserialize;

/// Quota enforcement configuration.
///
/// Immutable after the manager is initialized; changing limits requires a
/// process restart. All limits apply per tenant, per process.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Enforce limits on the admission path. Size telemetry is emitted
    /// regardless of this flag.
    pub enabled: bool,

    /// Steady-state requests per second per tenant.
    pub rate_limit: u64,

    /// Steady-state write bytes per second per tenant. Doubles as the
    /// burst size, so a single write up to this many bytes can pass.
    pub write_throughput_limit: u64,

    /// Steady-state read bytes per second per tenant. Same shape as the
    /// write limit, consulted only by read admission.
    pub read_throughput_limit: u64,

    /// Hard cap in bytes on the tenant's stored data. The cap is
    /// exclusive: cached size plus request bytes reaching it rejects.
    pub data_size_limit: i64,

    /// Minimum seconds between authoritative size refreshes used for
    /// enforcement.
    pub limit_update_interval: i64,

    /// Minimum seconds between size metric emissions per tenant.
    pub tenant_size_refresh_interval: i64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rate_limit: 1_000,
            write_throughput_limit: 10_000_000,
            read_throughput_limit: 10_000_000,
            data_size_limit: 10 * 1024 * 1024 * 1024,
            limit_update_interval: 60,
            tenant_size_refresh_interval: 60,
        }
    }
}
