//! Per-tenant quota enforcement for multi-tenant database services.
//!
//! For every incoming request the subsystem decides, without blocking the
//! hot path, whether the tenant has exceeded its request rate, write
//! throughput, or stored data size, and it keeps periodically refreshed
//! size metrics for observability. Authoritative sizes come from the
//! server's metadata catalog through the traits in [`metadata`].

pub mod config;
pub mod error;
pub mod limiter;
pub mod manager;
pub mod metadata;
pub mod metrics;
pub mod state;

pub use config::QuotaConfig;
pub use error::{Error, Result, StatusClass};
pub use limiter::RateLimiter;
pub use manager::{allow, allow_read, get_state, init, QuotaManager};
pub use metadata::{Database, MetadataCatalog, Tenant, TxManager};
pub use metrics::{metrics, MetricsSnapshot, QuotaMetrics};
pub use state::TenantState;
