//! Interfaces consumed from the metadata layer.
//!
//! The quota subsystem never owns tenant metadata; it queries the catalog
//! for authoritative on-disk sizes and walks databases and collections
//! when emitting size telemetry. These traits are the seam the embedding
//! server implements on top of its catalog and transaction manager.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

/// Opaque transaction-manager handle.
///
/// Size queries run inside the server's transaction machinery; the quota
/// subsystem only threads the handle through to the catalog.
pub trait TxManager: Send + Sync {}

/// Entry point into the metadata catalog.
#[async_trait]
pub trait MetadataCatalog: Send + Sync {
    /// Resolve a tenant by namespace name.
    async fn get_tenant(&self, namespace: &str, tx: &dyn TxManager) -> Result<Arc<dyn Tenant>>;
}

/// A resolved tenant, scoped to the transaction it was fetched under.
#[async_trait]
pub trait Tenant: Send + Sync {
    /// Authoritative on-disk size of the whole tenant, in bytes.
    async fn size(&self) -> Result<i64>;

    /// Names of the tenant's databases.
    async fn list_databases(&self) -> Vec<String>;

    /// Resolve one database by name.
    async fn get_database(&self, name: &str) -> Result<Arc<dyn Database>>;

    /// On-disk size of one database, in bytes.
    async fn database_size(&self, db: &dyn Database) -> Result<i64>;

    /// On-disk size of one collection, in bytes.
    async fn collection_size(&self, db: &dyn Database, collection: &str) -> Result<i64>;
}

/// Database descriptor: just enough surface to drive the telemetry walk.
pub trait Database: Send + Sync {
    fn name(&self) -> &str;

    /// Collection names currently present in the database.
    fn list_collections(&self) -> Vec<String>;
}
