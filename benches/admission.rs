use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use async_trait::async_trait;
use tenant_quota::{
    Database, MetadataCatalog, QuotaConfig, QuotaManager, Result, Tenant, TxManager,
};

struct NoopTx;

impl TxManager for NoopTx {}

struct StaticTenant;

#[async_trait]
impl Tenant for StaticTenant {
    async fn size(&self) -> Result<i64> {
        Ok(500_000_000)
    }

    async fn list_databases(&self) -> Vec<String> {
        vec!["db1".to_string()]
    }

    async fn get_database(&self, _name: &str) -> Result<Arc<dyn Database>> {
        Ok(Arc::new(StaticDatabase))
    }

    async fn database_size(&self, _db: &dyn Database) -> Result<i64> {
        Ok(500_000_000)
    }

    async fn collection_size(&self, _db: &dyn Database, _collection: &str) -> Result<i64> {
        Ok(100_000_000)
    }
}

struct StaticDatabase;

impl Database for StaticDatabase {
    fn name(&self) -> &str {
        "db1"
    }

    fn list_collections(&self) -> Vec<String> {
        vec!["users".to_string()]
    }
}

struct StaticCatalog;

#[async_trait]
impl MetadataCatalog for StaticCatalog {
    async fn get_tenant(&self, _namespace: &str, _tx: &dyn TxManager) -> Result<Arc<dyn Tenant>> {
        Ok(Arc::new(StaticTenant))
    }
}

fn bench_manager() -> QuotaManager {
    QuotaManager::new(
        Arc::new(StaticCatalog),
        Arc::new(NoopTx),
        QuotaConfig {
            enabled: true,
            // Limits high enough that the bench loop never rejects; the
            // interesting cost is the check machinery, not the verdict.
            rate_limit: u64::MAX / 2,
            write_throughput_limit: u64::MAX / 2,
            read_throughput_limit: u64::MAX / 2,
            data_size_limit: i64::MAX,
            limit_update_interval: 3_600,
            tenant_size_refresh_interval: 3_600,
        },
    )
}

/// Benchmark the warm admission path: caches fresh, no catalog traffic.
fn bench_allow_warm(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let manager = bench_manager();

    // Prime the tenant state and both caches.
    rt.block_on(manager.allow("bench-tenant", 128)).unwrap();

    let mut group = c.benchmark_group("admission");
    group.throughput(Throughput::Elements(1));

    group.bench_function("allow_warm_cache", |b| {
        b.iter(|| {
            rt.block_on(async {
                black_box(manager.allow("bench-tenant", 128).await).unwrap();
            })
        })
    });

    group.finish();
}

/// Benchmark tenant-state lookup on an existing entry.
fn bench_state_lookup(c: &mut Criterion) {
    let manager = bench_manager();
    let _ = manager.state("bench-tenant");

    let mut group = c.benchmark_group("state");
    group.throughput(Throughput::Elements(1));

    group.bench_function("lookup_existing", |b| {
        b.iter(|| {
            black_box(manager.state("bench-tenant"));
        })
    });

    group.finish();
}

criterion_group!(benches, bench_allow_warm, bench_state_lookup);
criterion_main!(benches);
