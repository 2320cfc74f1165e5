//! Postgres-backed persistence for the on-chain intelligence pipeline:
//! metrics/signal/whale-transaction storage (C6) and the canonical-JSON
//! audit ledger (C9). Connection pooling follows `spec.md` §5
//! (`sqlx::PgPool`, min/max configurable).

pub mod audit;
pub mod error;
pub mod metrics;
pub mod schema;
pub mod signals;
pub mod whale;

pub use audit::AuditRecorder;
pub use error::Error;
pub use metrics::MetricsStore;
pub use schema::ensure_schema;
pub use signals::{SignalRecord, SignalStore};
pub use whale::WhaleTxStore;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Builds a connection pool per `spec.md` §5/§6 (`DB_POOL_MIN`,
/// `DB_POOL_MAX`), then ensures the schema exists.
pub async fn connect(database_url: &str, min_connections: u32, max_connections: u32) -> Result<PgPool, Error> {
    let pool = PgPoolOptions::new()
        .min_connections(min_connections)
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    ensure_schema(&pool).await?;
    Ok(pool)
}
