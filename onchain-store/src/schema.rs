//! Schema bootstrap. Grounded on
//! `examples/original_source/btc_collector/database/persistence.py`'s
//! `ensure_tables` (`CREATE TABLE IF NOT EXISTS`, run once at startup rather
//! than via a separate migration tool), with the column/index shape taken
//! from spec.md §6 and SPEC_FULL.md §4.6 rather than the original's
//! `DECIMAL`/`SERIAL` columns.

use sqlx::PgPool;

use crate::error::Error;

const CREATE_METRICS: &str = r#"
CREATE TABLE IF NOT EXISTS metrics (
    "timestamp" TIMESTAMPTZ NOT NULL,
    asset       TEXT NOT NULL,
    timeframe   TEXT NOT NULL,
    payload     JSONB NOT NULL,
    data_completeness DOUBLE PRECISION NOT NULL,
    PRIMARY KEY (asset, timeframe, "timestamp")
)
"#;

const CREATE_METRICS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS metrics_asset_tf_ts ON metrics (asset, timeframe, \"timestamp\" DESC)";

const CREATE_SIGNALS: &str = r#"
CREATE TABLE IF NOT EXISTS signals (
    "timestamp" TIMESTAMPTZ NOT NULL,
    asset       TEXT NOT NULL,
    timeframe   TEXT NOT NULL,
    payload     JSONB NOT NULL,
    state       TEXT NOT NULL,
    bias        TEXT NOT NULL,
    data_hash   TEXT NOT NULL,
    PRIMARY KEY (asset, timeframe, "timestamp")
)
"#;

const CREATE_SIGNALS_INDEX_TS: &str =
    "CREATE INDEX IF NOT EXISTS signals_asset_tf_ts ON signals (asset, timeframe, \"timestamp\" DESC)";
const CREATE_SIGNALS_INDEX_BIAS: &str =
    "CREATE INDEX IF NOT EXISTS signals_bias_ts ON signals (bias, \"timestamp\" DESC)";

const CREATE_WHALE_TXS: &str = r#"
CREATE TABLE IF NOT EXISTS whale_txs (
    txid         TEXT PRIMARY KEY,
    block_height BIGINT,
    "timestamp"  TIMESTAMPTZ NOT NULL,
    value_btc    DOUBLE PRECISION NOT NULL,
    tier         TEXT NOT NULL,
    flow_type    TEXT NOT NULL,
    fee_btc      DOUBLE PRECISION NOT NULL,
    input_count  INTEGER NOT NULL,
    output_count INTEGER NOT NULL
)
"#;

const CREATE_WHALE_TXS_INDEX_TS: &str =
    "CREATE INDEX IF NOT EXISTS whale_txs_ts ON whale_txs (\"timestamp\" DESC)";
const CREATE_WHALE_TXS_INDEX_TIER: &str =
    "CREATE INDEX IF NOT EXISTS whale_txs_tier_ts ON whale_txs (tier, \"timestamp\" DESC)";

const CREATE_AUDIT_RECORDS: &str = r#"
CREATE TABLE IF NOT EXISTS audit_records (
    calculation_hash TEXT PRIMARY KEY,
    asset            TEXT NOT NULL,
    timeframe        TEXT NOT NULL,
    "timestamp"      TIMESTAMPTZ NOT NULL,
    input_data_hash  TEXT NOT NULL,
    config_hash      TEXT NOT NULL,
    output_snapshot  JSONB NOT NULL,
    created_at       TIMESTAMPTZ NOT NULL
)
"#;

/// Idempotent; safe to call on every process start (spec.md §9: no separate
/// migration runner is specified for this product).
pub async fn ensure_schema(pool: &PgPool) -> Result<(), Error> {
    sqlx::query(CREATE_METRICS).execute(pool).await?;
    sqlx::query(CREATE_METRICS_INDEX).execute(pool).await?;
    sqlx::query(CREATE_SIGNALS).execute(pool).await?;
    sqlx::query(CREATE_SIGNALS_INDEX_TS).execute(pool).await?;
    sqlx::query(CREATE_SIGNALS_INDEX_BIAS).execute(pool).await?;
    sqlx::query(CREATE_WHALE_TXS).execute(pool).await?;
    sqlx::query(CREATE_WHALE_TXS_INDEX_TS).execute(pool).await?;
    sqlx::query(CREATE_WHALE_TXS_INDEX_TIER)
        .execute(pool)
        .await?;
    sqlx::query(CREATE_AUDIT_RECORDS).execute(pool).await?;
    Ok(())
}
