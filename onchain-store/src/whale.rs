//! Whale transactions table (C6) and the `whale_activity_summary` read
//! path, grounded on `persistence.py`'s `save_whale_transactions` /
//! `get_whale_activity_summary` (supplemented feature, SPEC_FULL.md §10).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use onchain_types::{Btc, Tier, WhaleActivitySummary, WhaleTx};

use crate::error::Error;

pub struct WhaleTxStore<'a> {
    pool: &'a PgPool,
}

impl<'a> WhaleTxStore<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        WhaleTxStore { pool }
    }

    /// `ON CONFLICT (txid) DO NOTHING`: whale transactions are immutable
    /// once recorded, so a re-scan of an overlapping block window never
    /// rewrites an existing row.
    pub async fn save_all(&self, txs: &[WhaleTx]) -> Result<u64, Error> {
        let mut saved = 0u64;
        for tx in txs {
            let result = sqlx::query(
                r#"
                INSERT INTO whale_txs
                    (txid, block_height, "timestamp", value_btc, tier, flow_type,
                     fee_btc, input_count, output_count)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (txid) DO NOTHING
                "#,
            )
            .bind(&tx.txid)
            .bind(tx.block_height.map(|h| h as i64))
            .bind(tx.timestamp)
            .bind(tx.value_btc.0)
            .bind(tx.tier.to_string())
            .bind(tx.flow_type.to_string())
            .bind(tx.fee_btc.0)
            .bind(tx.input_count as i32)
            .bind(tx.output_count as i32)
            .execute(self.pool)
            .await?;
            saved += result.rows_affected();
        }
        Ok(saved)
    }

    pub async fn whale_activity_summary(&self, hours: u32) -> Result<WhaleActivitySummary, Error> {
        let since: DateTime<Utc> = Utc::now() - chrono::Duration::hours(hours as i64);

        let rows: Vec<(String, String, f64)> = sqlx::query_as(
            r#"
            SELECT tier, flow_type, value_btc FROM whale_txs
            WHERE "timestamp" >= $1
            "#,
        )
        .bind(since)
        .fetch_all(self.pool)
        .await?;

        let mut tier_counts: HashMap<Tier, u64> = HashMap::new();
        let mut inflow_btc = Btc::ZERO;
        let mut outflow_btc = Btc::ZERO;
        let mut tx_count = 0u64;

        for (tier, flow_type, value_btc) in rows {
            let tier: Tier = tier.parse()?;
            *tier_counts.entry(tier).or_insert(0) += 1;
            tx_count += 1;
            match flow_type.as_str() {
                "inflow" => inflow_btc = inflow_btc + Btc(value_btc),
                "outflow" => outflow_btc = outflow_btc + Btc(value_btc),
                _ => {}
            }
        }

        Ok(WhaleActivitySummary {
            hours,
            tier_counts,
            inflow_btc,
            outflow_btc,
            net_flow_btc: inflow_btc - outflow_btc,
            tx_count,
        })
    }
}
