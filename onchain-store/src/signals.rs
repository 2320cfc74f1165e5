//! Signals table (C6), grounded on `persistence.py`'s `save_signals` /
//! latest-signal read path. `bias` and `state` are pulled into their own
//! indexed columns (as the original does) even though both are already
//! present in `payload`, because `signals_bias_ts` is a named index in
//! SPEC_FULL.md §4.6.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use onchain_types::{AssetType, Context, TimeframeType};

use crate::error::Error;

/// Links a persisted signal to the audit record (`audit_records
/// .calculation_hash`) produced for the same tick.
pub struct SignalRecord {
    pub context: Context,
    pub data_hash: String,
}

pub struct SignalStore<'a> {
    pool: &'a PgPool,
}

impl<'a> SignalStore<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        SignalStore { pool }
    }

    pub async fn save(&self, record: &SignalRecord) -> Result<(), Error> {
        let payload = serde_json::to_value(&record.context)?;
        sqlx::query(
            r#"
            INSERT INTO signals (asset, timeframe, "timestamp", payload, state, bias, data_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (asset, timeframe, "timestamp") DO UPDATE SET
                payload = EXCLUDED.payload,
                state = EXCLUDED.state,
                bias = EXCLUDED.bias,
                data_hash = EXCLUDED.data_hash
            "#,
        )
        .bind(record.context.asset.to_string())
        .bind(record.context.timeframe.to_string())
        .bind(record.context.timestamp)
        .bind(payload)
        .bind(record.context.state.to_string())
        .bind(record.context.decision_context.bias.to_string())
        .bind(&record.data_hash)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_latest(
        &self,
        asset: AssetType,
        timeframe: TimeframeType,
    ) -> Result<Option<Context>, Error> {
        let row: Option<(serde_json::Value,)> = sqlx::query_as(
            r#"
            SELECT payload FROM signals
            WHERE asset = $1 AND timeframe = $2
            ORDER BY "timestamp" DESC
            LIMIT 1
            "#,
        )
        .bind(asset.to_string())
        .bind(timeframe.to_string())
        .fetch_optional(self.pool)
        .await?;

        Ok(match row {
            Some((payload,)) => Some(serde_json::from_value(payload)?),
            None => None,
        })
    }

    pub async fn get_at(
        &self,
        asset: AssetType,
        timeframe: TimeframeType,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<Context>, Error> {
        let row: Option<(serde_json::Value,)> = sqlx::query_as(
            r#"
            SELECT payload FROM signals
            WHERE asset = $1 AND timeframe = $2 AND "timestamp" = $3
            "#,
        )
        .bind(asset.to_string())
        .bind(timeframe.to_string())
        .bind(timestamp)
        .fetch_optional(self.pool)
        .await?;

        Ok(match row {
            Some((payload,)) => Some(serde_json::from_value(payload)?),
            None => None,
        })
    }

    /// `signals_history(hours)` (spec.md §4.6): every persisted `Context`
    /// in the trailing window `[now - hours, now)`, newest first.
    pub async fn history(
        &self,
        asset: AssetType,
        timeframe: TimeframeType,
        hours: u32,
    ) -> Result<Vec<Context>, Error> {
        let from = Utc::now() - chrono::Duration::hours(hours as i64);
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
            r#"
            SELECT payload FROM signals
            WHERE asset = $1 AND timeframe = $2 AND "timestamp" >= $3
            ORDER BY "timestamp" DESC
            "#,
        )
        .bind(asset.to_string())
        .bind(timeframe.to_string())
        .bind(from)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|(payload,)| serde_json::from_value(payload).map_err(Error::from))
            .collect()
    }
}
