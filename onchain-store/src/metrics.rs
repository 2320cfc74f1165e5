//! Metrics table (C6), grounded on `persistence.py`'s `save_metrics` /
//! `get_latest_metrics` (the original's per-column upsert collapses here to
//! a single `payload JSONB` column plus the indexed lookup keys, since the
//! full `MetricsSnapshot` already round-trips through `serde_json`).

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use onchain_types::{AssetType, MetricsSnapshot, TimeframeType};

use crate::error::Error;

pub struct MetricsStore<'a> {
    pool: &'a PgPool,
}

impl<'a> MetricsStore<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        MetricsStore { pool }
    }

    /// `INSERT ... ON CONFLICT (asset, timeframe, "timestamp") DO UPDATE`
    /// (I1: re-running a tick for the same window replaces, not duplicates).
    pub async fn save(&self, snapshot: &MetricsSnapshot) -> Result<(), Error> {
        let payload = serde_json::to_value(snapshot)?;
        sqlx::query(
            r#"
            INSERT INTO metrics (asset, timeframe, "timestamp", payload, data_completeness)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (asset, timeframe, "timestamp") DO UPDATE SET
                payload = EXCLUDED.payload,
                data_completeness = EXCLUDED.data_completeness
            "#,
        )
        .bind(snapshot.asset.to_string())
        .bind(snapshot.timeframe.to_string())
        .bind(snapshot.timestamp)
        .bind(payload)
        .bind(snapshot.data_completeness.get())
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_latest(
        &self,
        asset: AssetType,
        timeframe: TimeframeType,
    ) -> Result<Option<MetricsSnapshot>, Error> {
        let row: Option<(serde_json::Value,)> = sqlx::query_as(
            r#"
            SELECT payload FROM metrics
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
    ) -> Result<Option<MetricsSnapshot>, Error> {
        let row: Option<(serde_json::Value,)> = sqlx::query_as(
            r#"
            SELECT payload FROM metrics
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

    /// `metrics_history(hours)` (spec.md §4.6): every snapshot in the
    /// trailing window `[now - hours, now)`, newest first.
    pub async fn history(
        &self,
        asset: AssetType,
        timeframe: TimeframeType,
        hours: u32,
    ) -> Result<Vec<MetricsSnapshot>, Error> {
        let from = Utc::now() - chrono::Duration::hours(hours as i64);
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
            r#"
            SELECT payload FROM metrics
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
