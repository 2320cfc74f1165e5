//! Audit Recorder (C9): reproducibility hashing and replay, grounded on
//! `examples/original_source/onchain_intel_product/audit.py`'s
//! `AuditController` (`record_calculation` / `get_audit_record` /
//! `verify_calculation_integrity` / `replay_calculation`), with the
//! original's `json.dumps(..., sort_keys=True)` + `round(x, 8)` hand-rolled
//! normalization replaced by `onchain_types::canonical` (I5, P5-P7).

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use onchain_types::canonical::canonical_bytes;
use onchain_types::{AssetType, AuditRecord, TimeframeType};

use crate::error::Error;

pub struct AuditRecorder<'a> {
    pool: &'a PgPool,
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Hashes an already-canonicalized JSON value; callers pass in whatever
/// `serde_json::Value` they want fingerprinted (input data, config
/// snapshot, or the full calculation record).
pub fn hash_value(value: &Value) -> String {
    sha256_hex(&canonical_bytes(value))
}

impl<'a> AuditRecorder<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        AuditRecorder { pool }
    }

    /// Records one tick's audit trail. `input_data` and `config` are
    /// hashed independently (so a caller can tell which one changed
    /// between two ticks); the `calculation_hash` folds together
    /// `asset`/`timeframe`/`timestamp`/`input_data_hash`/`config_hash`/
    /// `output_data`, mirroring the original's `calculation_data` dict.
    pub async fn record(
        &self,
        asset: AssetType,
        timeframe: TimeframeType,
        timestamp: DateTime<Utc>,
        input_data: &Value,
        config: &Value,
        output_data: &Value,
    ) -> Result<AuditRecord, Error> {
        let input_data_hash = hash_value(input_data);
        let config_hash = hash_value(config);

        let calculation_data = json!({
            "asset": asset.to_string(),
            "timeframe": timeframe.to_string(),
            "timestamp": timestamp.to_rfc3339(),
            "input_hash": input_data_hash,
            "config_hash": config_hash,
            "output": output_data,
        });
        let calculation_hash = hash_value(&calculation_data);
        let created_at = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO audit_records
                (calculation_hash, asset, timeframe, "timestamp",
                 input_data_hash, config_hash, output_snapshot, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (calculation_hash) DO NOTHING
            "#,
        )
        .bind(&calculation_hash)
        .bind(asset.to_string())
        .bind(timeframe.to_string())
        .bind(timestamp)
        .bind(&input_data_hash)
        .bind(&config_hash)
        .bind(output_data)
        .bind(created_at)
        .execute(self.pool)
        .await?;

        Ok(AuditRecord {
            calculation_hash,
            asset,
            timeframe,
            timestamp,
            input_data_hash,
            config_hash,
            output_snapshot: output_data.clone(),
            created_at,
        })
    }

    pub async fn get(&self, calculation_hash: &str) -> Result<Option<AuditRecord>, Error> {
        let row = sqlx::query_as::<_, (String, String, DateTime<Utc>, String, String, Value, DateTime<Utc>)>(
            r#"
            SELECT asset, timeframe, "timestamp", input_data_hash, config_hash,
                   output_snapshot, created_at
            FROM audit_records WHERE calculation_hash = $1
            "#,
        )
        .bind(calculation_hash)
        .fetch_optional(self.pool)
        .await?;

        Ok(match row {
            Some((asset, timeframe, timestamp, input_data_hash, config_hash, output_snapshot, created_at)) => {
                Some(AuditRecord {
                    calculation_hash: calculation_hash.to_string(),
                    asset: asset.parse()?,
                    timeframe: timeframe.parse()?,
                    timestamp,
                    input_data_hash,
                    config_hash,
                    output_snapshot,
                    created_at,
                })
            }
            None => None,
        })
    }

    pub async fn get_at(
        &self,
        asset: AssetType,
        timeframe: TimeframeType,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<AuditRecord>, Error> {
        let row = sqlx::query_as::<_, (String, String, String, Value, DateTime<Utc>)>(
            r#"
            SELECT calculation_hash, input_data_hash, config_hash,
                   output_snapshot, created_at
            FROM audit_records
            WHERE asset = $1 AND timeframe = $2 AND "timestamp" = $3
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(asset.to_string())
        .bind(timeframe.to_string())
        .bind(timestamp)
        .fetch_optional(self.pool)
        .await?;

        Ok(match row {
            Some((calculation_hash, input_data_hash, config_hash, output_snapshot, created_at)) => {
                Some(AuditRecord {
                    calculation_hash,
                    asset,
                    timeframe,
                    timestamp,
                    input_data_hash,
                    config_hash,
                    output_snapshot,
                    created_at,
                })
            }
            None => None,
        })
    }

    /// Recomputes `calculation_hash` from the stored record's constituent
    /// hashes and compares — detects tampering or a storage bug without
    /// needing the original input/config values (I5).
    pub async fn verify_integrity(&self, calculation_hash: &str) -> Result<bool, Error> {
        let record = self
            .get(calculation_hash)
            .await?
            .ok_or_else(|| Error::AuditRecordNotFound(calculation_hash.to_string()))?;

        let calculation_data = json!({
            "asset": record.asset.to_string(),
            "timeframe": record.timeframe.to_string(),
            "timestamp": record.timestamp.to_rfc3339(),
            "input_hash": record.input_data_hash,
            "config_hash": record.config_hash,
            "output": record.output_snapshot,
        });
        let recomputed = hash_value(&calculation_data);
        Ok(recomputed == record.calculation_hash)
    }

    /// Returns the stored record for a historical tick so a caller can
    /// re-run the calculation engine against it and diff the result; this
    /// store does not itself re-invoke the engine (spec.md §4.9: C9 is a
    /// pure recorder, not an orchestrator).
    pub async fn replay(
        &self,
        asset: AssetType,
        timeframe: TimeframeType,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<AuditRecord>, Error> {
        self.get_at(asset, timeframe, timestamp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_order_independent_over_keys() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(hash_value(&a), hash_value(&b));
    }

    #[test]
    fn hash_changes_when_output_changes() {
        let a = json!({"score": 50});
        let b = json!({"score": 51});
        assert_ne!(hash_value(&a), hash_value(&b));
    }
}
