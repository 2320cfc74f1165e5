//! Query service (C11): read-only access to the most recent (or a
//! specific historical) context and audit trail. Grounded on
//! `examples/original_source/onchain_api/app/routers/signal.py` and
//! `examples/original_source/onchain_api/services/signal_service.py`'s
//! read path (fetch the stored snapshot, re-derive the signal, return a
//! context).
//!
//! The persisted `signals` row's `state` column is advisory only
//! (spec.md §4.11): C8 is re-applied here against the *live* kill-switch
//! config over the stored `MetricsSnapshot`, so a config change (e.g.
//! lowering `min_confidence`) takes effect on the next read without
//! waiting for the next scheduler tick.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use onchain_signal::{KillSwitchConfig, SignalWeights};
use onchain_store::{AuditRecorder, MetricsStore};
use onchain_types::{AssetType, AuditRecord, Context, QualityFacts, Ratio, TimeframeType};

use crate::error::Error;

pub struct QueryService<'a> {
    pool: &'a PgPool,
    weights: SignalWeights,
    kill_switch: KillSwitchConfig,
}

impl<'a> QueryService<'a> {
    pub fn new(pool: &'a PgPool, weights: SignalWeights, kill_switch: KillSwitchConfig) -> Self {
        QueryService {
            pool,
            weights,
            kill_switch,
        }
    }

    /// Returns the context for `(asset, timeframe)` at `timestamp`, or the
    /// most recent one if `timestamp` is `None`. Re-derives C7/C8 live from
    /// the stored `MetricsSnapshot` rather than trusting the persisted
    /// `signals` row, so a kill-switch config change applies retroactively
    /// to every read.
    pub async fn get_context(
        &self,
        asset: AssetType,
        timeframe: TimeframeType,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<Context, Error> {
        let metrics_store = MetricsStore::new(self.pool);
        let snapshot = match timestamp {
            Some(ts) => metrics_store.get_at(asset, timeframe, ts).await?,
            None => metrics_store.get_latest(asset, timeframe).await?,
        };

        let snapshot = snapshot.ok_or_else(|| Error::NotFound {
            asset: asset.to_string(),
            timeframe: timeframe.to_string(),
            timestamp: timestamp.map(|t| t.to_rfc3339()),
        })?;

        let evaluation = onchain_signal::engine::evaluate(&snapshot, &self.weights);
        let conflicting = onchain_signal::engine::conflicting_signal_count(&evaluation.signal);

        let age_seconds = crate::quality::data_age_seconds(&snapshot, Utc::now());
        let invariants_passed = Ratio::is_in_range(snapshot.data_completeness.get())
            && Ratio::is_in_range(evaluation.signal.confidence.get());
        let quality = QualityFacts {
            invariants_passed,
            deterministic: true,
            stability_score: Ratio::new(1.0),
            data_completeness: snapshot.data_completeness,
            data_age_seconds: age_seconds,
            conflicting_signal_count: conflicting,
            anomaly_count: 0,
        };

        let decision = onchain_signal::kill_switch::evaluate(&evaluation.signal, &quality, &self.kill_switch);
        Ok(onchain_signal::kill_switch::build_context(
            asset,
            timeframe,
            snapshot.timestamp,
            &evaluation.signal,
            &quality,
            &decision,
        ))
    }

    /// Returns the stored audit record for an exact `(asset, timeframe,
    /// timestamp)`, verbatim — the audit trail is a historical fact, not
    /// re-derived on read the way `get_context` is (spec.md §4.9: C9 is a
    /// pure recorder).
    pub async fn get_audit(
        &self,
        asset: AssetType,
        timeframe: TimeframeType,
        timestamp: DateTime<Utc>,
    ) -> Result<AuditRecord, Error> {
        let recorder = AuditRecorder::new(self.pool);
        recorder
            .get_at(asset, timeframe, timestamp)
            .await?
            .ok_or_else(|| Error::NotFound {
                asset: asset.to_string(),
                timeframe: timeframe.to_string(),
                timestamp: Some(timestamp.to_rfc3339()),
            })
    }
}
