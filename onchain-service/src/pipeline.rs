//! One scheduler tick for a single `(asset, timeframe)` pair: C3 → C5 → C7
//! → C8 → C6 → C9, grounded on
//! `examples/original_source/onchain_intel_product/scheduler.py`'s
//! `run_pipeline` (collect → normalize → whale-detect → signal → record,
//! one function per tick, errors caught at the top rather than per-stage).

use chrono::Utc;
use onchain_signal::{
    AggregatorInput, AddressTagSource, KillSwitchConfig, MetricsAggregator, TierThresholds,
};
use onchain_sources::adapter::BlockRef;
use onchain_sources::MultiSourceProvider;
use onchain_store::{AuditRecorder, MetricsStore, SignalRecord, SignalStore, WhaleTxStore};
use onchain_types::{AssetType, TimeframeType};
use sqlx::PgPool;

use crate::error::Error;

/// Everything a tick needs beyond `(asset, timeframe)`: the multi-source
/// provider, the store's pool, and the thresholds/config that vary by
/// deployment. Held by the scheduler and passed down rather than rebuilt
/// per tick.
pub struct PipelineContext<'a> {
    pub provider: &'a MultiSourceProvider,
    pub pool: &'a PgPool,
    pub tier_thresholds: TierThresholds,
    pub tags: &'a dyn AddressTagSource,
    pub kill_switch: KillSwitchConfig,
}

/// Fetches a lookback window of blocks plus the current mempool snapshot.
/// Partial provider failures degrade `AggregatorInput` rather than failing
/// the whole tick (spec.md §4.5); only a total `AllSourcesFailed` on
/// `get_block_height` aborts (nothing downstream is computable without a
/// tip height).
async fn fetch(
    provider: &MultiSourceProvider,
    timeframe: TimeframeType,
) -> Result<AggregatorInput, Error> {
    let (height, _source) = provider.get_block_height().await?;

    let lookback = timeframe.lookback_blocks() as u64;
    let start = height.saturating_sub(lookback.saturating_sub(1));
    let mut blocks = Vec::new();
    for h in start..=height {
        match provider.get_block(BlockRef::Height(h)).await {
            Ok((block, _source)) => blocks.push(block),
            Err(_) => continue,
        }
    }

    let mempool = provider.get_mempool_info().await.ok().map(|(m, _)| m);

    Ok(AggregatorInput {
        chain_height: Some(height),
        blocks,
        mempool,
        mempool_txs: Vec::new(),
    })
}

/// Runs one tick for `(asset, timeframe)`. Returns the persisted `Context`
/// so the scheduler can log the resulting state.
pub async fn run_tick(
    ctx: &PipelineContext<'_>,
    asset: AssetType,
    timeframe: TimeframeType,
) -> Result<onchain_types::Context, Error> {
    let now = Utc::now();
    let input = fetch(ctx.provider, timeframe).await?;

    let aggregator = MetricsAggregator::new(ctx.tier_thresholds, ctx.tags);
    let snapshot = aggregator.assemble(asset, timeframe, now, input);

    let weights = onchain_signal::SignalWeights::default();
    let evaluation = onchain_signal::engine::evaluate(&snapshot, &weights);
    let conflicting = onchain_signal::engine::conflicting_signal_count(&evaluation.signal);

    let age_seconds = crate::quality::data_age_seconds(&snapshot, now);
    let invariants_passed =
        onchain_types::Ratio::is_in_range(snapshot.data_completeness.get())
            && onchain_types::Ratio::is_in_range(evaluation.signal.confidence.get());
    let quality = onchain_types::QualityFacts {
        invariants_passed,
        deterministic: true,
        stability_score: onchain_types::Ratio::new(1.0),
        data_completeness: snapshot.data_completeness,
        data_age_seconds: age_seconds,
        conflicting_signal_count: conflicting,
        anomaly_count: 0,
    };

    let decision = onchain_signal::kill_switch::evaluate(&evaluation.signal, &quality, &ctx.kill_switch);
    let context = onchain_signal::kill_switch::build_context(
        asset,
        timeframe,
        snapshot.timestamp,
        &evaluation.signal,
        &quality,
        &decision,
    );

    let metrics_store = MetricsStore::new(ctx.pool);
    metrics_store.save(&snapshot).await?;

    if let Some(whale) = &snapshot.whale {
        if !whale.tx_records.is_empty() {
            let whale_store = WhaleTxStore::new(ctx.pool);
            whale_store.save_all(&whale.tx_records).await?;
        }
    }

    let input_data = serde_json::to_value(&snapshot).map_err(onchain_store::Error::from)?;
    let config_snapshot = serde_json::json!({
        "min_confidence": ctx.kill_switch.min_confidence,
        "stability_threshold": ctx.kill_switch.stability_threshold,
        "completeness_threshold": ctx.kill_switch.completeness_threshold,
        "max_conflicting_signals": ctx.kill_switch.max_conflicting_signals,
        "max_data_age_seconds": ctx.kill_switch.max_data_age_seconds,
        "base_weight": ctx.kill_switch.base_weight,
    });
    let output_data = serde_json::to_value(&context).map_err(onchain_store::Error::from)?;

    let recorder = AuditRecorder::new(ctx.pool);
    let audit = recorder
        .record(asset, timeframe, snapshot.timestamp, &input_data, &config_snapshot, &output_data)
        .await?;

    let signal_store = SignalStore::new(ctx.pool);
    signal_store
        .save(&SignalRecord {
            context: context.clone(),
            data_hash: audit.calculation_hash,
        })
        .await?;

    Ok(context)
}
