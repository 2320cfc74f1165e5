//! Metrics Aggregator (C5): pure assembly of a `MetricsSnapshot` from
//! already-fetched provider data. Spec.md §4.5 describes C5 as calling C3
//! directly; here the I/O (calling the multi-source provider) is the
//! scheduler's (C10, `onchain-service`) job, and this module does the pure
//! part — stamping the timeframe-floored timestamp, running the whale
//! detector (C4) over the fetched window, and degrading completeness when a
//! sub-struct is missing — so `onchain-signal` stays free of network/DB
//! dependencies (spec.md §9: "no module-level mutable state beyond the DB
//! pool handle", which lives in `onchain-store`, not here).

use chrono::{DateTime, Utc};
use onchain_types::{
    AssetType, BlockchainStats, MempoolSnapshot, MetricsSnapshot, RawBlock, RawTx, Ratio,
    TimeframeType,
};

use crate::config::TierThresholds;
use crate::tags::AddressTagSource;
use crate::whale::WhaleDetector;

/// Everything C3 was able to fetch for one tick, before C5 assembles it.
/// `chain_height` and `blocks` are `None`/empty when the provider couldn't
/// supply them (spec.md §4.5: "partial failures from C3 ... degrade the
/// snapshot").
#[derive(Debug, Clone, Default)]
pub struct AggregatorInput {
    pub chain_height: Option<u64>,
    pub blocks: Vec<RawBlock>,
    pub mempool: Option<MempoolSnapshot>,
    pub mempool_txs: Vec<RawTx>,
}

/// Assembles `MetricsSnapshot`s from fetched provider data plus the whale
/// detector (C4), per-timeframe.
pub struct MetricsAggregator<'a> {
    thresholds: TierThresholds,
    tags: &'a dyn AddressTagSource,
}

impl<'a> MetricsAggregator<'a> {
    pub fn new(thresholds: TierThresholds, tags: &'a dyn AddressTagSource) -> Self {
        MetricsAggregator { thresholds, tags }
    }

    /// `now` is the tick's wall-clock time; it is floored to the
    /// timeframe's boundary per spec.md §4.5 ("stamps a UTC timestamp
    /// normalized to the timeframe boundary") and also used to stamp any
    /// whale transaction sourced from the mempool sample.
    pub fn assemble(
        &self,
        asset: AssetType,
        timeframe: TimeframeType,
        now: DateTime<Utc>,
        input: AggregatorInput,
    ) -> MetricsSnapshot {
        let timestamp = timeframe.floor(now);

        let blockchain = match input.chain_height {
            Some(height) if !input.blocks.is_empty() => {
                Some(blockchain_stats(height, &input.blocks))
            }
            _ => None,
        };

        let detector = WhaleDetector::new(self.thresholds, self.tags);
        let whale = detector.detect(&input.blocks, &input.mempool_txs, timestamp);

        let mut present = 0u8;
        if blockchain.is_some() {
            present += 1;
        }
        if input.mempool.is_some() {
            present += 1;
        }
        // Whale is always computed by this pipeline (possibly empty of
        // activity), so it never counts as a "missing" top-level sub-struct.
        present += 1;

        let data_completeness = Ratio::new(present as f64 / 3.0);

        MetricsSnapshot {
            timestamp,
            asset,
            timeframe,
            blockchain,
            mempool: input.mempool,
            whale: Some(whale),
            data_completeness,
        }
    }
}

fn blockchain_stats(height: u64, blocks: &[RawBlock]) -> BlockchainStats {
    let blocks_analyzed = blocks.len() as u32;
    let total_tx: u64 = blocks
        .iter()
        .map(|b| b.tx_count.unwrap_or(b.transactions.len() as u32) as u64)
        .sum();
    let sizes: Vec<u64> = blocks.iter().filter_map(|b| b.size).collect();
    let avg_block_size = if sizes.is_empty() {
        0.0
    } else {
        sizes.iter().sum::<u64>() as f64 / sizes.len() as f64
    };
    let avg_tx_per_block = if blocks_analyzed == 0 {
        0.0
    } else {
        total_tx as f64 / blocks_analyzed as f64
    };
    let latest_block_time = blocks.iter().map(|b| b.time).max();

    BlockchainStats {
        height,
        blocks_analyzed,
        total_tx,
        avg_block_size,
        avg_tx_per_block,
        latest_block_time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::EmptyTagSource;
    use chrono::TimeZone;
    use onchain_types::{FeeBands, TimeframeType};

    fn block(height: u64, tx_count: u32, size: u64) -> RawBlock {
        RawBlock {
            hash: format!("h{height}"),
            height,
            time: Utc.with_ymd_and_hms(2026, 7, 28, 13, 0, 0).unwrap(),
            size: Some(size),
            tx_count: Some(tx_count),
            transactions: Vec::new(),
            error: None,
        }
    }

    #[test]
    fn full_input_yields_completeness_one() {
        let tags = EmptyTagSource;
        let aggregator = MetricsAggregator::new(TierThresholds::default(), &tags);
        let input = AggregatorInput {
            chain_height: Some(900_000),
            blocks: vec![block(900_000, 3000, 1_500_000)],
            mempool: Some(MempoolSnapshot {
                pending_count: 10_000,
                vsize_bytes: 5_000_000,
                total_fee_btc: onchain_types::Btc(0.5),
                fee_bands: FeeBands {
                    fastest: 20.0,
                    half_hour: 15.0,
                    hour: 10.0,
                    economy: 5.0,
                    minimum: 1.0,
                },
            }),
            mempool_txs: Vec::new(),
        };

        let snapshot = aggregator.assemble(
            AssetType::Btc,
            TimeframeType::OneHour,
            Utc.with_ymd_and_hms(2026, 7, 28, 13, 42, 0).unwrap(),
            input,
        );

        assert_eq!(snapshot.data_completeness.get(), 1.0);
        assert!(snapshot.blockchain.is_some());
        assert!(snapshot.mempool.is_some());
        assert_eq!(
            snapshot.timestamp,
            Utc.with_ymd_and_hms(2026, 7, 28, 13, 0, 0).unwrap()
        );
    }

    #[test]
    fn missing_mempool_reduces_completeness_by_one_third() {
        let tags = EmptyTagSource;
        let aggregator = MetricsAggregator::new(TierThresholds::default(), &tags);
        let input = AggregatorInput {
            chain_height: Some(900_000),
            blocks: vec![block(900_000, 3000, 1_500_000)],
            mempool: None,
            mempool_txs: Vec::new(),
        };

        let snapshot = aggregator.assemble(
            AssetType::Btc,
            TimeframeType::OneHour,
            Utc::now(),
            input,
        );

        assert!((snapshot.data_completeness.get() - 2.0 / 3.0).abs() < 1e-9);
        assert!(snapshot.mempool.is_none());
    }

    #[test]
    fn missing_blockchain_and_mempool_leaves_only_whale_present() {
        let tags = EmptyTagSource;
        let aggregator = MetricsAggregator::new(TierThresholds::default(), &tags);
        let input = AggregatorInput::default();

        let snapshot = aggregator.assemble(
            AssetType::Btc,
            TimeframeType::OneDay,
            Utc::now(),
            input,
        );

        assert!((snapshot.data_completeness.get() - 1.0 / 3.0).abs() < 1e-9);
        assert!(snapshot.blockchain.is_none());
        assert!(snapshot.whale.is_some());
    }

    #[test]
    fn avg_tx_per_block_divides_total_tx_by_blocks_analyzed() {
        let tags = EmptyTagSource;
        let aggregator = MetricsAggregator::new(TierThresholds::default(), &tags);
        let input = AggregatorInput {
            chain_height: Some(1),
            blocks: vec![block(1, 2000, 1_000_000), block(2, 4000, 1_000_000)],
            mempool: None,
            mempool_txs: Vec::new(),
        };

        let snapshot = aggregator.assemble(AssetType::Btc, TimeframeType::OneHour, Utc::now(), input);
        let stats = snapshot.blockchain.unwrap();
        assert_eq!(stats.blocks_analyzed, 2);
        assert_eq!(stats.total_tx, 6000);
        assert_eq!(stats.avg_tx_per_block, 3000.0);
    }
}
