use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::amounts::{Btc, Ratio};
use crate::blockchain::MempoolSnapshot;
use crate::enums::{AssetType, FlowType, Tier, TimeframeType};

/// One transaction that crossed a whale-tier threshold (C4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhaleTx {
    pub txid: String,
    pub block_height: Option<u64>,
    pub timestamp: DateTime<Utc>,
    pub value_btc: Btc,
    pub tier: Tier,
    pub flow_type: FlowType,
    pub fee_btc: Btc,
    pub input_count: u32,
    pub output_count: u32,
}

/// Aggregate whale activity for a window of blocks/mempool (C4 output).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhaleMetrics {
    pub tier_counts: HashMap<Tier, u64>,
    pub tier_volumes_btc: HashMap<Tier, Btc>,
    pub inflow_btc: Btc,
    pub outflow_btc: Btc,
    pub net_flow_btc: Btc,
    pub dominance: Ratio,
    pub tx_records: Vec<WhaleTx>,
}

impl WhaleMetrics {
    pub fn empty() -> Self {
        WhaleMetrics {
            tier_counts: HashMap::new(),
            tier_volumes_btc: HashMap::new(),
            inflow_btc: Btc::ZERO,
            outflow_btc: Btc::ZERO,
            net_flow_btc: Btc::ZERO,
            dominance: Ratio::new(0.0),
            tx_records: Vec::new(),
        }
    }
}

/// Coarse blockchain activity stats for the analyzed window (C5).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockchainStats {
    pub height: u64,
    pub blocks_analyzed: u32,
    pub total_tx: u64,
    pub avg_block_size: f64,
    pub avg_tx_per_block: f64,
    /// Timestamp of the most recent block in the analyzed window — the
    /// actual data-collection freshness, distinct from `MetricsSnapshot.timestamp`
    /// (which is floored to the timeframe boundary and can be hours old for
    /// `4h`/`1d` by construction). `data_age_seconds` (C8's `max_data_age`
    /// check) is measured against this, not the boundary.
    pub latest_block_time: Option<DateTime<Utc>>,
}

/// The timestamped, per-(asset, timeframe) snapshot produced by C5 and
/// consumed by C7. Any sub-struct may be `None` when the provider couldn't
/// supply it (degraded snapshot, spec.md §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub asset: AssetType,
    pub timeframe: TimeframeType,
    pub blockchain: Option<BlockchainStats>,
    pub mempool: Option<MempoolSnapshot>,
    pub whale: Option<WhaleMetrics>,
    /// `[0,1]`; reduced by 1/3 for each missing top-level sub-struct.
    pub data_completeness: Ratio,
}

/// Roll-up of whale tx activity over a trailing window, C6's
/// `whale_activity_summary` read path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhaleActivitySummary {
    pub hours: u32,
    pub tier_counts: HashMap<Tier, u64>,
    pub inflow_btc: Btc,
    pub outflow_btc: Btc,
    pub net_flow_btc: Btc,
    pub tx_count: u64,
}
