use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::amounts::Btc;
use crate::enums::TxStatus;

/// One input of a normalized transaction. `value` and `origin_address` are
/// null until the referenced output has been resolved/enriched; not every
/// upstream source resolves the spending address for an input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Input {
    pub prev_txid: Option<String>,
    pub prev_vout: Option<u32>,
    pub value: Option<Btc>,
    pub origin_address: Option<String>,
}

/// One output of a normalized transaction. `address` is null when the
/// script doesn't resolve to a single address (e.g. OP_RETURN).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub value: Btc,
    pub address: Option<String>,
    pub script_type: Option<String>,
}

/// A transaction normalized from whichever upstream produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTx {
    pub txid: String,
    pub size: Option<u64>,
    pub weight: Option<u64>,
    pub fee: Option<Btc>,
    pub vin: Vec<Input>,
    pub vout: Vec<Output>,
    pub status: TxStatus,
}

impl RawTx {
    /// Sum of output values, the basis for whale-tier classification.
    pub fn total_output_value(&self) -> Btc {
        self.vout.iter().fold(Btc::ZERO, |acc, o| acc + o.value)
    }

    /// Sum of input values known so far (inputs not yet enriched contribute
    /// nothing, per spec.md §3: "missing fields become null, not zero").
    pub fn total_input_value(&self) -> Btc {
        self.vin
            .iter()
            .filter_map(|i| i.value)
            .fold(Btc::ZERO, |acc, v| acc + v)
    }
}

/// A block normalized from whichever upstream produced it. `transactions`
/// may be empty when the adapter returned a stub (see `error`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBlock {
    pub hash: String,
    pub height: u64,
    pub time: DateTime<Utc>,
    pub size: Option<u64>,
    pub tx_count: Option<u32>,
    pub transactions: Vec<RawTx>,
    /// Set when the upstream returned a stub block (throttled / paged out)
    /// rather than a fully populated one.
    pub error: Option<String>,
}

impl RawBlock {
    pub fn is_stub(&self) -> bool {
        self.error.is_some()
    }
}

/// Recommended fee bands, sat/vB.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeBands {
    pub fastest: f64,
    pub half_hour: f64,
    pub hour: f64,
    pub economy: f64,
    pub minimum: f64,
}

/// Current mempool state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MempoolSnapshot {
    pub pending_count: u64,
    pub vsize_bytes: u64,
    pub total_fee_btc: Btc,
    pub fee_bands: FeeBands,
}

/// Minimal address info (C1's optional `get_address`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressInfo {
    pub address: String,
    pub balance: Option<Btc>,
    pub total_received: Option<Btc>,
    pub total_sent: Option<Btc>,
    pub tx_count: Option<u64>,
}
