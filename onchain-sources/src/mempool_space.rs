//! mempool.space adapter (primary source). Grounded on
//! `examples/original_source/btc_collector/core/multi_source_provider.py`'s
//! priority list ("Primary: mempool.space (FREE, fastest)") and the public
//! mempool.space REST API (`/api/blocks/tip/height`, `/api/block/:hash`,
//! `/api/v1/fees/recommended`, `/api/mempool`, `/api/tx/:txid`,
//! `/api/address/:address`), wired through the esplora-style retry helper in
//! `http.rs`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use onchain_types::{AddressInfo, Btc, FeeBands, MempoolSnapshot, RawBlock, RawTx, TxStatus};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};

use crate::adapter::{BlockRef, SourceAdapter};
use crate::error::{AdapterError, AdapterErrorKind};
use crate::health::HealthTracker;
use crate::http::get_with_retry;
use crate::ratelimit::TokenBucket;

pub const NAME: &str = "mempool_space";
const DEFAULT_BASE_URL: &str = "https://mempool.space/api";

pub struct MempoolSpaceAdapter {
    base_url: String,
    client: Client,
    limiter: TokenBucket,
    pub health: HealthTracker,
}

impl MempoolSpaceAdapter {
    pub fn new(base_url: impl Into<String>) -> Self {
        MempoolSpaceAdapter {
            base_url: base_url.into(),
            client: Client::new(),
            limiter: TokenBucket::new(Duration::from_millis(250), 4),
            health: HealthTracker::new(),
        }
    }

    pub fn from_env() -> Self {
        let base_url = std::env::var("MEMPOOL_SPACE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        MempoolSpaceAdapter::new(base_url)
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response, AdapterError> {
        let url = format!("{}{}", self.base_url, path);
        let start = Instant::now();
        match get_with_retry(&self.client, NAME, &self.limiter, &url).await {
            Ok(resp) => {
                self.health
                    .record_success(start.elapsed().as_secs_f64() * 1000.0)
                    .await;
                Ok(resp)
            }
            Err(err) => {
                self.health.record_failure().await;
                Err(err)
            }
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, AdapterError> {
        let resp = self.get(path).await?;
        resp.json::<T>()
            .await
            .map_err(|e| AdapterError::from_reqwest(NAME, e))
    }
}

#[derive(Debug, Deserialize)]
struct MempoolBlockStatus {
    confirmed: bool,
}

#[derive(Debug, Deserialize)]
struct MempoolVin {
    prevout: Option<MempoolVout>,
}

#[derive(Debug, Deserialize)]
struct MempoolVout {
    value: i64,
    scriptpubkey_address: Option<String>,
    scriptpubkey_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MempoolTx {
    txid: String,
    size: u64,
    weight: u64,
    fee: i64,
    vin: Vec<MempoolVin>,
    vout: Vec<MempoolVout>,
    status: MempoolBlockStatus,
}

impl From<MempoolTx> for RawTx {
    fn from(tx: MempoolTx) -> Self {
        RawTx {
            txid: tx.txid,
            size: Some(tx.size),
            weight: Some(tx.weight),
            fee: Some(Btc::from_sats(tx.fee)),
            vin: tx
                .vin
                .into_iter()
                .map(|v| onchain_types::Input {
                    prev_txid: None,
                    prev_vout: None,
                    value: v.prevout.as_ref().map(|p| Btc::from_sats(p.value)),
                    origin_address: v.prevout.as_ref().and_then(|p| p.scriptpubkey_address.clone()),
                })
                .collect(),
            vout: tx
                .vout
                .into_iter()
                .map(|v| onchain_types::Output {
                    value: Btc::from_sats(v.value),
                    address: v.scriptpubkey_address,
                    script_type: v.scriptpubkey_type,
                })
                .collect(),
            status: if tx.status.confirmed {
                TxStatus::Confirmed
            } else {
                TxStatus::Mempool
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct MempoolBlock {
    id: String,
    height: u64,
    timestamp: i64,
    size: u64,
    tx_count: u32,
}

#[derive(Debug, Deserialize)]
struct MempoolFees {
    #[serde(rename = "fastestFee")]
    fastest_fee: f64,
    #[serde(rename = "halfHourFee")]
    half_hour_fee: f64,
    #[serde(rename = "hourFee")]
    hour_fee: f64,
    #[serde(rename = "economyFee")]
    economy_fee: f64,
    #[serde(rename = "minimumFee")]
    minimum_fee: f64,
}

#[derive(Debug, Deserialize)]
struct MempoolInfoResponse {
    count: u64,
    vsize: u64,
    total_fee: i64,
}

#[derive(Debug, Deserialize)]
struct MempoolAddressStats {
    funded_txo_sum: i64,
    spent_txo_sum: i64,
}

#[derive(Debug, Deserialize)]
struct MempoolAddressResponse {
    address: String,
    chain_stats: MempoolAddressStats,
    mempool_stats: MempoolAddressStats,
}

#[async_trait]
impl SourceAdapter for MempoolSpaceAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn health(&self) -> &HealthTracker {
        &self.health
    }

    async fn get_block_height(&self) -> Result<u64, AdapterError> {
        let resp = self.get("/blocks/tip/height").await?;
        let text = resp
            .text()
            .await
            .map_err(|e| AdapterError::from_reqwest(NAME, e))?;
        text.trim()
            .parse::<u64>()
            .map_err(|_| AdapterError::new(NAME, AdapterErrorKind::Decode, "non-numeric height"))
    }

    async fn get_block(&self, reference: BlockRef) -> Result<RawBlock, AdapterError> {
        let hash = match reference {
            BlockRef::Hash(hash) => hash,
            BlockRef::Height(height) => {
                let resp = self.get(&format!("/block-height/{height}")).await?;
                resp.text()
                    .await
                    .map_err(|e| AdapterError::from_reqwest(NAME, e))?
                    .trim()
                    .to_string()
            }
        };

        let block: MempoolBlock = self.get_json(&format!("/block/{hash}")).await?;
        let transactions = self.get_block_transactions(&hash, 0).await?;

        Ok(RawBlock {
            hash: block.id,
            height: block.height,
            time: DateTime::<Utc>::from_timestamp(block.timestamp, 0)
                .unwrap_or_else(Utc::now),
            size: Some(block.size),
            tx_count: Some(block.tx_count),
            transactions,
            error: None,
        })
    }

    async fn get_block_transactions(
        &self,
        block_hash: &str,
        start_index: u32,
    ) -> Result<Vec<RawTx>, AdapterError> {
        let txs: Vec<MempoolTx> = self
            .get_json(&format!("/block/{block_hash}/txs/{start_index}"))
            .await?;
        Ok(txs.into_iter().map(RawTx::from).collect())
    }

    async fn get_transaction(&self, txid: &str) -> Result<RawTx, AdapterError> {
        let tx: MempoolTx = self.get_json(&format!("/tx/{txid}")).await?;
        Ok(tx.into())
    }

    async fn get_mempool_info(&self) -> Result<MempoolSnapshot, AdapterError> {
        let info: MempoolInfoResponse = self.get_json("/mempool").await?;
        let fees: MempoolFees = self.get_json("/v1/fees/recommended").await?;

        Ok(MempoolSnapshot {
            pending_count: info.count,
            vsize_bytes: info.vsize,
            total_fee_btc: Btc::from_sats(info.total_fee),
            fee_bands: FeeBands {
                fastest: fees.fastest_fee,
                half_hour: fees.half_hour_fee,
                hour: fees.hour_fee,
                economy: fees.economy_fee,
                minimum: fees.minimum_fee,
            },
        })
    }

    async fn get_recommended_fees(&self) -> Result<FeeBands, AdapterError> {
        let fees: MempoolFees = self.get_json("/v1/fees/recommended").await?;
        Ok(FeeBands {
            fastest: fees.fastest_fee,
            half_hour: fees.half_hour_fee,
            hour: fees.hour_fee,
            economy: fees.economy_fee,
            minimum: fees.minimum_fee,
        })
    }

    async fn get_address(&self, address: &str) -> Result<AddressInfo, AdapterError> {
        let resp: MempoolAddressResponse = self.get_json(&format!("/address/{address}")).await?;
        let received =
            resp.chain_stats.funded_txo_sum + resp.mempool_stats.funded_txo_sum;
        let sent = resp.chain_stats.spent_txo_sum + resp.mempool_stats.spent_txo_sum;

        Ok(AddressInfo {
            address: resp.address,
            balance: Some(Btc::from_sats(received - sent)),
            total_received: Some(Btc::from_sats(received)),
            total_sent: Some(Btc::from_sats(sent)),
            tx_count: None,
        })
    }
}
