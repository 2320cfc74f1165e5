//! BlockCypher adapter (fallback 2). Grounded on the priority list in
//! `examples/original_source/btc_collector/core/multi_source_provider.py`
//! ("Fallback 2: blockcypher (FREE tier, feature-rich)") against the public
//! `api.blockcypher.com/v1/btc/main` REST API.
//!
//! BlockCypher's free tier has no dedicated fee-recommendation endpoint;
//! `medium_fee_per_kb` from the chain endpoint is reused as a single-band
//! estimate (spec.md §4.1 normalization is lossy here by design, documented
//! rather than faked).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use onchain_types::{AddressInfo, Btc, FeeBands, MempoolSnapshot, RawBlock, RawTx, TxStatus};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};

use crate::adapter::{BlockRef, SourceAdapter};
use crate::error::AdapterError;
use crate::health::HealthTracker;
use crate::http::get_with_retry;
use crate::ratelimit::TokenBucket;

pub const NAME: &str = "blockcypher";
const DEFAULT_BASE_URL: &str = "https://api.blockcypher.com/v1/btc/main";

pub struct BlockCypherAdapter {
    base_url: String,
    token: Option<String>,
    client: Client,
    limiter: TokenBucket,
    pub health: HealthTracker,
}

impl BlockCypherAdapter {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        BlockCypherAdapter {
            base_url: base_url.into(),
            token,
            client: Client::new(),
            // Free tier: 3 req/s, 100 req/hr. Stay conservative.
            limiter: TokenBucket::new(Duration::from_millis(500), 2),
            health: HealthTracker::new(),
        }
    }

    pub fn from_env() -> Self {
        let token = std::env::var("BLOCKCYPHER_API_TOKEN").ok().filter(|s| !s.is_empty());
        BlockCypherAdapter::new(DEFAULT_BASE_URL, token)
    }

    fn url(&self, path: &str) -> String {
        match &self.token {
            Some(token) => {
                let sep = if path.contains('?') { '&' } else { '?' };
                format!("{}{}{}token={}", self.base_url, path, sep, token)
            }
            None => format!("{}{}", self.base_url, path),
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, AdapterError> {
        let url = self.url(path);
        let start = Instant::now();
        match get_with_retry(&self.client, NAME, &self.limiter, &url).await {
            Ok(resp) => {
                let parsed = resp
                    .json::<T>()
                    .await
                    .map_err(|e| AdapterError::from_reqwest(NAME, e));
                match &parsed {
                    Ok(_) => {
                        self.health
                            .record_success(start.elapsed().as_secs_f64() * 1000.0)
                            .await
                    }
                    Err(_) => self.health.record_failure().await,
                }
                parsed
            }
            Err(err) => {
                self.health.record_failure().await;
                Err(err)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChainResponse {
    height: u64,
    hash: String,
    time: DateTime<Utc>,
    medium_fee_per_kb: Option<i64>,
    high_fee_per_kb: Option<i64>,
    low_fee_per_kb: Option<i64>,
    unconfirmed_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct BlockTxInput {
    prev_hash: Option<String>,
    output_index: Option<i64>,
    output_value: Option<i64>,
    addresses: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct BlockTxOutput {
    value: i64,
    addresses: Option<Vec<String>>,
    script_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BlockTx {
    hash: String,
    size: Option<u64>,
    vsize: Option<u64>,
    fees: Option<i64>,
    inputs: Vec<BlockTxInput>,
    outputs: Vec<BlockTxOutput>,
    confirmations: Option<u64>,
}

impl From<BlockTx> for RawTx {
    fn from(tx: BlockTx) -> Self {
        let confirmed = tx.confirmations.unwrap_or(0) > 0;
        RawTx {
            txid: tx.hash,
            size: tx.size,
            weight: tx.vsize.map(|v| v * 4),
            fee: tx.fees.map(Btc::from_sats),
            vin: tx
                .inputs
                .into_iter()
                .map(|i| onchain_types::Input {
                    prev_txid: i.prev_hash,
                    prev_vout: i.output_index.map(|v| v as u32),
                    value: i.output_value.map(Btc::from_sats),
                    origin_address: i.addresses.and_then(|a| a.into_iter().next()),
                })
                .collect(),
            vout: tx
                .outputs
                .into_iter()
                .map(|o| onchain_types::Output {
                    value: Btc::from_sats(o.value),
                    address: o.addresses.and_then(|a| a.into_iter().next()),
                    script_type: o.script_type,
                })
                .collect(),
            status: if confirmed {
                TxStatus::Confirmed
            } else {
                TxStatus::Mempool
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct BlockResponse {
    hash: String,
    height: u64,
    time: DateTime<Utc>,
    #[serde(rename = "n_tx")]
    n_tx: u32,
    #[serde(default)]
    txs: Vec<BlockTx>,
}

#[derive(Debug, Deserialize)]
struct AddressResponse {
    address: String,
    balance: i64,
    total_received: i64,
    total_sent: i64,
    n_tx: u64,
}

#[async_trait]
impl SourceAdapter for BlockCypherAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn health(&self) -> &HealthTracker {
        &self.health
    }

    async fn get_block_height(&self) -> Result<u64, AdapterError> {
        let chain: ChainResponse = self.get_json("").await?;
        Ok(chain.height)
    }

    async fn get_block(&self, reference: BlockRef) -> Result<RawBlock, AdapterError> {
        let path = match reference {
            BlockRef::Height(height) => format!("/blocks/{height}?txstart=0&limit=500"),
            BlockRef::Hash(hash) => format!("/blocks/{hash}?txstart=0&limit=500"),
        };
        let block: BlockResponse = self.get_json(&path).await?;
        Ok(RawBlock {
            hash: block.hash,
            height: block.height,
            time: block.time,
            size: None,
            tx_count: Some(block.n_tx),
            transactions: block.txs.into_iter().map(RawTx::from).collect(),
            error: None,
        })
    }

    async fn get_block_transactions(
        &self,
        block_hash: &str,
        start_index: u32,
    ) -> Result<Vec<RawTx>, AdapterError> {
        let block: BlockResponse = self
            .get_json(&format!("/blocks/{block_hash}?txstart={start_index}&limit=500"))
            .await?;
        Ok(block.txs.into_iter().map(RawTx::from).collect())
    }

    async fn get_transaction(&self, txid: &str) -> Result<RawTx, AdapterError> {
        let tx: BlockTx = self.get_json(&format!("/txs/{txid}")).await?;
        Ok(tx.into())
    }

    async fn get_mempool_info(&self) -> Result<MempoolSnapshot, AdapterError> {
        let chain: ChainResponse = self.get_json("").await?;
        let fee_per_kb = chain.medium_fee_per_kb.unwrap_or(0) as f64 / 1000.0;
        Ok(MempoolSnapshot {
            pending_count: chain.unconfirmed_count.unwrap_or(0),
            vsize_bytes: 0,
            total_fee_btc: Btc::ZERO,
            fee_bands: FeeBands {
                fastest: chain.high_fee_per_kb.unwrap_or(0) as f64 / 1000.0,
                half_hour: fee_per_kb,
                hour: fee_per_kb,
                economy: chain.low_fee_per_kb.unwrap_or(0) as f64 / 1000.0,
                minimum: chain.low_fee_per_kb.unwrap_or(0) as f64 / 1000.0,
            },
        })
    }

    async fn get_recommended_fees(&self) -> Result<FeeBands, AdapterError> {
        let chain: ChainResponse = self.get_json("").await?;
        let fee_per_kb = chain.medium_fee_per_kb.unwrap_or(0) as f64 / 1000.0;
        Ok(FeeBands {
            fastest: chain.high_fee_per_kb.unwrap_or(0) as f64 / 1000.0,
            half_hour: fee_per_kb,
            hour: fee_per_kb,
            economy: chain.low_fee_per_kb.unwrap_or(0) as f64 / 1000.0,
            minimum: chain.low_fee_per_kb.unwrap_or(0) as f64 / 1000.0,
        })
    }

    async fn get_address(&self, address: &str) -> Result<AddressInfo, AdapterError> {
        let resp: AddressResponse = self.get_json(&format!("/addrs/{address}/balance")).await?;
        Ok(AddressInfo {
            address: resp.address,
            balance: Some(Btc::from_sats(resp.balance)),
            total_received: Some(Btc::from_sats(resp.total_received)),
            total_sent: Some(Btc::from_sats(resp.total_sent)),
            tx_count: Some(resp.n_tx),
        })
    }
}
