//! blockchain.info adapter (fallback 1). Grounded on
//! `examples/original_source/btc_collector/core/blockchain_api_client.py`'s
//! `BlockchainInfoClient` (`/latestblock`, `/rawblock/:hash`,
//! `/rawtx/:hash`, `/rawaddr/:address`) and the priority list in
//! `multi_source_provider.py` ("Fallback 1: blockchain.info").
//!
//! blockchain.info has no public mempool-fee-estimate endpoint, so
//! `get_mempool_info` and `get_recommended_fees` report
//! `CapabilityUnsupported` (spec.md §4.1/§7: fall through, don't degrade
//! health).

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

pub const NAME: &str = "blockchain_info";
const DEFAULT_BASE_URL: &str = "https://blockchain.info";

pub struct BlockchainInfoAdapter {
    base_url: String,
    api_key: Option<String>,
    client: Client,
    limiter: TokenBucket,
    pub health: HealthTracker,
}

impl BlockchainInfoAdapter {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        BlockchainInfoAdapter {
            base_url: base_url.into(),
            api_key,
            // blockchain.info asks for at most one request per 10s on
            // /rawblock; stay well under that for every endpoint.
            client: Client::new(),
            limiter: TokenBucket::new(Duration::from_secs(1), 2),
            health: HealthTracker::new(),
        }
    }

    pub fn from_env() -> Self {
        let api_key = std::env::var("BLOCKCHAIN_INFO_API_KEY").ok().filter(|s| !s.is_empty());
        BlockchainInfoAdapter::new(DEFAULT_BASE_URL, api_key)
    }

    fn url(&self, path: &str) -> String {
        match &self.api_key {
            Some(key) => {
                let sep = if path.contains('?') { '&' } else { '?' };
                format!("{}{}{}api_code={}", self.base_url, path, sep, key)
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
struct LatestBlock {
    hash: String,
    height: u64,
}

#[derive(Debug, Deserialize)]
struct RawBlockOut {
    value: i64,
    addr: Option<String>,
    script: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawBlockInPrevOut {
    value: Option<i64>,
    addr: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawBlockIn {
    prev_out: Option<RawBlockInPrevOut>,
}

#[derive(Debug, Deserialize)]
struct RawBlockTx {
    hash: String,
    size: u64,
    weight: Option<u64>,
    fee: Option<i64>,
    inputs: Vec<RawBlockIn>,
    out: Vec<RawBlockOut>,
}

impl From<RawBlockTx> for RawTx {
    fn from(tx: RawBlockTx) -> Self {
        RawTx {
            txid: tx.hash,
            size: Some(tx.size),
            weight: tx.weight,
            fee: tx.fee.map(Btc::from_sats),
            vin: tx
                .inputs
                .into_iter()
                .map(|i| onchain_types::Input {
                    prev_txid: None,
                    prev_vout: None,
                    value: i.prev_out.as_ref().and_then(|p| p.value).map(Btc::from_sats),
                    origin_address: i.prev_out.and_then(|p| p.addr),
                })
                .collect(),
            vout: tx
                .out
                .into_iter()
                .map(|o| onchain_types::Output {
                    value: Btc::from_sats(o.value),
                    address: o.addr,
                    script_type: o.script,
                })
                .collect(),
            // blockchain.info's rawblock/rawtx endpoints only return
            // already-confirmed transactions.
            status: TxStatus::Confirmed,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawBlockResponse {
    hash: String,
    height: u64,
    time: i64,
    size: Option<u64>,
    n_tx: Option<u32>,
    tx: Vec<RawBlockTx>,
}

#[derive(Debug, Deserialize)]
struct RawAddrResponse {
    address: String,
    final_balance: i64,
    total_received: i64,
    total_sent: i64,
    n_tx: u64,
}

#[async_trait]
impl SourceAdapter for BlockchainInfoAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn health(&self) -> &HealthTracker {
        &self.health
    }

    async fn get_block_height(&self) -> Result<u64, AdapterError> {
        let latest: LatestBlock = self.get_json("/latestblock").await?;
        Ok(latest.height)
    }

    async fn get_block(&self, reference: BlockRef) -> Result<RawBlock, AdapterError> {
        let hash = match reference {
            BlockRef::Hash(hash) => hash,
            BlockRef::Height(height) => {
                let latest: LatestBlock = self.get_json("/latestblock").await?;
                if latest.height == height {
                    latest.hash
                } else {
                    #[derive(Debug, Deserialize)]
                    struct BlockHeightResponse {
                        blocks: Vec<RawBlockResponse>,
                    }
                    let resp: BlockHeightResponse = self
                        .get_json(&format!("/block-height/{height}?format=json"))
                        .await?;
                    match resp.blocks.into_iter().next() {
                        Some(block) => {
                            return Ok(RawBlock {
                                hash: block.hash,
                                height,
                                time: DateTime::<Utc>::from_timestamp(block.time, 0)
                                    .unwrap_or_else(Utc::now),
                                size: block.size,
                                tx_count: block.n_tx,
                                transactions: block.tx.into_iter().map(RawTx::from).collect(),
                                error: None,
                            });
                        }
                        None => {
                            return Ok(RawBlock {
                                hash: String::new(),
                                height,
                                time: Utc::now(),
                                size: None,
                                tx_count: None,
                                transactions: Vec::new(),
                                error: Some("block-height lookup returned no blocks".to_string()),
                            });
                        }
                    }
                }
            }
        };

        let block: RawBlockResponse = self.get_json(&format!("/rawblock/{hash}")).await?;
        Ok(RawBlock {
            hash: block.hash,
            height: block.height,
            time: DateTime::<Utc>::from_timestamp(block.time, 0).unwrap_or_else(Utc::now),
            size: block.size,
            tx_count: block.n_tx,
            transactions: block.tx.into_iter().map(RawTx::from).collect(),
            error: None,
        })
    }

    async fn get_block_transactions(
        &self,
        block_hash: &str,
        start_index: u32,
    ) -> Result<Vec<RawTx>, AdapterError> {
        let block: RawBlockResponse = self.get_json(&format!("/rawblock/{block_hash}")).await?;
        Ok(block
            .tx
            .into_iter()
            .skip(start_index as usize)
            .map(RawTx::from)
            .collect())
    }

    async fn get_transaction(&self, txid: &str) -> Result<RawTx, AdapterError> {
        let tx: RawBlockTx = self.get_json(&format!("/rawtx/{txid}")).await?;
        Ok(tx.into())
    }

    async fn get_mempool_info(&self) -> Result<MempoolSnapshot, AdapterError> {
        Err(AdapterError::capability_unsupported(
            NAME,
            "get_mempool_info",
        ))
    }

    async fn get_recommended_fees(&self) -> Result<FeeBands, AdapterError> {
        Err(AdapterError::capability_unsupported(
            NAME,
            "get_recommended_fees",
        ))
    }

    async fn get_address(&self, address: &str) -> Result<AddressInfo, AdapterError> {
        let resp: RawAddrResponse = self.get_json(&format!("/rawaddr/{address}")).await?;
        Ok(AddressInfo {
            address: resp.address,
            balance: Some(Btc::from_sats(resp.final_balance)),
            total_received: Some(Btc::from_sats(resp.total_received)),
            total_sent: Some(Btc::from_sats(resp.total_sent)),
            tx_count: Some(resp.n_tx),
        })
    }
}
