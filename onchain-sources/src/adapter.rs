//! Source Adapter (C1): the capability set every upstream REST API is
//! normalized behind. One trait, no inheritance (spec.md §9 REDESIGN
//! FLAGS), grounded on `lwk_wollet`'s `BlockchainBackend` trait
//! (`examples/Blockstream-lwk/lwk_wollet/src/clients/mod.rs`) shared across
//! esplora/electrum backends.

use async_trait::async_trait;
use onchain_types::{AddressInfo, FeeBands, MempoolSnapshot, RawBlock, RawTx};

use crate::error::AdapterError;
use crate::health::HealthTracker;

/// Either a block height or a block hash, the two ways callers may refer to
/// a block (spec.md §4.1).
#[derive(Debug, Clone)]
pub enum BlockRef {
    Height(u64),
    Hash(String),
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable identifier used in logs, health tracking, and `AdapterError`.
    fn name(&self) -> &'static str;

    /// This adapter's own `HealthTracker` (C2), consulted by C3 before
    /// dispatch and updated by every call the adapter makes.
    fn health(&self) -> &HealthTracker;

    async fn get_block_height(&self) -> Result<u64, AdapterError>;

    async fn get_block(&self, reference: BlockRef) -> Result<RawBlock, AdapterError>;

    /// Paged transaction fetch for a block; optional capability.
    async fn get_block_transactions(
        &self,
        block_hash: &str,
        start_index: u32,
    ) -> Result<Vec<RawTx>, AdapterError>;

    async fn get_transaction(&self, txid: &str) -> Result<RawTx, AdapterError>;

    async fn get_mempool_info(&self) -> Result<MempoolSnapshot, AdapterError>;

    async fn get_recommended_fees(&self) -> Result<FeeBands, AdapterError>;

    /// Optional capability; adapters that don't support it return
    /// `AdapterErrorKind::CapabilityUnsupported`.
    async fn get_address(&self, address: &str) -> Result<AddressInfo, AdapterError>;
}
