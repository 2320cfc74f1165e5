//! Multi-Source Provider (C3): priority-ordered dispatch across adapters
//! with automatic fallback, plus a `force_source` test override. Grounded on
//! `examples/original_source/btc_collector/core/multi_source_provider.py`'s
//! `MultiSourceProvider._call_with_fallback` — same priority-list-with-skip
//! logic, generalized from Python's `getattr(source, method)` dynamic
//! dispatch to a boxed-future closure per call (spec.md §4.2, §9 REDESIGN
//! FLAGS: no dynamic dispatch by method name).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use onchain_types::{AddressInfo, FeeBands, MempoolSnapshot, RawBlock, RawTx};
use tokio::sync::RwLock;

use crate::adapter::{BlockRef, SourceAdapter};
use crate::blockchain_info::BlockchainInfoAdapter;
use crate::blockcypher::BlockCypherAdapter;
use crate::error::{AdapterError, AllSourcesFailed};
use crate::mempool_space::MempoolSpaceAdapter;

type BoxFut<T> = Pin<Box<dyn Future<Output = Result<T, AdapterError>> + Send>>;

/// The set of sources in priority order and the optional `force_source`
/// override used by tests to exercise fallback deterministically.
pub struct MultiSourceProvider {
    sources: Vec<Arc<dyn SourceAdapter>>,
    forced: RwLock<Option<&'static str>>,
}

impl MultiSourceProvider {
    /// Constructs the standard priority order: mempool.space, then
    /// blockchain.info, then blockcypher (spec.md §4.2).
    pub fn from_env() -> Self {
        MultiSourceProvider::new(vec![
            Arc::new(MempoolSpaceAdapter::from_env()),
            Arc::new(BlockchainInfoAdapter::from_env()),
            Arc::new(BlockCypherAdapter::from_env()),
        ])
    }

    pub fn new(sources: Vec<Arc<dyn SourceAdapter>>) -> Self {
        MultiSourceProvider {
            sources,
            forced: RwLock::new(None),
        }
    }

    /// Restricts dispatch to a single named source, bypassing health and
    /// priority order. Used by tests to force a specific fallback path.
    pub async fn force_source(&self, name: Option<&'static str>) {
        *self.forced.write().await = name;
    }

    async fn dispatch_order(&self) -> Vec<Arc<dyn SourceAdapter>> {
        let forced = *self.forced.read().await;
        match forced {
            Some(name) => self
                .sources
                .iter()
                .filter(|s| s.name() == name)
                .cloned()
                .collect(),
            None => self.sources.clone(),
        }
    }

    pub async fn health_snapshot(&self) -> Vec<(&'static str, onchain_types::SourceHealth)> {
        let mut snapshots = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            snapshots.push((source.name(), source.health().snapshot().await));
        }
        snapshots
    }

    async fn call_with_fallback<T, F>(
        &self,
        method: &'static str,
        mut call: F,
    ) -> Result<(T, &'static str), AllSourcesFailed>
    where
        F: FnMut(&Arc<dyn SourceAdapter>) -> BoxFut<T>,
    {
        let order = self.dispatch_order().await;
        let mut attempted = Vec::new();
        let mut errors = Vec::new();

        for source in &order {
            // Forced sources are tried unconditionally; health still gates
            // the normal priority path (spec.md I7: skip unavailable
            // sources rather than waiting on them).
            if self.forced.read().await.is_none() && !source.health().is_available().await {
                continue;
            }

            attempted.push(source.name());
            match call(source).await {
                Ok(value) => return Ok((value, source.name())),
                Err(err) => errors.push(err),
            }
        }

        Err(AllSourcesFailed {
            method,
            attempted,
            errors,
        })
    }

    pub async fn get_block_height(&self) -> Result<(u64, &'static str), AllSourcesFailed> {
        self.call_with_fallback("get_block_height", |s| {
            let s = Arc::clone(s);
            Box::pin(async move { s.get_block_height().await })
        })
        .await
    }

    pub async fn get_block(
        &self,
        reference: BlockRef,
    ) -> Result<(RawBlock, &'static str), AllSourcesFailed> {
        self.call_with_fallback("get_block", move |s| {
            let s = Arc::clone(s);
            let reference = reference.clone();
            Box::pin(async move { s.get_block(reference).await })
        })
        .await
    }

    pub async fn get_block_transactions(
        &self,
        block_hash: &str,
        start_index: u32,
    ) -> Result<(Vec<RawTx>, &'static str), AllSourcesFailed> {
        let block_hash = block_hash.to_string();
        self.call_with_fallback("get_block_transactions", move |s| {
            let s = Arc::clone(s);
            let block_hash = block_hash.clone();
            Box::pin(async move { s.get_block_transactions(&block_hash, start_index).await })
        })
        .await
    }

    pub async fn get_transaction(
        &self,
        txid: &str,
    ) -> Result<(RawTx, &'static str), AllSourcesFailed> {
        let txid = txid.to_string();
        self.call_with_fallback("get_transaction", move |s| {
            let s = Arc::clone(s);
            let txid = txid.clone();
            Box::pin(async move { s.get_transaction(&txid).await })
        })
        .await
    }

    pub async fn get_mempool_info(
        &self,
    ) -> Result<(MempoolSnapshot, &'static str), AllSourcesFailed> {
        self.call_with_fallback("get_mempool_info", |s| {
            let s = Arc::clone(s);
            Box::pin(async move { s.get_mempool_info().await })
        })
        .await
    }

    pub async fn get_recommended_fees(
        &self,
    ) -> Result<(FeeBands, &'static str), AllSourcesFailed> {
        self.call_with_fallback("get_recommended_fees", |s| {
            let s = Arc::clone(s);
            Box::pin(async move { s.get_recommended_fees().await })
        })
        .await
    }

    pub async fn get_address(
        &self,
        address: &str,
    ) -> Result<(AddressInfo, &'static str), AllSourcesFailed> {
        let address = address.to_string();
        self.call_with_fallback("get_address", move |s| {
            let s = Arc::clone(s);
            let address = address.clone();
            Box::pin(async move { s.get_address(&address).await })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct StubAdapter {
        name: &'static str,
        health: crate::health::HealthTracker,
        fails: bool,
        calls: AtomicU32,
    }

    impl StubAdapter {
        fn new(name: &'static str, fails: bool) -> Self {
            StubAdapter {
                name,
                health: crate::health::HealthTracker::new(),
                fails,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl SourceAdapter for StubAdapter {
        fn name(&self) -> &'static str {
            self.name
        }

        fn health(&self) -> &crate::health::HealthTracker {
            &self.health
        }

        async fn get_block_height(&self) -> Result<u64, AdapterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fails {
                self.health.record_failure().await;
                Err(AdapterError::new(
                    self.name,
                    crate::error::AdapterErrorKind::Network,
                    "stub failure",
                ))
            } else {
                self.health.record_success(1.0).await;
                Ok(800_000)
            }
        }

        async fn get_block(&self, _reference: BlockRef) -> Result<RawBlock, AdapterError> {
            unimplemented!()
        }

        async fn get_block_transactions(
            &self,
            _block_hash: &str,
            _start_index: u32,
        ) -> Result<Vec<RawTx>, AdapterError> {
            unimplemented!()
        }

        async fn get_transaction(&self, _txid: &str) -> Result<RawTx, AdapterError> {
            unimplemented!()
        }

        async fn get_mempool_info(&self) -> Result<MempoolSnapshot, AdapterError> {
            unimplemented!()
        }

        async fn get_recommended_fees(&self) -> Result<FeeBands, AdapterError> {
            unimplemented!()
        }

        async fn get_address(&self, _address: &str) -> Result<AddressInfo, AdapterError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn falls_back_to_next_source_when_primary_fails() {
        let primary = Arc::new(StubAdapter::new("primary", true));
        let fallback = Arc::new(StubAdapter::new("fallback_1", false));
        let provider = MultiSourceProvider::new(vec![primary, fallback]);

        let (height, used) = provider.get_block_height().await.unwrap();
        assert_eq!(height, 800_000);
        assert_eq!(used, "fallback_1");
    }

    #[tokio::test]
    async fn all_sources_failing_raises_all_sources_failed() {
        let a = Arc::new(StubAdapter::new("a", true));
        let b = Arc::new(StubAdapter::new("b", true));
        let provider = MultiSourceProvider::new(vec![a, b]);

        let err = provider.get_block_height().await.unwrap_err();
        assert_eq!(err.attempted, vec!["a", "b"]);
        assert_eq!(err.errors.len(), 2);
    }

    #[tokio::test]
    async fn force_source_bypasses_priority_order() {
        let primary = Arc::new(StubAdapter::new("primary", false));
        let fallback = Arc::new(StubAdapter::new("fallback_1", false));
        let provider = MultiSourceProvider::new(vec![primary, fallback]);

        provider.force_source(Some("fallback_1")).await;
        let (_, used) = provider.get_block_height().await.unwrap();
        assert_eq!(used, "fallback_1");
    }

    #[tokio::test]
    async fn down_source_is_skipped_without_being_attempted() {
        let primary = Arc::new(StubAdapter::new("primary", true));
        let fallback = Arc::new(StubAdapter::new("fallback_1", false));
        for _ in 0..5 {
            primary.health.record_failure().await;
        }
        let provider = MultiSourceProvider::new(vec![primary, fallback]);

        let (_, used) = provider.get_block_height().await.unwrap();
        assert_eq!(used, "fallback_1");
    }
}
