//! Shared data model for the on-chain intelligence pipeline: the normalized
//! blockchain types ingested from upstream providers, the derived metrics
//! and signal types produced by the pipeline, and the canonical-JSON
//! helpers the audit layer hashes against.

pub mod amounts;
pub mod blockchain;
pub mod canonical;
pub mod enums;
pub mod error;
pub mod metrics;
pub mod signal;

pub use amounts::{Btc, Ratio};
pub use blockchain::{AddressInfo, FeeBands, Input, MempoolSnapshot, Output, RawBlock, RawTx};
pub use enums::{AssetType, Bias, FlowType, SourceStatus, State, Tier, TimeframeType, TxStatus};
pub use error::ParseEnumError;
pub use metrics::{BlockchainStats, WhaleActivitySummary, WhaleMetrics, WhaleTx};
pub use metrics::MetricsSnapshot;
pub use signal::{
    AuditRecord, Context, DecisionContext, DerivedSignal, QualityFacts, RiskFlags, Signals,
    SourceHealth, UsagePolicy, Verification,
};
