//! Pure on-chain intelligence calculations: whale detection (C4), metrics
//! assembly (C5), signal scoring (C7), and kill-switch decisioning (C8).
//! Nothing in this crate performs I/O — callers (`onchain-service`) supply
//! already-fetched data and persist the results elsewhere.

pub mod aggregator;
pub mod config;
pub mod engine;
pub mod error;
pub mod kill_switch;
pub mod tags;
pub mod whale;

pub use aggregator::{AggregatorInput, MetricsAggregator};
pub use config::{KillSwitchConfig, SignalWeights, TierThresholds};
pub use engine::{BaselineMetrics, SignalEvaluation};
pub use error::DataQualityError;
pub use kill_switch::{build_context, Decision, Trigger};
pub use tags::{AddressTagSource, EmptyTagSource, StaticTagSource};
pub use whale::WhaleDetector;
