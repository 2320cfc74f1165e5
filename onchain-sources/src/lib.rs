pub mod adapter;
pub mod blockchain_info;
pub mod blockcypher;
pub mod error;
pub mod health;
pub mod mempool_space;
pub mod provider;
pub mod ratelimit;

mod http;

pub use adapter::{BlockRef, SourceAdapter};
pub use blockchain_info::BlockchainInfoAdapter;
pub use blockcypher::BlockCypherAdapter;
pub use error::{AdapterError, AdapterErrorKind, AllSourcesFailed};
pub use health::HealthTracker;
pub use mempool_space::MempoolSpaceAdapter;
pub use provider::MultiSourceProvider;
pub use ratelimit::TokenBucket;
