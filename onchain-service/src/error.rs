use thiserror::Error;

/// Aggregates the other crates' errors via `#[from]`, per `lwk_app::Error`'s
/// flat shape. `ConfigError` (fatal at startup, spec.md §7) is its own
/// variant rather than a separate type, since nothing downstream needs to
/// match on it specifically.
#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("source error: {0}")]
    AllSourcesFailed(#[from] onchain_sources::error::AllSourcesFailed),

    #[error("store error: {0}")]
    Store(#[from] onchain_store::Error),

    #[error("invalid enum: {0}")]
    InvalidEnum(#[from] onchain_types::ParseEnumError),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(#[from] chrono::ParseError),

    #[error("no snapshot found for {asset}/{timeframe} at {timestamp:?}")]
    NotFound {
        asset: String,
        timeframe: String,
        timestamp: Option<String>,
    },

    #[error("tick exceeded its deadline and was aborted")]
    TickTimeout,
}
