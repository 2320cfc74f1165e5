use thiserror::Error;

/// `PersistenceError` (spec.md §7): DB unavailable or constraint violated.
/// Every fallible public function in this crate returns `Result<T, Error>`,
/// grounded on `lwk_app::Error`'s flat, `#[from]`-wrapping shape.
#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid enum stored in row: {0}")]
    InvalidEnum(#[from] onchain_types::ParseEnumError),

    #[error("no snapshot found for {asset}/{timeframe} at {timestamp}")]
    NotFound {
        asset: String,
        timeframe: String,
        timestamp: String,
    },

    #[error("audit record not found for hash {0}")]
    AuditRecordNotFound(String),
}
