use thiserror::Error;

/// Failure to parse one of the closed wire enums (`AssetType`, `TimeframeType`,
/// `State`, `Bias`) from a string.
#[derive(Debug, Error)]
#[error("invalid {kind}: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}
