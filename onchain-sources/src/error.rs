use thiserror::Error;

/// The kind of failure an adapter call hit, independent of which adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterErrorKind {
    Network,
    Http { status: u16 },
    Timeout,
    Decode,
    /// This upstream doesn't implement the capability at all (e.g. mempool
    /// info on an adapter that only serves blocks). Fall-through still
    /// applies, but `SourceHealth` isn't degraded for it (spec.md §7).
    CapabilityUnsupported,
    RateLimited,
}

/// A single adapter call's failure, tagged with which adapter produced it
/// (spec.md §4.1: "raised as a single abstract `AdapterError{source, kind,
/// message}`").
#[derive(Debug, Error, Clone)]
#[error("{source}: {kind:?}: {message}")]
pub struct AdapterError {
    pub source: &'static str,
    pub kind: AdapterErrorKind,
    pub message: String,
}

impl AdapterError {
    pub fn new(source: &'static str, kind: AdapterErrorKind, message: impl Into<String>) -> Self {
        AdapterError {
            source,
            kind,
            message: message.into(),
        }
    }

    pub fn capability_unsupported(source: &'static str, method: &str) -> Self {
        AdapterError::new(
            source,
            AdapterErrorKind::CapabilityUnsupported,
            format!("{method} not supported by this source"),
        )
    }

    pub fn is_capability_unsupported(&self) -> bool {
        self.kind == AdapterErrorKind::CapabilityUnsupported
    }
}

impl AdapterError {
    /// Adapters call this explicitly (rather than relying on a blanket
    /// `From<reqwest::Error>`) so the `source` tag is always set correctly.
    pub fn from_reqwest(source: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AdapterError::new(source, AdapterErrorKind::Timeout, err.to_string())
        } else if let Some(status) = err.status() {
            AdapterError::new(
                source,
                AdapterErrorKind::Http {
                    status: status.as_u16(),
                },
                err.to_string(),
            )
        } else if err.is_decode() {
            AdapterError::new(source, AdapterErrorKind::Decode, err.to_string())
        } else {
            AdapterError::new(source, AdapterErrorKind::Network, err.to_string())
        }
    }
}

/// Raised by the provider (C3) when every adapter in priority order failed.
#[derive(Debug, Error, Clone)]
#[error("all sources failed for {method}: tried {attempted:?}")]
pub struct AllSourcesFailed {
    pub method: &'static str,
    pub attempted: Vec<&'static str>,
    pub errors: Vec<AdapterError>,
}
