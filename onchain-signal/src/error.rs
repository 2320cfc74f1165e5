use thiserror::Error;

/// Raised when a mid-pipeline invariant is violated (spec.md §7:
/// `DataQualityError`). The signal engine still emits a `DerivedSignal` from
/// whatever it has — this error is carried as a fact into `QualityFacts`
/// (`invariants_passed = false`) so the kill-switch (C8) forces BLOCKED,
/// rather than aborting the calculation outright.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataQualityError {
    #[error("score {0} out of range [0, 100]")]
    ScoreOutOfRange(i64),
    #[error("completeness {0} out of range [0.0, 1.0]")]
    CompletenessOutOfRange(String),
    #[error("confidence {0} out of range [0.0, 1.0]")]
    ConfidenceOutOfRange(String),
    #[error("negative dominance ratio: {0}")]
    NegativeDominance(String),
}
