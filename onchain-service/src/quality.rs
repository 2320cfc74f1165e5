//! Shared `QualityFacts` derivation used by both the write path (C10's
//! per-tick pipeline) and the read path (C11's query service), so the two
//! agree on what "freshness" means for a `MetricsSnapshot`.
//!
//! `MetricsSnapshot.timestamp` is floored to the timeframe boundary
//! (`TimeframeType::floor`) for determinism (the same tick always produces
//! the same key), not to reflect when the underlying chain data was
//! actually observed. Measuring `data_age_seconds` against that boundary
//! makes a `4h`/`1d` context look up to 4h/24h stale at the moment it's
//! produced, which blows past the default `max_data_age` (2h) for almost
//! the whole period and forces `BLOCKED` regardless of how fresh the data
//! really is. Instead, age is measured against the most recent analyzed
//! block's own timestamp — the actual data-collection freshness — mirroring
//! the original's `metadata["data_age_seconds"]`, which is populated by the
//! collector from the data it just fetched, not from the record's own key.

use chrono::{DateTime, Utc};

use onchain_types::MetricsSnapshot;

/// Age, in seconds, of the freshest chain data the snapshot was built from.
/// Falls back to zero when no block was available to measure against (a
/// degraded snapshot, spec.md §4.5) — the missing sub-struct already lowers
/// `data_completeness`, so treating unknown freshness as maximally stale
/// here would double-penalize the same gap.
pub fn data_age_seconds(snapshot: &MetricsSnapshot, now: DateTime<Utc>) -> i64 {
    match snapshot.blockchain.as_ref().and_then(|b| b.latest_block_time) {
        Some(latest) => (now - latest).num_seconds().max(0),
        None => 0,
    }
}
