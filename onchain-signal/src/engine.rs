//! Signal Engine (C7): the deterministic `MetricsSnapshot + thresholds →
//! {signals, score, bias, confidence}` function, per spec.md §4.7. Grounded
//! in shape (not formula — spec.md §4.7 is normative over the original's
//! richer weighted multi-signal scorer) on
//! `examples/original_source/onchain_signal_engine/core/signal_engine.py`'s
//! pipeline: fetch inputs, derive signals, roll up a score, determine bias,
//! and expose the baseline/threshold values the audit layer hashes
//! (`SignalResult.threshold_values` / `baseline_metrics` in
//! `examples/original_source/onchain_signal_engine/models/signal_data.py`).

use onchain_types::{Bias, Btc, DerivedSignal, MetricsSnapshot, Ratio, WhaleMetrics};

use crate::config::SignalWeights;

/// The subset of the snapshot the engine actually read, carried alongside
/// the result so C9 can hash exactly what produced it.
#[derive(Debug, Clone, Copy)]
pub struct BaselineMetrics {
    pub net_flow_btc: Btc,
    pub dominance: Ratio,
    pub avg_tx_per_block: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct SignalEvaluation {
    pub signal: DerivedSignal,
    pub baseline: BaselineMetrics,
    pub thresholds: SignalWeights,
}

/// Pure function: `MetricsSnapshot + SignalWeights → DerivedSignal`. Missing
/// sub-structs (a degraded snapshot, spec.md §4.5) contribute zero/empty
/// values rather than failing the calculation — a BLOCKED decision for a
/// low-completeness snapshot is the kill-switch's (C8) job, not this one's.
pub fn evaluate(snapshot: &MetricsSnapshot, weights: &SignalWeights) -> SignalEvaluation {
    let empty_whale = WhaleMetrics::empty();
    let whale = snapshot.whale.as_ref().unwrap_or(&empty_whale);
    let avg_tx_per_block = snapshot
        .blockchain
        .as_ref()
        .map(|b| b.avg_tx_per_block)
        .unwrap_or(0.0);

    let smart_money_accumulation = whale.net_flow_btc.0 > 0.0;
    let whale_flow_dominant = whale.dominance.get() > weights.dominance_threshold;
    let network_growth = avg_tx_per_block > weights.network_growth_threshold;
    let distribution_risk =
        whale.net_flow_btc.0 < 0.0 && whale.net_flow_btc.abs().0 > weights.distribution_risk_btc;

    let mut score: f64 = 50.0;
    if smart_money_accumulation {
        score += weights.smart_money_accumulation as f64;
    }
    if whale_flow_dominant {
        score += weights.whale_flow_dominant as f64;
    }
    if network_growth {
        score += weights.network_growth as f64;
    }
    if distribution_risk {
        score += weights.distribution_risk as f64;
    }
    let score = score.clamp(0.0, 100.0);

    let bias = if score >= weights.bias_positive_at as f64 {
        Bias::Positive
    } else if score <= weights.bias_negative_at as f64 {
        Bias::Negative
    } else {
        Bias::Neutral
    };

    let active_count = [
        smart_money_accumulation,
        whale_flow_dominant,
        network_growth,
        distribution_risk,
    ]
    .iter()
    .filter(|b| **b)
    .count();

    let confidence = if smart_money_accumulation && distribution_risk {
        0.5
    } else if active_count >= 3 {
        0.85
    } else if active_count == 2 {
        0.70
    } else {
        0.60
    };

    let signal = DerivedSignal {
        smart_money_accumulation,
        whale_flow_dominant,
        network_growth,
        distribution_risk,
        score: score.round() as u8,
        bias,
        confidence: Ratio::new(confidence),
    };

    SignalEvaluation {
        signal,
        baseline: BaselineMetrics {
            net_flow_btc: whale.net_flow_btc,
            dominance: whale.dominance,
            avg_tx_per_block,
        },
        thresholds: *weights,
    }
}

/// The only directly-conflicting pair in this 4-signal set (DESIGN.md Open
/// Question decision #4): `smart_money_accumulation` reads bullish net flow
/// while `distribution_risk` reads bearish net flow over the same window,
/// so both active at once is a logical contradiction rather than
/// independent evidence.
pub fn conflicting_signal_count(signal: &DerivedSignal) -> u32 {
    u32::from(signal.smart_money_accumulation && signal.distribution_risk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use onchain_types::{AssetType, BlockchainStats, TimeframeType};
    use std::collections::HashMap;

    fn snapshot(avg_tx_per_block: f64, net_flow_btc: f64, dominance: f64) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: chrono::Utc::now(),
            asset: AssetType::Btc,
            timeframe: TimeframeType::OneDay,
            blockchain: Some(BlockchainStats {
                height: 900_000,
                blocks_analyzed: 144,
                total_tx: 0,
                avg_block_size: 0.0,
                avg_tx_per_block,
                latest_block_time: Some(chrono::Utc::now()),
            }),
            mempool: None,
            whale: Some(WhaleMetrics {
                tier_counts: HashMap::new(),
                tier_volumes_btc: HashMap::new(),
                inflow_btc: Btc::ZERO,
                outflow_btc: Btc::ZERO,
                net_flow_btc: Btc(net_flow_btc),
                dominance: Ratio::new(dominance),
                tx_records: Vec::new(),
            }),
            data_completeness: Ratio::new(1.0),
        }
    }

    #[test]
    fn s1_nominal_positive() {
        let eval = evaluate(&snapshot(3200.0, 250.0, 0.42), &SignalWeights::default());
        assert!(eval.signal.smart_money_accumulation);
        assert!(eval.signal.whale_flow_dominant);
        assert!(eval.signal.network_growth);
        assert!(!eval.signal.distribution_risk);
        assert_eq!(eval.signal.score, 100);
        assert_eq!(eval.signal.bias, Bias::Positive);
        assert!((eval.signal.confidence.get() - 0.85).abs() < 1e-9);
    }

    #[test]
    fn direct_conflict_yields_low_confidence() {
        // Same-window contradiction is impossible by formula (net_flow_btc
        // can't be both > 0 and < 0); confidence=0.5 is exercised directly
        // against the two booleans per DESIGN.md's Open Question decision.
        let signal = DerivedSignal {
            smart_money_accumulation: true,
            whale_flow_dominant: false,
            network_growth: false,
            distribution_risk: true,
            score: 45,
            bias: Bias::Neutral,
            confidence: Ratio::new(0.5),
        };
        assert_eq!(conflicting_signal_count(&signal), 1);
    }

    #[test]
    fn all_zero_metrics_yield_baseline_score_and_confidence() {
        let eval = evaluate(&snapshot(0.0, 0.0, 0.0), &SignalWeights::default());
        assert_eq!(eval.signal.score, 50);
        assert_eq!(eval.signal.bias, Bias::Neutral);
        assert!((eval.signal.confidence.get() - 0.60).abs() < 1e-9);
    }

    #[test]
    fn dominance_exactly_at_threshold_is_not_dominant() {
        let eval = evaluate(&snapshot(0.0, 0.0, 0.30), &SignalWeights::default());
        assert!(!eval.signal.whale_flow_dominant);
    }

    #[test]
    fn distribution_risk_requires_strictly_greater_than_100_btc_outflow() {
        let eval = evaluate(&snapshot(0.0, -100.0, 0.0), &SignalWeights::default());
        assert!(!eval.signal.distribution_risk);
        let eval = evaluate(&snapshot(0.0, -100.01, 0.0), &SignalWeights::default());
        assert!(eval.signal.distribution_risk);
    }

    #[test]
    fn score_clamps_at_100_and_0() {
        let weights = SignalWeights::default();
        let high = evaluate(&snapshot(5000.0, 500.0, 0.9), &weights);
        assert_eq!(high.signal.score, 100);

        let low = evaluate(&snapshot(0.0, -500.0, 0.0), &weights);
        assert_eq!(low.signal.score, 10);
    }

    #[test]
    fn missing_blockchain_and_whale_substructs_degrade_to_defaults() {
        let snapshot = MetricsSnapshot {
            timestamp: chrono::Utc::now(),
            asset: AssetType::Btc,
            timeframe: TimeframeType::OneHour,
            blockchain: None,
            mempool: None,
            whale: None,
            data_completeness: Ratio::new(0.0),
        };
        let eval = evaluate(&snapshot, &SignalWeights::default());
        assert_eq!(eval.signal.score, 50);
        assert_eq!(eval.signal.bias, Bias::Neutral);
    }
}
