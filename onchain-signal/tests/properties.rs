//! Property tests for P1-P4 (spec.md §8), run over randomized inputs
//! rather than the fixed scenarios already covered by the unit tests in
//! `src/engine.rs` and `src/kill_switch.rs`.

use chrono::Utc;
use proptest::prelude::*;

use onchain_signal::config::{KillSwitchConfig, SignalWeights};
use onchain_signal::{engine, kill_switch};
use onchain_types::{
    AssetType, BlockchainStats, Btc, MetricsSnapshot, Ratio, TimeframeType, WhaleMetrics,
};

fn snapshot_with(net_flow_btc: f64, dominance: f64, avg_tx_per_block: f64) -> MetricsSnapshot {
    MetricsSnapshot {
        timestamp: Utc::now(),
        asset: AssetType::Btc,
        timeframe: TimeframeType::OneDay,
        blockchain: Some(BlockchainStats {
            height: 900_000,
            blocks_analyzed: 144,
            total_tx: 0,
            avg_block_size: 0.0,
            avg_tx_per_block,
            latest_block_time: Some(Utc::now()),
        }),
        mempool: None,
        whale: Some(WhaleMetrics {
            tier_counts: Default::default(),
            tier_volumes_btc: Default::default(),
            inflow_btc: Btc::ZERO,
            outflow_btc: Btc::ZERO,
            net_flow_btc: Btc(net_flow_btc),
            dominance: Ratio::new(dominance),
            tx_records: Vec::new(),
        }),
        data_completeness: Ratio::new(1.0),
    }
}

proptest! {
    /// P3: score stays in [0, 100] after clamping for any combination of
    /// boolean signal inputs.
    #[test]
    fn p3_score_always_clamped(
        net_flow in -5000.0f64..5000.0,
        dominance in 0.0f64..1.0,
        avg_tx_per_block in 0.0f64..10_000.0,
    ) {
        let snapshot = snapshot_with(net_flow, dominance, avg_tx_per_block);
        let eval = engine::evaluate(&snapshot, &SignalWeights::default());
        prop_assert!(eval.signal.score <= 100);
    }

    /// P4: `smart_money_accumulation` and `distribution_risk` are pure
    /// functions of `net_flow_btc`'s sign and magnitude, independent of the
    /// other two signals.
    #[test]
    fn p4_signals_match_net_flow_sign_and_magnitude(
        net_flow in -5000.0f64..5000.0,
        dominance in 0.0f64..1.0,
        avg_tx_per_block in 0.0f64..10_000.0,
    ) {
        let snapshot = snapshot_with(net_flow, dominance, avg_tx_per_block);
        let eval = engine::evaluate(&snapshot, &SignalWeights::default());
        prop_assert_eq!(eval.signal.smart_money_accumulation, net_flow > 0.0);
        prop_assert_eq!(eval.signal.distribution_risk, net_flow < 0.0 && net_flow.abs() > 100.0);
    }

    /// P2: any signal whose confidence falls below `min_confidence` blocks,
    /// regardless of what the other quality facts say.
    #[test]
    fn p2_low_confidence_always_blocks(
        net_flow in -5000.0f64..5000.0,
        dominance in 0.0f64..1.0,
        avg_tx_per_block in 0.0f64..10_000.0,
        confidence in 0.0f64..1.0,
    ) {
        let config = KillSwitchConfig::default();
        prop_assume!(confidence < config.min_confidence);

        let snapshot = snapshot_with(net_flow, dominance, avg_tx_per_block);
        let mut eval = engine::evaluate(&snapshot, &SignalWeights::default());
        eval.signal.confidence = Ratio::new(confidence);

        let quality = onchain_types::QualityFacts::defaults(Ratio::new(1.0), 60);
        let decision = kill_switch::evaluate(&eval.signal, &quality, &config);
        prop_assert_eq!(decision.state, onchain_types::State::Blocked);
    }

    /// P1: for every emitted `Context`, BLOCKED, a null score, and a
    /// disallowed usage policy are all equivalent.
    #[test]
    fn p1_blocked_iff_score_null_iff_disallowed(
        net_flow in -5000.0f64..5000.0,
        dominance in 0.0f64..1.0,
        avg_tx_per_block in 0.0f64..10_000.0,
        confidence in 0.0f64..1.0,
        data_age_seconds in 0i64..20_000,
        invariants_passed in any::<bool>(),
    ) {
        let config = KillSwitchConfig::default();
        let snapshot = snapshot_with(net_flow, dominance, avg_tx_per_block);
        let mut eval = engine::evaluate(&snapshot, &SignalWeights::default());
        eval.signal.confidence = Ratio::new(confidence);

        let quality = onchain_types::QualityFacts {
            invariants_passed,
            deterministic: true,
            stability_score: Ratio::new(1.0),
            data_completeness: Ratio::new(1.0),
            data_age_seconds,
            conflicting_signal_count: 0,
            anomaly_count: 0,
        };

        let decision = kill_switch::evaluate(&eval.signal, &quality, &config);
        let context = kill_switch::build_context(
            AssetType::Btc,
            TimeframeType::OneDay,
            snapshot.timestamp,
            &eval.signal,
            &quality,
            &decision,
        );

        let blocked = context.state == onchain_types::State::Blocked;
        prop_assert_eq!(blocked, context.decision_context.onchain_score.is_none());
        prop_assert_eq!(blocked, !context.usage_policy.allowed);
    }
}
