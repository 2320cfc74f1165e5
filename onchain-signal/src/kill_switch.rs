//! Kill-Switch / State Machine (C8): `DerivedSignal + QualityFacts + config
//! → {state, usage_policy}`, per spec.md §4.8. Priority-ordered, memoryless
//! evaluation grounded on
//! `examples/original_source/onchain_api/services/kill_switch.py`'s
//! `evaluate_signal_safety` (BLOCKED-before-DEGRADED, first-match-wins
//! check ladder); the exact thresholds and the two-state (rather than the
//! original's three-tier OK/DEGRADED/BLOCKED-per-check) collapse into
//! ACTIVE/DEGRADED/BLOCKED come from `spec.md` §4.8, which is normative.

use onchain_types::{
    Context, DecisionContext, DerivedSignal, QualityFacts, RiskFlags, Signals, State, UsagePolicy,
    Verification,
};

use crate::config::KillSwitchConfig;

/// The trigger condition named in `usage_policy.notes` on BLOCKED/DEGRADED,
/// so a consumer can tell which check fired without the internal exception
/// crossing the public boundary (spec.md §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    InvariantsFailed,
    NotDeterministic,
    DataAgeExceedsMax,
    ConfidenceBelowMinimum,
    StabilityBelowThreshold,
    CompletenessBelowThreshold,
    TooManyConflictingSignals,
    None,
}

impl Trigger {
    fn label(self) -> &'static str {
        match self {
            Trigger::InvariantsFailed => "invariants_failed",
            Trigger::NotDeterministic => "not_deterministic",
            Trigger::DataAgeExceedsMax => "data_age_exceeds_max",
            Trigger::ConfidenceBelowMinimum => "confidence_below_minimum",
            Trigger::StabilityBelowThreshold => "stability_below_threshold",
            Trigger::CompletenessBelowThreshold => "completeness_below_threshold",
            Trigger::TooManyConflictingSignals => "too_many_conflicting_signals",
            Trigger::None => "",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Decision {
    pub state: State,
    pub usage_policy: UsagePolicy,
    pub trigger: Trigger,
}

/// First-match-wins priority order: BLOCKED conditions, then DEGRADED
/// conditions, else ACTIVE (spec.md §4.8).
pub fn evaluate(signal: &DerivedSignal, quality: &QualityFacts, config: &KillSwitchConfig) -> Decision {
    if !quality.invariants_passed {
        return blocked(config, Trigger::InvariantsFailed);
    }
    if !quality.deterministic {
        return blocked(config, Trigger::NotDeterministic);
    }
    if quality.data_age_seconds > config.max_data_age_seconds {
        return blocked(config, Trigger::DataAgeExceedsMax);
    }
    if signal.confidence.get() < config.min_confidence {
        return blocked(config, Trigger::ConfidenceBelowMinimum);
    }

    if quality.stability_score.get() < config.stability_threshold {
        return degraded(config, Trigger::StabilityBelowThreshold);
    }
    if quality.data_completeness.get() < config.completeness_threshold {
        return degraded(config, Trigger::CompletenessBelowThreshold);
    }
    if quality.conflicting_signal_count > config.max_conflicting_signals {
        return degraded(config, Trigger::TooManyConflictingSignals);
    }

    Decision {
        state: State::Active,
        usage_policy: UsagePolicy {
            allowed: true,
            recommended_weight: config.base_weight,
            notes: "Normal operation".to_string(),
        },
        trigger: Trigger::None,
    }
}

fn blocked(_config: &KillSwitchConfig, trigger: Trigger) -> Decision {
    Decision {
        state: State::Blocked,
        usage_policy: UsagePolicy {
            allowed: false,
            recommended_weight: 0.0,
            notes: format!("BLOCKED: {}", trigger.label()),
        },
        trigger,
    }
}

fn degraded(config: &KillSwitchConfig, trigger: Trigger) -> Decision {
    Decision {
        state: State::Degraded,
        usage_policy: UsagePolicy {
            allowed: true,
            recommended_weight: 0.3 * config.base_weight,
            notes: format!("DEGRADED: {}", trigger.label()),
        },
        trigger,
    }
}

/// Assembles the public wire shape (spec.md §6) from a `DerivedSignal`, the
/// `QualityFacts` that produced a `Decision`, and the decision itself. I2:
/// `onchain_score` is `None` iff `state == BLOCKED`.
pub fn build_context(
    asset: onchain_types::AssetType,
    timeframe: onchain_types::TimeframeType,
    timestamp: chrono::DateTime<chrono::Utc>,
    signal: &DerivedSignal,
    quality: &QualityFacts,
    decision: &Decision,
) -> Context {
    Context {
        product: "onchain_intelligence".to_string(),
        version: "1.0.0".to_string(),
        asset,
        timeframe,
        timestamp,
        state: decision.state,
        decision_context: DecisionContext {
            onchain_score: match decision.state {
                State::Blocked => None,
                _ => Some(signal.score as f64),
            },
            bias: signal.bias,
            confidence: round2(signal.confidence.get()),
        },
        signals: Signals {
            smart_money_accumulation: signal.smart_money_accumulation,
            whale_flow_dominant: signal.whale_flow_dominant,
            network_growth: signal.network_growth,
            distribution_risk: signal.distribution_risk,
        },
        risk_flags: RiskFlags {
            data_lag: decision.trigger == Trigger::DataAgeExceedsMax,
            signal_conflict: quality.conflicting_signal_count > 0,
            anomaly_detected: quality.anomaly_count > 0,
        },
        verification: Verification {
            invariants_passed: quality.invariants_passed,
            deterministic: quality.deterministic,
            stability_score: quality.stability_score.get(),
            data_completeness: quality.data_completeness.get(),
        },
        usage_policy: decision.usage_policy.clone(),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use onchain_types::{Bias, Ratio};

    fn signal(confidence: f64) -> DerivedSignal {
        DerivedSignal {
            smart_money_accumulation: true,
            whale_flow_dominant: true,
            network_growth: true,
            distribution_risk: false,
            score: 100,
            bias: Bias::Positive,
            confidence: Ratio::new(confidence),
        }
    }

    fn quality() -> QualityFacts {
        QualityFacts {
            invariants_passed: true,
            deterministic: true,
            stability_score: Ratio::new(0.88),
            data_completeness: Ratio::new(0.95),
            data_age_seconds: 120,
            conflicting_signal_count: 0,
            anomaly_count: 0,
        }
    }

    #[test]
    fn s1_nominal_positive_is_active_with_full_weight() {
        let config = KillSwitchConfig::default();
        let decision = evaluate(&signal(0.85), &quality(), &config);
        assert_eq!(decision.state, State::Active);
        assert!(decision.usage_policy.allowed);
        assert_eq!(decision.usage_policy.recommended_weight, 1.0);
    }

    #[test]
    fn s2_direct_conflict_confidence_blocks() {
        let config = KillSwitchConfig::default();
        let decision = evaluate(&signal(0.5), &quality(), &config);
        assert_eq!(decision.state, State::Blocked);
        assert!(!decision.usage_policy.allowed);
        assert_eq!(decision.usage_policy.recommended_weight, 0.0);
    }

    #[test]
    fn s3_stale_data_blocks_with_data_age_trigger() {
        let config = KillSwitchConfig::default();
        let mut q = quality();
        q.data_age_seconds = 10_000;
        let decision = evaluate(&signal(0.8), &q, &config);
        assert_eq!(decision.state, State::Blocked);
        assert!(decision.usage_policy.notes.contains("data_age"));
    }

    #[test]
    fn s4_degraded_by_completeness_has_reduced_weight() {
        let config = KillSwitchConfig::default();
        let mut q = quality();
        q.data_completeness = Ratio::new(0.667);
        let decision = evaluate(&signal(0.75), &q, &config);
        assert_eq!(decision.state, State::Degraded);
        assert!(decision.usage_policy.allowed);
        assert!((decision.usage_policy.recommended_weight - 0.3).abs() < 1e-9);
    }

    #[test]
    fn invariant_violation_blocks_regardless_of_everything_else() {
        let config = KillSwitchConfig::default();
        let mut q = quality();
        q.invariants_passed = false;
        let decision = evaluate(&signal(0.99), &q, &config);
        assert_eq!(decision.state, State::Blocked);
    }

    #[test]
    fn p1_blocked_iff_score_null_iff_usage_disallowed() {
        let config = KillSwitchConfig::default();
        let mut q = quality();
        q.data_age_seconds = 999_999;
        let decision = evaluate(&signal(0.8), &q, &config);
        let ctx = build_context(
            onchain_types::AssetType::Btc,
            onchain_types::TimeframeType::OneDay,
            chrono::Utc::now(),
            &signal(0.8),
            &q,
            &decision,
        );
        assert_eq!(ctx.state, State::Blocked);
        assert!(ctx.decision_context.onchain_score.is_none());
        assert!(!ctx.usage_policy.allowed);
    }

    #[test]
    fn active_context_carries_through_score_and_weight() {
        let config = KillSwitchConfig::default();
        let decision = evaluate(&signal(0.85), &quality(), &config);
        let ctx = build_context(
            onchain_types::AssetType::Btc,
            onchain_types::TimeframeType::OneDay,
            chrono::Utc::now(),
            &signal(0.85),
            &quality(),
            &decision,
        );
        assert_eq!(ctx.decision_context.onchain_score, Some(100.0));
        assert_eq!(ctx.usage_policy.recommended_weight, 1.0);
        assert!(ctx.usage_policy.allowed);
    }
}
