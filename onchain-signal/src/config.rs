//! Thresholds and weights consumed by C4/C7/C8. Loaded once at startup and
//! passed by reference (spec.md §9: "a process-wide config record ... no
//! module-level mutable state"). Held separate from `onchain-service`'s
//! `Config` so this crate stays free of env parsing and I/O.

use serde::{Deserialize, Serialize};

/// Whale-tier BTC thresholds (C4). Fixed-threshold regime per spec.md §9's
/// Open Questions resolution; percentile-derived thresholds are a documented
/// non-goal of this implementation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub large: f64,
    pub whale: f64,
    pub ultra_whale: f64,
    pub leviathan: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        TierThresholds {
            large: 10.0,
            whale: 100.0,
            ultra_whale: 500.0,
            leviathan: 1000.0,
        }
    }
}

/// Per-signal score weights and classification thresholds (C7, spec.md
/// §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalWeights {
    pub smart_money_accumulation: i16,
    pub whale_flow_dominant: i16,
    pub network_growth: i16,
    pub distribution_risk: i16,
    pub dominance_threshold: f64,
    pub network_growth_threshold: f64,
    pub distribution_risk_btc: f64,
    pub bias_positive_at: u8,
    pub bias_negative_at: u8,
}

impl Default for SignalWeights {
    fn default() -> Self {
        SignalWeights {
            smart_money_accumulation: 35,
            whale_flow_dominant: 10,
            network_growth: 15,
            distribution_risk: -40,
            dominance_threshold: 0.30,
            network_growth_threshold: 2500.0,
            distribution_risk_btc: 100.0,
            bias_positive_at: 65,
            bias_negative_at: 35,
        }
    }
}

/// Kill-switch thresholds (C8, spec.md §4.8). Env-overridable names are
/// listed in spec.md §6: `MIN_CONFIDENCE`, `STABILITY_THRESHOLD`,
/// `COMPLETENESS_THRESHOLD`, `MAX_DATA_AGE_HOURS`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KillSwitchConfig {
    pub min_confidence: f64,
    pub stability_threshold: f64,
    pub completeness_threshold: f64,
    pub max_conflicting_signals: u32,
    pub max_data_age_seconds: i64,
    pub base_weight: f64,
}

impl Default for KillSwitchConfig {
    fn default() -> Self {
        KillSwitchConfig {
            min_confidence: 0.6,
            stability_threshold: 0.7,
            completeness_threshold: 0.8,
            max_conflicting_signals: 2,
            max_data_age_seconds: 2 * 3600,
            base_weight: 1.0,
        }
    }
}
