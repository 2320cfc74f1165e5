use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::amounts::Ratio;
use crate::enums::{AssetType, Bias, SourceStatus, State, TimeframeType};

/// The four boolean signals C7 derives from a `MetricsSnapshot`, plus the
/// score/bias/confidence rolled up from them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DerivedSignal {
    pub smart_money_accumulation: bool,
    pub whale_flow_dominant: bool,
    pub network_growth: bool,
    pub distribution_risk: bool,
    /// `None` only ever appears in the emitted `Context`, never here: the
    /// engine always computes a numeric score; the kill-switch nullifies it
    /// on BLOCKED (I2).
    pub score: u8,
    pub bias: Bias,
    pub confidence: Ratio,
}

impl DerivedSignal {
    pub fn active_signal_count(&self) -> u32 {
        [
            self.smart_money_accumulation,
            self.whale_flow_dominant,
            self.network_growth,
            self.distribution_risk,
        ]
        .iter()
        .filter(|b| **b)
        .count() as u32
    }
}

/// Quality facts consumed by the kill-switch (C8). `stability_score` and
/// `anomaly_count` default per spec.md §9's Open Questions resolution when
/// no upstream producer sets them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QualityFacts {
    pub invariants_passed: bool,
    pub deterministic: bool,
    pub stability_score: Ratio,
    pub data_completeness: Ratio,
    pub data_age_seconds: i64,
    pub conflicting_signal_count: u32,
    pub anomaly_count: u32,
}

impl QualityFacts {
    /// Defaults for fields not consistently produced upstream (spec.md §9).
    pub fn defaults(data_completeness: Ratio, data_age_seconds: i64) -> Self {
        QualityFacts {
            invariants_passed: true,
            deterministic: true,
            stability_score: Ratio::new(1.0),
            data_completeness,
            data_age_seconds,
            conflicting_signal_count: 0,
            anomaly_count: 0,
        }
    }
}

/// Policy describing whether and how much external consumers may weigh the
/// context (C8 output).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsagePolicy {
    pub allowed: bool,
    pub recommended_weight: f64,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFlags {
    pub data_lag: bool,
    pub signal_conflict: bool,
    pub anomaly_detected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verification {
    pub invariants_passed: bool,
    pub deterministic: bool,
    pub stability_score: f64,
    pub data_completeness: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionContext {
    pub onchain_score: Option<f64>,
    pub bias: Bias,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signals {
    pub smart_money_accumulation: bool,
    pub whale_flow_dominant: bool,
    pub network_growth: bool,
    pub distribution_risk: bool,
}

/// The public wire shape of spec.md §6. Never persisted as such; derived on
/// read from the persisted `MetricsSnapshot` + `DerivedSignal` (C11).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub product: String,
    pub version: String,
    pub asset: AssetType,
    pub timeframe: TimeframeType,
    pub timestamp: DateTime<Utc>,
    pub state: State,
    pub decision_context: DecisionContext,
    pub signals: Signals,
    pub risk_flags: RiskFlags,
    pub verification: Verification,
    pub usage_policy: UsagePolicy,
}

/// Per-adapter rolling health (C2). Process-local; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceHealth {
    pub status: SourceStatus,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub ema_response_ms: f64,
    pub total_requests: u64,
    pub total_failures: u64,
}

impl Default for SourceHealth {
    fn default() -> Self {
        SourceHealth {
            status: SourceStatus::Unknown,
            last_success: None,
            last_failure: None,
            consecutive_failures: 0,
            ema_response_ms: 0.0,
            total_requests: 0,
            total_failures: 0,
        }
    }
}

/// Persisted reproducibility record (C9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub calculation_hash: String,
    pub asset: AssetType,
    pub timeframe: TimeframeType,
    pub timestamp: DateTime<Utc>,
    pub input_data_hash: String,
    pub config_hash: String,
    pub output_snapshot: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
