use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ParseEnumError;

/// Tradable asset this pipeline covers. Closed to `BTC` today; the Python
/// original threads a free `asset: str` through every call site but never
/// calls with anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssetType {
    Btc,
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BTC")
    }
}

impl FromStr for AssetType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BTC" => Ok(AssetType::Btc),
            other => Err(ParseEnumError {
                kind: "asset",
                value: other.to_string(),
            }),
        }
    }
}

/// One of the three analysis windows the pipeline supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeframeType {
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "1d")]
    OneDay,
}

impl TimeframeType {
    /// Number of recent blocks the metrics aggregator (C5) pulls for this
    /// timeframe, per spec.md §4.5.
    pub fn lookback_blocks(self) -> u32 {
        match self {
            TimeframeType::OneHour => 6,
            TimeframeType::FourHours => 24,
            TimeframeType::OneDay => 144,
        }
    }

    /// Floors `ts` to this timeframe's boundary (hour / 4-hour / day), UTC.
    pub fn floor(self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let day_start = Utc
            .with_ymd_and_hms(ts.year(), ts.month(), ts.day(), 0, 0, 0)
            .single()
            .expect("valid calendar date");
        match self {
            TimeframeType::OneHour => ts
                .date_naive()
                .and_hms_opt(ts.hour(), 0, 0)
                .expect("valid hour")
                .and_utc(),
            TimeframeType::FourHours => {
                let block = (ts.hour() / 4) * 4;
                day_start + Duration::hours(block as i64)
            }
            TimeframeType::OneDay => day_start,
        }
    }
}

impl fmt::Display for TimeframeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeframeType::OneHour => "1h",
            TimeframeType::FourHours => "4h",
            TimeframeType::OneDay => "1d",
        };
        f.write_str(s)
    }
}

impl FromStr for TimeframeType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1h" => Ok(TimeframeType::OneHour),
            "4h" => Ok(TimeframeType::FourHours),
            "1d" => Ok(TimeframeType::OneDay),
            other => Err(ParseEnumError {
                kind: "timeframe",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookback_blocks_match_spec() {
        assert_eq!(TimeframeType::OneHour.lookback_blocks(), 6);
        assert_eq!(TimeframeType::FourHours.lookback_blocks(), 24);
        assert_eq!(TimeframeType::OneDay.lookback_blocks(), 144);
    }

    #[test]
    fn floor_to_hour_truncates_minutes_and_seconds() {
        let ts = Utc.with_ymd_and_hms(2026, 7, 28, 14, 37, 9).unwrap();
        let floored = TimeframeType::OneHour.floor(ts);
        assert_eq!(floored, Utc.with_ymd_and_hms(2026, 7, 28, 14, 0, 0).unwrap());
    }

    #[test]
    fn floor_to_four_hours_snaps_to_block_boundary() {
        let ts = Utc.with_ymd_and_hms(2026, 7, 28, 14, 37, 9).unwrap();
        let floored = TimeframeType::FourHours.floor(ts);
        assert_eq!(floored, Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap());
    }

    #[test]
    fn floor_to_day_truncates_to_midnight() {
        let ts = Utc.with_ymd_and_hms(2026, 7, 28, 14, 37, 9).unwrap();
        let floored = TimeframeType::OneDay.floor(ts);
        assert_eq!(floored, Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 0).unwrap());
    }

    #[test]
    fn timeframe_roundtrips_through_display_and_fromstr() {
        for tf in [
            TimeframeType::OneHour,
            TimeframeType::FourHours,
            TimeframeType::OneDay,
        ] {
            assert_eq!(tf.to_string().parse::<TimeframeType>().unwrap(), tf);
        }
    }
}

/// Kill-switch output state (C8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum State {
    Active,
    Degraded,
    Blocked,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            State::Active => "ACTIVE",
            State::Degraded => "DEGRADED",
            State::Blocked => "BLOCKED",
        };
        f.write_str(s)
    }
}

impl FromStr for State {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(State::Active),
            "DEGRADED" => Ok(State::Degraded),
            "BLOCKED" => Ok(State::Blocked),
            other => Err(ParseEnumError {
                kind: "state",
                value: other.to_string(),
            }),
        }
    }
}

/// Directional classification of the current context (C7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bias {
    Positive,
    Neutral,
    Negative,
}

impl fmt::Display for Bias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Bias::Positive => "positive",
            Bias::Neutral => "neutral",
            Bias::Negative => "negative",
        };
        f.write_str(s)
    }
}

impl FromStr for Bias {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(Bias::Positive),
            "neutral" => Ok(Bias::Neutral),
            "negative" => Ok(Bias::Negative),
            other => Err(ParseEnumError {
                kind: "bias",
                value: other.to_string(),
            }),
        }
    }
}

/// Health status of one source adapter (C2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceStatus {
    Healthy,
    Degraded,
    Down,
    Unknown,
}

/// Transaction confirmation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Confirmed,
    Mempool,
}

/// Whale value tier, highest threshold met wins (C4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Large,
    Whale,
    #[serde(rename = "ultra_whale")]
    UltraWhale,
    Leviathan,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::Large => "large",
            Tier::Whale => "whale",
            Tier::UltraWhale => "ultra_whale",
            Tier::Leviathan => "leviathan",
        };
        f.write_str(s)
    }
}

impl FromStr for Tier {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "large" => Ok(Tier::Large),
            "whale" => Ok(Tier::Whale),
            "ultra_whale" => Ok(Tier::UltraWhale),
            "leviathan" => Ok(Tier::Leviathan),
            other => Err(ParseEnumError {
                kind: "tier",
                value: other.to_string(),
            }),
        }
    }
}

/// Whale transaction flow classification (C4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowType {
    Inflow,
    Outflow,
    Internal,
    Unknown,
}

impl fmt::Display for FlowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FlowType::Inflow => "inflow",
            FlowType::Outflow => "outflow",
            FlowType::Internal => "internal",
            FlowType::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

impl FromStr for FlowType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inflow" => Ok(FlowType::Inflow),
            "outflow" => Ok(FlowType::Outflow),
            "internal" => Ok(FlowType::Internal),
            "unknown" => Ok(FlowType::Unknown),
            other => Err(ParseEnumError {
                kind: "flow_type",
                value: other.to_string(),
            }),
        }
    }
}
