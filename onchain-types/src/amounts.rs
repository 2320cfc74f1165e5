use serde::{Deserialize, Serialize};
use std::ops::{Add, Neg, Sub};

/// A BTC-denominated amount. Stored as `f64`; spec.md §9 asks for 64-bit
/// floats rounded to 8 decimal places before hashing when the language has
/// no decimal type in the surrounding ecosystem stack.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Btc(pub f64);

impl Btc {
    pub const ZERO: Btc = Btc(0.0);

    /// One satoshi in BTC.
    pub const SAT: f64 = 0.000_000_01;

    /// Converts an integer satoshi amount to BTC (sat / 10^8).
    pub fn from_sats(sats: i64) -> Self {
        Btc(sats as f64 / 100_000_000.0)
    }

    pub fn abs(self) -> Btc {
        Btc(self.0.abs())
    }

    /// Renders the amount rounded to 8 decimal places, the canonical form
    /// used before audit hashing (I5).
    pub fn to_canonical_string(self) -> String {
        format!("{:.8}", round8(self.0))
    }
}

impl Add for Btc {
    type Output = Btc;
    fn add(self, rhs: Btc) -> Btc {
        Btc(self.0 + rhs.0)
    }
}

impl Sub for Btc {
    type Output = Btc;
    fn sub(self, rhs: Btc) -> Btc {
        Btc(self.0 - rhs.0)
    }
}

impl Neg for Btc {
    type Output = Btc;
    fn neg(self) -> Btc {
        Btc(-self.0)
    }
}

/// A value confined to `[0, 1]` (confidence, completeness, dominance, ...).
/// Construction clamps; spec.md invariants I3/I4 treat out-of-range values
/// as a pipeline defect, so callers that need the fail-fast behavior should
/// check before clamping rather than rely on this type to reject.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ratio(f64);

impl Ratio {
    pub fn new(value: f64) -> Self {
        Ratio(value.clamp(0.0, 1.0))
    }

    pub fn get(self) -> f64 {
        self.0
    }

    pub fn is_in_range(value: f64) -> bool {
        (0.0..=1.0).contains(&value)
    }

    pub fn to_canonical_string(self) -> String {
        format!("{:.8}", round8(self.0))
    }
}

/// Rounds to 8 decimal places (spec.md §4.7 / §9).
pub fn round8(value: f64) -> f64 {
    (value * 1e8).round() / 1e8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_sats_divides_by_1e8() {
        assert_eq!(Btc::from_sats(150_000_000).0, 1.5);
    }

    #[test]
    fn ratio_clamps_out_of_range_input() {
        assert_eq!(Ratio::new(1.5).get(), 1.0);
        assert_eq!(Ratio::new(-0.2).get(), 0.0);
    }

    #[test]
    fn ratio_is_in_range_rejects_outside_unit_interval() {
        assert!(Ratio::is_in_range(0.0));
        assert!(Ratio::is_in_range(1.0));
        assert!(!Ratio::is_in_range(1.01));
        assert!(!Ratio::is_in_range(-0.01));
    }
}
