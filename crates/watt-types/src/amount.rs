use serde::{Deserialize, Serialize};
use std::fmt;

pub const WATT_DECIMALS: u32 = 6;
pub const WATT_BASE_UNIT: u64 = 1_000_000; // 10^6

/// Fixed-point WATT amount in base units (6 decimals, matching the SPL mint).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct WattAmount(u64);

impl WattAmount {
    pub const ZERO: Self = Self(0);
    pub const MAX_SUPPLY: Self = Self(1_000_000_000 * WATT_BASE_UNIT); // 10^9 WATT

    pub fn from_watt(watt: f64) -> Self {
        Self((watt * WATT_BASE_UNIT as f64).round() as u64)
    }

    pub fn from_base_units(units: u64) -> Self {
        Self(units)
    }

    pub fn to_watt(&self) -> f64 {
        self.0 as f64 / WATT_BASE_UNIT as f64
    }

    pub fn to_base_units(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(&self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(&self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0).min(Self::MAX_SUPPLY.0))
    }

    pub fn saturating_sub(&self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Scale by a fraction in [0, 1+], rounding to the nearest base unit.
    /// Used for stake percentages, return fractions and tier bonuses.
    pub fn mul_fraction(&self, fraction: f64) -> Self {
        debug_assert!(fraction >= 0.0);
        Self((self.0 as f64 * fraction).round() as u64)
    }
}

impl fmt::Display for WattAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6} WATT", self.to_watt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        let amount = WattAmount::from_watt(50_000.0);
        assert_eq!(amount.to_base_units(), 50_000 * WATT_BASE_UNIT);
        assert_eq!(amount.to_watt(), 50_000.0);
    }

    #[test]
    fn test_mul_fraction() {
        let reward = WattAmount::from_watt(50_000.0);
        assert_eq!(reward.mul_fraction(0.10), WattAmount::from_watt(5_000.0));
        assert_eq!(reward.mul_fraction(1.10), WattAmount::from_watt(55_000.0));
        assert_eq!(reward.mul_fraction(0.0), WattAmount::ZERO);
    }

    #[test]
    fn test_checked_arithmetic() {
        let a = WattAmount::from_watt(10.0);
        let b = WattAmount::from_watt(30.0);
        assert_eq!(a.checked_sub(b), None);
        assert_eq!(b.checked_sub(a), Some(WattAmount::from_watt(20.0)));
        assert_eq!(
            WattAmount::from_base_units(u64::MAX).checked_add(WattAmount::from_base_units(1)),
            None
        );
    }
}
