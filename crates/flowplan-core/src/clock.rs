//! Fixed-precision clock-rate codec.
//!
//! A machine's clock speed is stored as an integer scaled by 100,000 per unit
//! of decimal multiplier (thousandths of a percentage point), so 100% is
//! stored as `100_000` and 250% as `250_000`. All conversions into the stored
//! form truncate with `floor`. The codec never clamps; see [`ClockSpeed`] for
//! the valid range.

use serde::{Deserialize, Serialize};

/// Stored units per percentage point.
pub const PER_PERCENT: i64 = 1_000;

/// Stored units per unit of decimal multiplier.
pub const PER_DECIMAL: i64 = 100_000;

/// `floor(v * scale)`, tolerant of the representation error in `v * scale`.
///
/// A value already quantized to the scale (e.g. `33.333 * 1000`) can land one
/// ulp below the integer it denotes; snapping to that integer keeps the
/// round-trip law exact for quantized inputs.
fn scaled_floor(v: f64, scale: i64) -> i64 {
    let x = v * scale as f64;
    let nearest = x.round();
    if (x - nearest).abs() <= f64::EPSILON * nearest.abs().max(1.0) * 4.0 {
        nearest as i64
    } else {
        x.floor() as i64
    }
}

/// `floor(p * 1000)`.
#[inline]
pub fn from_percent(p: f64) -> i64 {
    scaled_floor(p, PER_PERCENT)
}

/// `stored / 1000`.
#[inline]
pub fn to_percent(stored: i64) -> f64 {
    stored as f64 / PER_PERCENT as f64
}

/// `floor(d * 100000)`.
#[inline]
pub fn from_decimal(d: f64) -> i64 {
    scaled_floor(d, PER_DECIMAL)
}

/// `stored / 100000`.
#[inline]
pub fn to_decimal(stored: i64) -> f64 {
    stored as f64 / PER_DECIMAL as f64
}

/// A machine clock speed in stored (scaled integer) form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClockSpeed(pub i64);

impl ClockSpeed {
    /// 1.000%.
    pub const MIN: ClockSpeed = ClockSpeed(1_000);
    /// 250.000%.
    pub const MAX: ClockSpeed = ClockSpeed(250_000);
    /// 100%.
    pub const NORMAL: ClockSpeed = ClockSpeed(PER_DECIMAL);

    pub fn from_percent(p: f64) -> Self {
        Self(from_percent(p))
    }

    pub fn from_decimal(d: f64) -> Self {
        Self(from_decimal(d))
    }

    pub fn percent(self) -> f64 {
        to_percent(self.0)
    }

    pub fn decimal(self) -> f64 {
        to_decimal(self.0)
    }

    /// Whether the stored value lies in the game's 1%..=250% range.
    pub fn is_valid(self) -> bool {
        (Self::MIN..=Self::MAX).contains(&self)
    }
}

impl Default for ClockSpeed {
    fn default() -> Self {
        Self::NORMAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hundred_percent_is_one_decimal() {
        assert_eq!(from_percent(100.0), 100_000);
        assert_eq!(from_decimal(1.0), 100_000);
        assert_eq!(ClockSpeed::default(), ClockSpeed::from_decimal(1.0));
    }

    #[test]
    fn conversions_floor_extra_digits() {
        assert_eq!(from_percent(50.0009), 50_000);
        assert_eq!(from_decimal(0.123456), 12_345);
        assert_eq!(to_percent(from_percent(12.34567)), 12.345);
    }

    #[test]
    fn quantized_values_survive_round_trip() {
        assert_eq!(to_percent(from_percent(33.333)), 33.333);
        assert_eq!(to_decimal(from_decimal(2.5)), 2.5);
        assert_eq!(to_decimal(from_decimal(0.001)), 0.001);
    }

    #[test]
    fn codec_does_not_clamp() {
        assert_eq!(from_percent(300.0), 300_000);
        assert_eq!(from_percent(0.0), 0);
        assert!(!ClockSpeed::from_percent(300.0).is_valid());
        assert!(!ClockSpeed::from_percent(0.5).is_valid());
    }

    #[test]
    fn valid_range_bounds_are_inclusive() {
        assert!(ClockSpeed::from_percent(1.0).is_valid());
        assert!(ClockSpeed::from_percent(250.0).is_valid());
        assert!(!ClockSpeed(999).is_valid());
        assert!(!ClockSpeed(250_001).is_valid());
    }

    #[test]
    fn percent_and_decimal_views_agree() {
        let clock = ClockSpeed::from_percent(150.0);
        assert_eq!(clock.percent(), 150.0);
        assert_eq!(clock.decimal(), 1.5);
    }

    #[test]
    fn clock_serializes_as_stored_integer() {
        let json = serde_json::to_string(&ClockSpeed::NORMAL).unwrap();
        assert_eq!(json, "100000");
    }
}
