//! Fixed-point oracle price samples.
//!
//! Oracle prices arrive as an integer mantissa plus a base-10 exponent
//! (`value = price * 10^expo`). Comparisons are done entirely in integer
//! arithmetic on a common exponent so that exact equality at the resolution
//! boundary is detectable; floats never enter the comparison path.

use std::cmp::Ordering;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single oracle price observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Integer mantissa.
    pub price: i64,
    /// Base-10 exponent, typically negative (e.g. -8).
    pub expo: i32,
    /// Confidence interval in the same fixed-point representation.
    pub conf: u64,
    /// Unix seconds at which the oracle published this sample.
    pub publish_time: i64,
}

impl PricePoint {
    /// Create a new price point.
    #[must_use]
    pub fn new(price: i64, expo: i32, conf: u64, publish_time: i64) -> Self {
        Self {
            price,
            expo,
            conf,
            publish_time,
        }
    }

    /// True if the sample is older than `max_staleness_seconds` at `now`.
    #[must_use]
    pub fn is_stale(&self, now: i64, max_staleness_seconds: i64) -> bool {
        now.saturating_sub(self.publish_time) > max_staleness_seconds
    }

    /// Age of the sample in seconds at `now` (zero if published in the future).
    #[must_use]
    pub fn age(&self, now: i64) -> i64 {
        now.saturating_sub(self.publish_time).max(0)
    }

    /// Compare the real values of two fixed-point prices exactly.
    ///
    /// Both mantissas are rescaled to the smaller exponent in i128 space.
    /// Returns `None` if rescaling overflows i128, which only happens for
    /// exponent spreads far outside anything a real feed publishes.
    #[must_use]
    pub fn cmp_value(&self, other: &Self) -> Option<Ordering> {
        if self.expo == other.expo {
            return Some(self.price.cmp(&other.price));
        }

        let min_expo = self.expo.min(other.expo);
        let a = scale_to(self.price, self.expo, min_expo)?;
        let b = scale_to(other.price, other.expo, min_expo)?;
        Some(a.cmp(&b))
    }

    /// Render as a decimal for logs and CLI output. Display only; settlement
    /// never consumes this value.
    #[must_use]
    pub fn to_decimal(&self) -> Decimal {
        if self.expo >= 0 {
            let scaled = i128::from(self.price)
                .saturating_mul(10i128.saturating_pow(self.expo.unsigned_abs()));
            Decimal::from_i128_with_scale(clamp_mantissa(scaled), 0)
        } else {
            let scale = self.expo.unsigned_abs().min(28);
            Decimal::from_i128_with_scale(clamp_mantissa(i128::from(self.price)), scale)
        }
    }
}

impl fmt::Display for PricePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

/// Rescale `price * 10^expo` to `target_expo <= expo`, exactly.
fn scale_to(price: i64, expo: i32, target_expo: i32) -> Option<i128> {
    debug_assert!(target_expo <= expo);
    let shift = u32::try_from(expo - target_expo).ok()?;
    let factor = 10i128.checked_pow(shift)?;
    i128::from(price).checked_mul(factor)
}

/// Keep a mantissa inside Decimal's 96-bit range; display only.
fn clamp_mantissa(value: i128) -> i128 {
    const MAX: i128 = 79_228_162_514_264_337_593_543_950_335; // 2^96 - 1
    value.clamp(-MAX, MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_prices_same_expo() {
        let a = PricePoint::new(12_433_864_799, -8, 0, 100);
        let b = PricePoint::new(12_433_864_799, -8, 0, 160);
        assert_eq!(a.cmp_value(&b), Some(Ordering::Equal));
    }

    #[test]
    fn equal_prices_across_expos() {
        // 1.5 expressed two ways: 150 * 10^-2 and 1_500 * 10^-3
        let a = PricePoint::new(150, -2, 0, 0);
        let b = PricePoint::new(1_500, -3, 0, 0);
        assert_eq!(a.cmp_value(&b), Some(Ordering::Equal));
    }

    #[test]
    fn greater_across_expos() {
        let a = PricePoint::new(151, -2, 0, 0);
        let b = PricePoint::new(1_500, -3, 0, 0);
        assert_eq!(a.cmp_value(&b), Some(Ordering::Greater));
        assert_eq!(b.cmp_value(&a), Some(Ordering::Less));
    }

    #[test]
    fn near_boundary_is_not_equal() {
        // One minor unit apart at the finer exponent must not compare equal.
        let a = PricePoint::new(150, -2, 0, 0);
        let b = PricePoint::new(1_501, -3, 0, 0);
        assert_eq!(a.cmp_value(&b), Some(Ordering::Less));
    }

    #[test]
    fn negative_prices_compare() {
        let a = PricePoint::new(-150, -2, 0, 0);
        let b = PricePoint::new(-1_500, -3, 0, 0);
        assert_eq!(a.cmp_value(&b), Some(Ordering::Equal));
    }

    #[test]
    fn absurd_expo_spread_overflows_to_none() {
        let a = PricePoint::new(i64::MAX, 30, 0, 0);
        let b = PricePoint::new(1, -30, 0, 0);
        assert_eq!(a.cmp_value(&b), None);
    }

    #[test]
    fn staleness() {
        let p = PricePoint::new(1, -8, 0, 1_000);
        assert!(!p.is_stale(1_060, 60));
        assert!(p.is_stale(1_061, 60));
    }

    #[test]
    fn age_clamps_future_publishes() {
        let p = PricePoint::new(1, -8, 0, 2_000);
        assert_eq!(p.age(1_000), 0);
        assert_eq!(p.age(2_030), 30);
    }

    #[test]
    fn decimal_rendering() {
        use rust_decimal_macros::dec;

        let p = PricePoint::new(12_433_864_799, -8, 0, 0);
        assert_eq!(p.to_decimal(), dec!(124.33864799));
        assert_eq!(p.to_string(), "124.33864799");
    }
}
