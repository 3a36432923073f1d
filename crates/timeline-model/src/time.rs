//! Exact rational time arithmetic.
//!
//! All timing in the model is expressed as integer counts at a rational
//! rate. Arithmetic uses 128-bit intermediates and keeps fractions in
//! reduced canonical form, so integer frame boundaries survive every
//! conversion without floating-point rounding. Lossy conversion to `f64`
//! exists only for display.

use serde::{Deserialize, Serialize};

/// Errors from time construction and conversion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    #[error("fraction denominator must be non-zero")]
    ZeroDenominator,

    #[error("rate must be positive, got {num}/{den}")]
    NonPositiveRate { num: i64, den: i64 },

    #[error("cannot convert {value} at rate {from} to rate {to} without loss")]
    LossyRescale {
        value: i64,
        from: Fraction,
        to: Fraction,
    },
}

/// An exact rational number in reduced canonical form.
///
/// The denominator is always positive and the pair is always reduced, so
/// derived equality and hashing are structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "(i64, i64)", into = "(i64, i64)")]
pub struct Fraction {
    num: i64,
    den: i64,
}

impl Fraction {
    pub const ZERO: Fraction = Fraction { num: 0, den: 1 };
    pub const ONE: Fraction = Fraction { num: 1, den: 1 };

    /// Construct a reduced fraction. Fails on a zero denominator.
    pub fn new(num: i64, den: i64) -> Result<Self, TimeError> {
        if den == 0 {
            return Err(TimeError::ZeroDenominator);
        }
        Ok(Self::reduce(num as i128, den as i128))
    }

    pub const fn from_int(value: i64) -> Self {
        Self { num: value, den: 1 }
    }

    pub fn num(&self) -> i64 {
        self.num
    }

    pub fn den(&self) -> i64 {
        self.den
    }

    pub fn is_zero(&self) -> bool {
        self.num == 0
    }

    pub fn is_positive(&self) -> bool {
        self.num > 0
    }

    /// True when this fraction is a whole number.
    pub fn is_integral(&self) -> bool {
        self.den == 1
    }

    pub fn to_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Reduce a 128-bit ratio into canonical i64 form.
    ///
    /// Reduced editorial quantities always fit i64; the conversion is
    /// checked so a pathological input fails loudly instead of wrapping.
    fn reduce(num: i128, den: i128) -> Self {
        debug_assert!(den != 0);
        let sign = if den < 0 { -1 } else { 1 };
        let g = gcd(num.unsigned_abs(), den.unsigned_abs());
        let g = if g == 0 { 1 } else { g as i128 };
        let num = sign * num / g;
        let den = (den / g).abs();
        Self {
            num: i64::try_from(num).expect("reduced fraction exceeds i64"),
            den: i64::try_from(den).expect("reduced fraction exceeds i64"),
        }
    }

    pub fn checked_add(&self, other: Fraction) -> Option<Fraction> {
        let lhs = (self.num as i128).checked_mul(other.den as i128)?;
        let rhs = (other.num as i128).checked_mul(self.den as i128)?;
        let num = lhs.checked_add(rhs)?;
        let den = (self.den as i128).checked_mul(other.den as i128)?;
        Some(Self::reduce(num, den))
    }

    pub fn checked_sub(&self, other: Fraction) -> Option<Fraction> {
        self.checked_add(Fraction {
            num: -other.num,
            den: other.den,
        })
    }

    pub fn checked_mul(&self, other: Fraction) -> Option<Fraction> {
        let num = (self.num as i128).checked_mul(other.num as i128)?;
        let den = (self.den as i128).checked_mul(other.den as i128)?;
        Some(Self::reduce(num, den))
    }

    /// Division; `None` when `other` is zero or on overflow.
    pub fn checked_div(&self, other: Fraction) -> Option<Fraction> {
        if other.num == 0 {
            return None;
        }
        let num = (self.num as i128).checked_mul(other.den as i128)?;
        let den = (self.den as i128).checked_mul(other.num as i128)?;
        Some(Self::reduce(num, den))
    }

    pub fn recip(&self) -> Option<Fraction> {
        Fraction::ONE.checked_div(*self)
    }
}

impl std::ops::Add for Fraction {
    type Output = Fraction;
    fn add(self, rhs: Fraction) -> Fraction {
        self.checked_add(rhs).expect("fraction addition overflow")
    }
}

impl std::ops::Sub for Fraction {
    type Output = Fraction;
    fn sub(self, rhs: Fraction) -> Fraction {
        self.checked_sub(rhs)
            .expect("fraction subtraction overflow")
    }
}

impl std::ops::Mul for Fraction {
    type Output = Fraction;
    fn mul(self, rhs: Fraction) -> Fraction {
        self.checked_mul(rhs)
            .expect("fraction multiplication overflow")
    }
}

impl PartialOrd for Fraction {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fraction {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let lhs = self.num as i128 * other.den as i128;
        let rhs = other.num as i128 * self.den as i128;
        lhs.cmp(&rhs)
    }
}

impl TryFrom<(i64, i64)> for Fraction {
    type Error = TimeError;

    fn try_from(pair: (i64, i64)) -> Result<Self, Self::Error> {
        Fraction::new(pair.0, pair.1)
    }
}

impl From<Fraction> for (i64, i64) {
    fn from(f: Fraction) -> (i64, i64) {
        (f.num, f.den)
    }
}

impl std::fmt::Display for Fraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

/// An integer count of units at a rational rate (units per second).
///
/// `value = 48` at `rate = 24` is two seconds. Instances at different
/// rates compare by their exact position in seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RationalTime {
    pub value: i64,
    pub rate: Fraction,
}

impl RationalTime {
    pub fn new(value: i64, rate: Fraction) -> Self {
        Self { value, rate }
    }

    pub fn zero(rate: Fraction) -> Self {
        Self { value: 0, rate }
    }

    /// Exact position in seconds.
    pub fn seconds(&self) -> Fraction {
        Fraction::reduce(
            self.value as i128 * self.rate.den as i128,
            self.rate.num as i128,
        )
    }

    /// Lossy conversion for display only.
    pub fn to_seconds(&self) -> f64 {
        self.seconds().to_f64()
    }

    /// Exact rescale to another rate; fails when the value does not land
    /// on an integer boundary at the target rate.
    pub fn rescaled_to(&self, rate: Fraction) -> Result<RationalTime, TimeError> {
        if rate == self.rate {
            return Ok(*self);
        }
        let num = self.value as i128 * self.rate.den as i128 * rate.num as i128;
        let den = self.rate.num as i128 * rate.den as i128;
        if num % den != 0 {
            return Err(TimeError::LossyRescale {
                value: self.value,
                from: self.rate,
                to: rate,
            });
        }
        let value = i64::try_from(num / den).expect("rescaled value exceeds i64");
        Ok(RationalTime { value, rate })
    }

    /// Rescale, rounding toward negative infinity when the boundary does
    /// not align. Callers are expected to record a diagnostic on loss.
    pub fn rescaled_to_floor(&self, rate: Fraction) -> RationalTime {
        match self.rescaled_to(rate) {
            Ok(t) => t,
            Err(_) => {
                let num = self.value as i128 * self.rate.den as i128 * rate.num as i128;
                let den = self.rate.num as i128 * rate.den as i128;
                let value = i64::try_from(num.div_euclid(den)).expect("rescaled value exceeds i64");
                RationalTime { value, rate }
            }
        }
    }

    /// Addition; rescales `other` exactly onto this rate first.
    pub fn checked_add(&self, other: RationalTime) -> Result<RationalTime, TimeError> {
        let other = other.rescaled_to(self.rate)?;
        Ok(RationalTime {
            value: self.value + other.value,
            rate: self.rate,
        })
    }

    pub fn checked_sub(&self, other: RationalTime) -> Result<RationalTime, TimeError> {
        let other = other.rescaled_to(self.rate)?;
        Ok(RationalTime {
            value: self.value - other.value,
            rate: self.rate,
        })
    }
}

impl PartialEq for RationalTime {
    fn eq(&self, other: &Self) -> bool {
        self.seconds() == other.seconds()
    }
}

impl Eq for RationalTime {}

impl PartialOrd for RationalTime {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RationalTime {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.seconds().cmp(&other.seconds())
    }
}

/// A half-open range: `[start, start + duration)`, both at the same rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: RationalTime,
    pub duration: RationalTime,
}

impl TimeRange {
    pub fn new(start: RationalTime, duration: RationalTime) -> Self {
        Self { start, duration }
    }

    /// Range starting at zero.
    pub fn from_duration(duration: RationalTime) -> Self {
        Self {
            start: RationalTime::zero(duration.rate),
            duration,
        }
    }

    pub fn from_frames(start: i64, duration: i64, rate: Fraction) -> Self {
        Self {
            start: RationalTime::new(start, rate),
            duration: RationalTime::new(duration, rate),
        }
    }

    pub fn end_exclusive(&self) -> RationalTime {
        RationalTime {
            value: self.start.value + self.duration.rescaled_to_floor(self.start.rate).value,
            rate: self.start.rate,
        }
    }

    pub fn contains(&self, time: RationalTime) -> bool {
        time >= self.start && time < self.end_exclusive()
    }

    /// Interval intersection at this range's rate. `None` when disjoint.
    pub fn intersect(&self, other: &TimeRange) -> Option<TimeRange> {
        let rate = self.start.rate;
        let other_start = other.start.rescaled_to_floor(rate);
        let other_end = other.end_exclusive().rescaled_to_floor(rate);
        let start = self.start.max(other_start);
        let end = self.end_exclusive().min(other_end);
        if end <= start {
            return None;
        }
        Some(TimeRange {
            start,
            duration: RationalTime::new(end.value - start.value, rate),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fr(num: i64, den: i64) -> Fraction {
        Fraction::new(num, den).unwrap()
    }

    #[test]
    fn test_fraction_reduces_to_canonical_form() {
        assert_eq!(fr(48, 2), fr(24, 1));
        assert_eq!(fr(-10, -4), fr(5, 2));
        assert_eq!(fr(3, -6), fr(-1, 2));
        assert_eq!(fr(0, 7), Fraction::ZERO);
    }

    #[test]
    fn test_fraction_zero_denominator_rejected() {
        assert_eq!(Fraction::new(1, 0), Err(TimeError::ZeroDenominator));
    }

    #[test]
    fn test_fraction_arithmetic_is_exact() {
        let ntsc = fr(30000, 1001);
        let double = ntsc * fr(2, 1);
        assert_eq!(double, fr(60000, 1001));
        assert_eq!(double.checked_div(ntsc).unwrap(), fr(2, 1));
        assert_eq!(fr(1, 3) + fr(1, 6), fr(1, 2));
    }

    #[test]
    fn test_fraction_ordering() {
        assert!(fr(30000, 1001) < fr(30, 1));
        assert!(fr(24, 1) < fr(25, 1));
        assert!(fr(-1, 2) < Fraction::ZERO);
    }

    #[test]
    fn test_fraction_serde_roundtrip() {
        let f = fr(24000, 1001);
        let json = serde_json::to_string(&f).unwrap();
        let parsed: Fraction = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, f);
    }

    #[test]
    fn test_fraction_serde_normalizes() {
        let parsed: Fraction = serde_json::from_str("[48,2]").unwrap();
        assert_eq!(parsed, fr(24, 1));
    }

    #[test]
    fn test_rational_time_seconds() {
        let t = RationalTime::new(48, fr(24, 1));
        assert_eq!(t.seconds(), fr(2, 1));

        let ntsc = RationalTime::new(30000, fr(30000, 1001));
        assert_eq!(ntsc.seconds(), fr(1001, 1));
    }

    #[test]
    fn test_rescale_exact_and_lossy() {
        let t = RationalTime::new(24, fr(24, 1));
        let at48 = t.rescaled_to(fr(48, 1)).unwrap();
        assert_eq!(at48.value, 48);

        // One frame at 24 does not land on a 25 boundary.
        let frame = RationalTime::new(1, fr(24, 1));
        assert!(frame.rescaled_to(fr(25, 1)).is_err());
        assert_eq!(frame.rescaled_to_floor(fr(25, 1)).value, 1);
    }

    #[test]
    fn test_cross_rate_equality() {
        let a = RationalTime::new(24, fr(24, 1));
        let b = RationalTime::new(48, fr(48, 1));
        assert_eq!(a, b);
    }

    #[test]
    fn test_range_intersection() {
        let rate = fr(24, 1);
        let a = TimeRange::from_frames(0, 100, rate);
        let b = TimeRange::from_frames(50, 100, rate);
        let i = a.intersect(&b).unwrap();
        assert_eq!(i.start.value, 50);
        assert_eq!(i.duration.value, 50);

        let c = TimeRange::from_frames(200, 10, rate);
        assert!(a.intersect(&c).is_none());
    }

    #[test]
    fn test_range_contains() {
        let r = TimeRange::from_frames(10, 5, fr(24, 1));
        assert!(!r.contains(RationalTime::new(9, fr(24, 1))));
        assert!(r.contains(RationalTime::new(10, fr(24, 1))));
        assert!(r.contains(RationalTime::new(14, fr(24, 1))));
        assert!(!r.contains(RationalTime::new(15, fr(24, 1))));
    }
}
