//! Conversion between edit-rate integer time and rational time.
//!
//! Pure functions only. All conversions are exact for integer frame
//! boundaries; the single lossy escape hatch is the fallback-rate policy,
//! and callers record a diagnostic when they take it.

use conform_timeline_model::time::{Fraction, RationalTime, TimeError};

/// An integer frame count at an edit rate, as a rational time.
pub fn frames_to_time(frames: i64, rate: Fraction) -> RationalTime {
    RationalTime::new(frames, rate)
}

/// Exact frame count of `time` at `rate`; fails when the value does not
/// land on an integer frame boundary.
pub fn time_to_frames(time: RationalTime, rate: Fraction) -> Result<i64, TimeError> {
    Ok(time.rescaled_to(rate)?.value)
}

/// Frame count at `rate`, rounding toward negative infinity on
/// misalignment. Callers pair this with a rate-precision diagnostic.
pub fn time_to_frames_floor(time: RationalTime, rate: Fraction) -> i64 {
    time.rescaled_to_floor(rate).value
}

/// The least common multiple of two edit rates: the smallest rate at which
/// integer frame boundaries of both stay integers.
///
/// `None` when either rate is non-positive or the LCM overflows; callers
/// then fall back to the host timeline's global rate.
pub fn common_rate(a: Fraction, b: Fraction) -> Option<Fraction> {
    if !a.is_positive() || !b.is_positive() {
        return None;
    }
    if a == b {
        return Some(a);
    }
    // lcm(n1/d1, n2/d2) = lcm(n1, n2) / gcd(d1, d2)
    let num = lcm(a.num(), b.num())?;
    let den = gcd(a.den(), b.den());
    Fraction::new(num, den).ok()
}

/// Cumulative start offset of each element in a run of lengths, in the
/// shared edit rate.
pub fn cumulative_starts(lengths: &[i64]) -> Vec<i64> {
    let mut starts = Vec::with_capacity(lengths.len());
    let mut cursor = 0i64;
    for length in lengths {
        starts.push(cursor);
        cursor += length;
    }
    starts
}

fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

fn lcm(a: i64, b: i64) -> Option<i64> {
    let g = gcd(a, b);
    if g == 0 {
        return None;
    }
    (a / g).checked_mul(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fr(num: i64, den: i64) -> Fraction {
        Fraction::new(num, den).unwrap()
    }

    #[test]
    fn test_frames_roundtrip() {
        let rate = fr(24, 1);
        let t = frames_to_time(48, rate);
        assert_eq!(t.to_seconds(), 2.0);
        assert_eq!(time_to_frames(t, rate).unwrap(), 48);
    }

    #[test]
    fn test_exact_conversion_across_rates() {
        let t = frames_to_time(24, fr(24, 1));
        assert_eq!(time_to_frames(t, fr(48, 1)).unwrap(), 48);
        assert!(time_to_frames(frames_to_time(1, fr(24, 1)), fr(25, 1)).is_err());
        assert_eq!(time_to_frames_floor(frames_to_time(1, fr(24, 1)), fr(25, 1)), 1);
    }

    #[test]
    fn test_common_rate_integer() {
        assert_eq!(common_rate(fr(24, 1), fr(30, 1)), Some(fr(120, 1)));
        assert_eq!(common_rate(fr(25, 1), fr(25, 1)), Some(fr(25, 1)));
    }

    #[test]
    fn test_common_rate_ntsc() {
        // 24000/1001 and 30000/1001 share frame boundaries at 120000/1001.
        let rate = common_rate(fr(24000, 1001), fr(30000, 1001)).unwrap();
        assert_eq!(rate, fr(120000, 1001));

        // Integer and NTSC rates reconcile at lcm(24, 30000) = 30000.
        let mixed = common_rate(fr(24, 1), fr(30000, 1001)).unwrap();
        assert_eq!(mixed, fr(30000, 1));
    }

    #[test]
    fn test_common_rate_rejects_degenerate() {
        assert_eq!(common_rate(Fraction::ZERO, fr(24, 1)), None);
        assert_eq!(common_rate(fr(-24, 1), fr(24, 1)), None);
    }

    #[test]
    fn test_cumulative_starts() {
        assert_eq!(cumulative_starts(&[24, 12, 48]), vec![0, 24, 36]);
        assert!(cumulative_starts(&[]).is_empty());
    }
}
