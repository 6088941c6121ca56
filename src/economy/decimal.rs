//! Big-number currency type
//!
//! Stores `mantissa × 10^exponent` with the mantissa normalised to [1, 10)
//! (or exactly 0) and an `i64` exponent, so incremental totals keep growing
//! long after `f64` would overflow.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Sub, SubAssign};
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Exponent gap beyond which the smaller addend vanishes
const MAX_SIGNIFICANT_GAP: i64 = 17;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("not a finite decimal: {0:?}")]
pub struct ParseDecimalError(String);

#[derive(Clone, Copy, PartialEq)]
pub struct Decimal {
    mantissa: f64,
    exponent: i64,
}

impl Decimal {
    pub const ZERO: Decimal = Decimal {
        mantissa: 0.0,
        exponent: 0,
    };
    pub const ONE: Decimal = Decimal {
        mantissa: 1.0,
        exponent: 0,
    };

    /// Build and normalise; non-finite mantissas collapse to zero
    pub fn new(mantissa: f64, exponent: i64) -> Self {
        if !mantissa.is_finite() || mantissa == 0.0 {
            return Self::ZERO;
        }
        let shift = mantissa.abs().log10().floor() as i64;
        let mut m = scale(mantissa, -shift);
        let mut e = exponent.saturating_add(shift);
        // log10 rounding can land one decade off
        if m.abs() >= 10.0 {
            m /= 10.0;
            e = e.saturating_add(1);
        } else if m.abs() < 1.0 {
            m *= 10.0;
            e = e.saturating_sub(1);
        }
        Self {
            mantissa: m,
            exponent: e,
        }
    }

    pub fn from_f64(value: f64) -> Self {
        Self::new(value, 0)
    }

    pub fn mantissa(&self) -> f64 {
        self.mantissa
    }

    pub fn exponent(&self) -> i64 {
        self.exponent
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa == 0.0
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa < 0.0
    }

    /// Nearest `f64`, saturating to ±infinity
    pub fn to_f64(&self) -> f64 {
        if self.is_zero() {
            return 0.0;
        }
        if self.exponent > 308 {
            return f64::INFINITY.copysign(self.mantissa);
        }
        if self.exponent < -324 {
            return 0.0;
        }
        scale(self.mantissa, self.exponent)
    }

    /// log10 of the absolute value (`-inf` for zero)
    pub fn log10(&self) -> f64 {
        if self.is_zero() {
            return f64::NEG_INFINITY;
        }
        self.exponent as f64 + self.mantissa.abs().log10()
    }

    pub fn abs(&self) -> Self {
        Self {
            mantissa: self.mantissa.abs(),
            exponent: self.exponent,
        }
    }

    /// Raise to a real power; negative bases keep their sign only for odd integers
    pub fn pow(&self, power: f64) -> Self {
        if !power.is_finite() {
            return Self::ZERO;
        }
        if power == 0.0 {
            return Self::ONE;
        }
        if self.is_zero() {
            return Self::ZERO;
        }
        let log = self.log10() * power;
        if !log.is_finite() {
            return Self::ZERO;
        }
        let log = log.clamp(i64::MIN as f64 / 2.0, i64::MAX as f64 / 2.0);
        let e = log.floor();
        let magnitude = Self::new(10f64.powf(log - e), e as i64);
        let odd = power.fract() == 0.0 && (power as i64) % 2 != 0;
        if self.is_negative() && odd {
            -magnitude
        } else {
            magnitude
        }
    }

    pub fn floor(&self) -> Self {
        if self.exponent >= MAX_SIGNIFICANT_GAP {
            return *self;
        }
        Self::from_f64(self.to_f64().floor())
    }

    pub fn ceil(&self) -> Self {
        if self.exponent >= MAX_SIGNIFICANT_GAP {
            return *self;
        }
        Self::from_f64(self.to_f64().ceil())
    }

    pub fn max(self, other: Self) -> Self {
        if self >= other { self } else { other }
    }

    pub fn min(self, other: Self) -> Self {
        if self <= other { self } else { other }
    }

    /// Compact display string: plain below a million, scientific above
    pub fn format_short(&self) -> String {
        if self.exponent < 6 {
            let v = self.to_f64();
            if (v - v.round()).abs() < 1e-9 {
                format!("{:.0}", v.round())
            } else {
                format!("{v:.2}")
            }
        } else {
            format!("{:.2}e{}", self.mantissa, self.exponent)
        }
    }
}

#[inline]
fn pow10(exp: i64) -> f64 {
    10f64.powi(exp.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
}

/// `value × 10^exp`, dividing for negative exponents (10^-n is inexact)
#[inline]
fn scale(value: f64, exp: i64) -> f64 {
    if exp >= 0 {
        value * pow10(exp)
    } else {
        value / pow10(exp.saturating_neg())
    }
}

impl Default for Decimal {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<f64> for Decimal {
    fn from(value: f64) -> Self {
        Self::from_f64(value)
    }
}

impl From<u64> for Decimal {
    fn from(value: u64) -> Self {
        Self::from_f64(value as f64)
    }
}

impl std::ops::Neg for Decimal {
    type Output = Decimal;
    fn neg(self) -> Self {
        Self {
            mantissa: -self.mantissa,
            exponent: self.exponent,
        }
    }
}

impl Add for Decimal {
    type Output = Decimal;
    fn add(self, rhs: Self) -> Self {
        if self.is_zero() {
            return rhs;
        }
        if rhs.is_zero() {
            return self;
        }
        let (big, small) = if self.exponent >= rhs.exponent {
            (self, rhs)
        } else {
            (rhs, self)
        };
        let gap = big.exponent.saturating_sub(small.exponent);
        if gap > MAX_SIGNIFICANT_GAP {
            return big;
        }
        Self::new(big.mantissa + scale(small.mantissa, -gap), big.exponent)
    }
}

impl Sub for Decimal {
    type Output = Decimal;
    fn sub(self, rhs: Self) -> Self {
        self + (-rhs)
    }
}

impl Mul for Decimal {
    type Output = Decimal;
    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.mantissa * rhs.mantissa,
            self.exponent.saturating_add(rhs.exponent),
        )
    }
}

impl Mul<f64> for Decimal {
    type Output = Decimal;
    fn mul(self, rhs: f64) -> Self {
        self * Decimal::from_f64(rhs)
    }
}

impl Div for Decimal {
    type Output = Decimal;
    fn div(self, rhs: Self) -> Self {
        if rhs.is_zero() {
            return Self::ZERO;
        }
        Self::new(
            self.mantissa / rhs.mantissa,
            self.exponent.saturating_sub(rhs.exponent),
        )
    }
}

impl AddAssign for Decimal {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Decimal {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl MulAssign for Decimal {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for Decimal {}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let sign = |d: &Decimal| {
            if d.mantissa > 0.0 {
                1
            } else if d.mantissa < 0.0 {
                -1
            } else {
                0
            }
        };
        let (sa, sb) = (sign(self), sign(other));
        if sa != sb || sa == 0 {
            return sa.cmp(&sb);
        }
        let magnitude = self
            .exponent
            .cmp(&other.exponent)
            .then(self.mantissa.abs().total_cmp(&other.mantissa.abs()));
        if sa > 0 { magnitude } else { magnitude.reverse() }
    }
}

impl fmt::Debug for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decimal({self})")
    }
}

/// Round-trip form: `0` or `{mantissa}e{exponent}`
impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            f.write_str("0")
        } else {
            write!(f, "{}e{}", self.mantissa, self.exponent)
        }
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    /// Accepts any float literal, including exponents past the `f64` range
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseDecimalError(s.to_string());
        let t = s.trim();
        if t.is_empty() {
            return Err(err());
        }
        let (mant_str, exp_str) = match t.find(['e', 'E']) {
            Some(i) => (&t[..i], Some(&t[i + 1..])),
            None => (t, None),
        };
        let mantissa: f64 = mant_str.parse().map_err(|_| err())?;
        if !mantissa.is_finite() {
            return Err(err());
        }
        let exponent: i64 = match exp_str {
            Some(e) => e.trim_start_matches('+').parse().map_err(|_| err())?,
            None => 0,
        };
        Ok(Self::new(mantissa, exponent))
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

struct DecimalVisitor;

impl Visitor<'_> for DecimalVisitor {
    type Value = Decimal;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal string or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Decimal, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Decimal, E> {
        Ok(Decimal::from_f64(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Decimal, E> {
        Ok(Decimal::from_f64(v as f64))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Decimal, E> {
        Ok(Decimal::from_f64(v as f64))
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DecimalVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_normalises() {
        let x = Decimal::from_f64(1500.0);
        assert_eq!(x.mantissa(), 1.5);
        assert_eq!(x.exponent(), 3);
        assert_eq!(Decimal::from_f64(0.05).exponent(), -2);
        assert!(Decimal::from_f64(f64::NAN).is_zero());
    }

    #[test]
    fn test_arithmetic() {
        let close = |a: Decimal, b: f64| (a.to_f64() - b).abs() < 1e-9;
        assert!(close(d("100") + d("23"), 123.0));
        assert!(close(d("100") - d("23"), 77.0));
        assert!(close(d("12") * d("3"), 36.0));
        assert!(close(d("12") / d("3"), 4.0));
        assert!((d("5") - d("5")).is_zero());
        assert!((d("1e400") + d("1")).exponent() == 400);
        assert_eq!(d("1e400") * d("1e400"), d("1e800"));
    }

    #[test]
    fn test_pow_and_log() {
        assert!((d("2").pow(10.0).to_f64() - 1024.0).abs() < 1e-9);
        assert!((d("1e300").pow(3.0).log10() - 900.0).abs() < 1e-9);
        assert!((d("1e1000").log10() - 1000.0).abs() < 1e-12);
        assert_eq!(d("5").pow(0.0), Decimal::ONE);
    }

    #[test]
    fn test_ordering() {
        assert!(d("1e400") > d("9.99e399"));
        assert!(d("-5") < d("2"));
        assert!(d("-1e10") < d("-1e9"));
        assert!(Decimal::ZERO < d("1e-300"));
        assert_eq!(d("3").max(d("7")), d("7"));
    }

    #[test]
    fn test_string_roundtrip() {
        for s in ["0", "1", "123.456", "1.5e400", "-2e-50", "98765432101234"] {
            let a = d(s);
            let b = d(&a.to_string());
            assert_eq!(a, b, "{s}");
        }
        assert_eq!(d("1500").to_string(), "1.5e3");
    }

    #[test]
    fn test_rejects_non_finite() {
        assert!("NaN".parse::<Decimal>().is_err());
        assert!("Infinity".parse::<Decimal>().is_err());
        assert!("inf".parse::<Decimal>().is_err());
        assert!("".parse::<Decimal>().is_err());
        assert!("abc".parse::<Decimal>().is_err());
    }

    #[test]
    fn test_serde_accepts_strings_and_numbers() {
        let a: Decimal = serde_json::from_str("\"2.5e3\"").unwrap();
        let b: Decimal = serde_json::from_str("2500").unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"2.5e3\"");
    }

    #[test]
    fn test_floor_ceil() {
        assert_eq!(d("7.9").floor().to_f64(), 7.0);
        assert_eq!(d("7.1").ceil().to_f64(), 8.0);
        assert_eq!(d("1e50").floor(), d("1e50"));
    }

    #[test]
    fn test_format_short() {
        assert_eq!(d("1234").format_short(), "1234");
        assert_eq!(d("2.5e12").format_short(), "2.50e12");
    }
}
