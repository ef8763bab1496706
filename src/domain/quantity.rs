//! Exact Kubernetes resource quantities
//!
//! Values are held as a signed count of nano-units so that summing CPU
//! millicores or memory bytes across many pods never loses precision.
//! The suffix family a quantity was written in is remembered so it can be
//! printed back the way Kubernetes prints it (`12Gi`, `2`, `500m`).

use crate::error::{Error, Result};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity as K8sQuantity;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

/// Nano-units per whole unit
const NANO: i128 = 1_000_000_000;

const BYTES_PER_GIB: f64 = (1u64 << 30) as f64;

/// Decimal suffixes keyed by power-of-ten exponent, largest first
const DECIMAL_SUFFIXES: [(i32, &str); 10] = [
    (18, "E"),
    (15, "P"),
    (12, "T"),
    (9, "G"),
    (6, "M"),
    (3, "k"),
    (0, ""),
    (-3, "m"),
    (-6, "u"),
    (-9, "n"),
];

/// Binary suffixes keyed by power-of-1024 exponent, largest first
const BINARY_SUFFIXES: [(u32, &str); 7] = [
    (6, "Ei"),
    (5, "Pi"),
    (4, "Ti"),
    (3, "Gi"),
    (2, "Mi"),
    (1, "Ki"),
    (0, ""),
];

/// Suffix family of a quantity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuantityFormat {
    /// `k`, `M`, `m`, ... (powers of 1000)
    #[default]
    DecimalSI,
    /// `Ki`, `Mi`, `Gi`, ... (powers of 1024)
    BinarySI,
    /// `1e3` style scientific notation
    DecimalExponent,
}

/// An exact, signed resource quantity.
///
/// Equality, ordering and hashing compare the numeric value only, so
/// `1Gi` equals `1073741824`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quantity {
    nanos: i128,
    format: QuantityFormat,
}

impl Quantity {
    /// The zero quantity
    pub const fn zero() -> Self {
        Self {
            nanos: 0,
            format: QuantityFormat::DecimalSI,
        }
    }

    /// Build a quantity from whole units
    pub fn from_units(units: i64, format: QuantityFormat) -> Self {
        Self {
            nanos: units as i128 * NANO,
            format,
        }
    }

    /// Build a quantity from thousandths of a unit (millicores for CPU)
    pub fn from_millis(millis: i64) -> Self {
        Self {
            nanos: millis as i128 * 1_000_000,
            format: QuantityFormat::DecimalSI,
        }
    }

    /// Parse a Kubernetes quantity string such as `250m`, `14Gi` or `1e3`
    pub fn parse(input: &str) -> Result<Self> {
        let s = input.trim();
        if s.is_empty() {
            return Err(Error::QuantityParse("empty quantity string".into()));
        }

        let (negative, unsigned) = match s.as_bytes()[0] {
            b'-' => (true, &s[1..]),
            b'+' => (false, &s[1..]),
            _ => (false, s),
        };

        let num_end = unsigned
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(unsigned.len());
        let (number, suffix) = unsigned.split_at(num_end);

        let (whole, fraction) = match number.split_once('.') {
            Some((w, f)) => (w, f),
            None => (number, ""),
        };
        if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
            return Err(Error::QuantityParse(format!("invalid number in {:?}", input)));
        }

        let mut mantissa: i128 = 0;
        for digit in whole.bytes().chain(fraction.bytes()) {
            mantissa = mantissa
                .checked_mul(10)
                .and_then(|m| m.checked_add((digit - b'0') as i128))
                .ok_or_else(|| Error::QuantityParse(format!("{:?} is too large", input)))?;
        }
        let scale = fraction.len() as i32;

        let (format, magnitude) = match parse_suffix(suffix) {
            Some(Suffix::Decimal(exp, format)) => (format, scale_pow10(mantissa, 9 + exp - scale)),
            Some(Suffix::Binary(power)) => {
                let multiplier = 1024i128.pow(power);
                let scaled = mantissa.checked_mul(multiplier);
                (
                    QuantityFormat::BinarySI,
                    scaled.and_then(|m| scale_pow10(m, 9 - scale)),
                )
            }
            None => {
                return Err(Error::QuantityParse(format!(
                    "unknown suffix {:?} in {:?}",
                    suffix, input
                )))
            }
        };

        let magnitude =
            magnitude.ok_or_else(|| Error::QuantityParse(format!("{:?} is too large", input)))?;

        Ok(Self {
            nanos: if negative { -magnitude } else { magnitude },
            format,
        })
    }

    /// Suffix family this quantity prints with
    pub fn format(&self) -> QuantityFormat {
        self.format
    }

    pub fn is_zero(&self) -> bool {
        self.nanos == 0
    }

    pub fn is_negative(&self) -> bool {
        self.nanos < 0
    }

    /// Value in thousandths of a unit, rounded up
    pub fn as_millis(&self) -> i128 {
        ceil_div(self.nanos, 1_000_000)
    }

    /// Value in whole units, if it is integral and fits an `i64`
    pub fn as_i64(&self) -> Option<i64> {
        if self.nanos % NANO != 0 {
            return None;
        }
        i64::try_from(self.nanos / NANO).ok()
    }

    /// Render a byte quantity as fractional GiB (`14.00Gi`).
    ///
    /// Quantities that are not whole bytes or overflow `i64` fall back to
    /// their canonical form.
    pub fn as_gib_string(&self) -> String {
        match self.as_i64() {
            Some(bytes) => format!("{:.2}Gi", bytes as f64 / BYTES_PER_GIB),
            None => self.to_string(),
        }
    }

    /// Format of the result of combining `self` with `other`
    fn combined_format(&self, other: &Quantity) -> QuantityFormat {
        if self.is_zero() {
            other.format
        } else {
            self.format
        }
    }
}

enum Suffix {
    Decimal(i32, QuantityFormat),
    Binary(u32),
}

fn parse_suffix(suffix: &str) -> Option<Suffix> {
    if let Some(&(exp, _)) = DECIMAL_SUFFIXES.iter().find(|(_, s)| *s == suffix) {
        return Some(Suffix::Decimal(exp, QuantityFormat::DecimalSI));
    }
    if let Some(&(power, _)) = BINARY_SUFFIXES
        .iter()
        .find(|(p, s)| *p > 0 && *s == suffix)
    {
        return Some(Suffix::Binary(power));
    }
    let exponent = suffix
        .strip_prefix('e')
        .or_else(|| suffix.strip_prefix('E'))?;
    exponent
        .parse::<i32>()
        .ok()
        .filter(|e| e.abs() <= 38)
        .map(|e| Suffix::Decimal(e, QuantityFormat::DecimalExponent))
}

/// Multiply a non-negative value by `10^exp`, rounding up when `exp` is
/// negative. `None` on overflow.
fn scale_pow10(value: i128, exp: i32) -> Option<i128> {
    if exp >= 0 {
        10i128.checked_pow(exp as u32).and_then(|p| value.checked_mul(p))
    } else {
        match 10i128.checked_pow(exp.unsigned_abs()) {
            Some(divisor) => Some(ceil_div(value, divisor)),
            None => Some(if value == 0 { 0 } else { 1 }),
        }
    }
}

/// Division rounding away from zero
fn ceil_div(value: i128, divisor: i128) -> i128 {
    let quotient = value / divisor;
    if value % divisor == 0 {
        quotient
    } else if value > 0 {
        quotient + 1
    } else {
        quotient - 1
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.nanos == 0 {
            return write!(f, "0");
        }

        if self.format == QuantityFormat::BinarySI && self.nanos % NANO == 0 {
            let units = self.nanos / NANO;
            if units.abs() >= 1024 {
                for (power, suffix) in BINARY_SUFFIXES {
                    let divisor = 1024i128.pow(power);
                    if units % divisor == 0 {
                        return write!(f, "{}{}", units / divisor, suffix);
                    }
                }
            }
        }

        for (exp, suffix) in DECIMAL_SUFFIXES {
            let divisor = 10i128.pow((exp + 9) as u32);
            if self.nanos % divisor == 0 {
                let mantissa = self.nanos / divisor;
                return match (self.format, exp) {
                    (QuantityFormat::DecimalExponent, 0) => write!(f, "{}", mantissa),
                    (QuantityFormat::DecimalExponent, _) => write!(f, "{}e{}", mantissa, exp),
                    _ => write!(f, "{}{}", mantissa, suffix),
                };
            }
        }

        // Unreachable: every value is a whole number of nano-units
        write!(f, "{}n", self.nanos)
    }
}

impl FromStr for Quantity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&K8sQuantity> for Quantity {
    type Error = Error;

    fn try_from(q: &K8sQuantity) -> Result<Self> {
        Self::parse(&q.0)
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.nanos == other.nanos
    }
}

impl Eq for Quantity {}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quantity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.nanos.cmp(&other.nanos)
    }
}

impl Hash for Quantity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.nanos.hash(state);
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        Quantity {
            nanos: self.nanos.saturating_add(rhs.nanos),
            format: self.combined_format(&rhs),
        }
    }
}

impl AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Quantity) {
        *self = *self + rhs;
    }
}

impl Sub for Quantity {
    type Output = Quantity;

    fn sub(self, rhs: Quantity) -> Quantity {
        Quantity {
            nanos: self.nanos.saturating_sub(rhs.nanos),
            format: self.combined_format(&rhs),
        }
    }
}

impl SubAssign for Quantity {
    fn sub_assign(&mut self, rhs: Quantity) {
        *self = *self - rhs;
    }
}

impl std::iter::Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Quantity {
        iter.fold(Quantity::zero(), Add::add)
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Quantity::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(s: &str) -> Quantity {
        Quantity::parse(s).unwrap()
    }

    #[test]
    fn test_parse_suffixes() {
        assert_eq!(q("3").as_i64(), Some(3));
        assert_eq!(q("500m").as_millis(), 500);
        assert_eq!(q("1.5").as_millis(), 1500);
        assert_eq!(q("14Gi").as_i64(), Some(14 * 1024 * 1024 * 1024));
        assert_eq!(q("2k").as_i64(), Some(2000));
        assert_eq!(q("1e3").as_i64(), Some(1000));
        assert_eq!(q("1E").as_i64(), Some(1_000_000_000_000_000_000));
        assert_eq!(q("-2Mi").as_i64(), Some(-2 * 1024 * 1024));
        assert_eq!(q(".5Ki").as_i64(), Some(512));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Quantity::parse("").is_err());
        assert!(Quantity::parse("abc").is_err());
        assert!(Quantity::parse("100X").is_err());
        assert!(Quantity::parse("1.2.3").is_err());
        assert!(Quantity::parse("Gi").is_err());
        assert!(Quantity::parse("99999999999999999999999999999999999999999").is_err());
    }

    #[test]
    fn test_sub_nano_rounds_up() {
        assert_eq!(q("0.1n"), q("1n"));
        assert_eq!(q("-0.1n"), q("-1n"));
    }

    #[test]
    fn test_value_equality_ignores_format() {
        assert_eq!(q("1Gi"), q("1073741824"));
        assert_eq!(q("1000m"), q("1"));
        assert!(q("1Ki") < q("1025"));
    }

    #[test]
    fn test_canonical_display() {
        assert_eq!(q("14Gi").to_string(), "14Gi");
        assert_eq!(q("2000m").to_string(), "2");
        assert_eq!(q("1500m").to_string(), "1500m");
        assert_eq!(q("100Gi").to_string(), "100Gi");
        assert_eq!(q("1536Mi").to_string(), "1536Mi");
        assert_eq!(q("2000Ki").to_string(), "2000Ki");
        assert_eq!(q("512").to_string(), "512");
        assert_eq!(q("1e3").to_string(), "1e3");
        assert_eq!(q("0Gi").to_string(), "0");
        assert_eq!(q("12000k").to_string(), "12M");
    }

    #[test]
    fn test_exact_arithmetic() {
        let available = q("14Gi") - q("2Gi");
        assert_eq!(available.to_string(), "12Gi");

        let cpu = q("3") - q("1");
        assert_eq!(cpu.to_string(), "2");

        let total: Quantity = ["100m", "250m", "650m"].iter().map(|s| q(s)).sum();
        assert_eq!(total, q("1"));
        assert_eq!(total.to_string(), "1");

        // Zero adopts the other operand's format
        let mut mem = Quantity::zero();
        mem += q("1Gi");
        assert_eq!(mem.to_string(), "1Gi");
    }

    #[test]
    fn test_overcommit_goes_negative() {
        let available = q("1") - q("1500m");
        assert!(available.is_negative());
        assert_eq!(available.to_string(), "-500m");
    }

    #[test]
    fn test_gib_rendering() {
        assert_eq!(q("14Gi").as_gib_string(), "14.00Gi");
        assert_eq!(q("1536Mi").as_gib_string(), "1.50Gi");
        assert_eq!(q("0").as_gib_string(), "0.00Gi");
        assert_eq!(q("500m").as_gib_string(), "500m");
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&q("8Gi")).unwrap();
        assert_eq!(json, "\"8Gi\"");
        let back: Quantity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, q("8Gi"));
    }

    #[test]
    fn test_from_k8s_quantity() {
        let raw = K8sQuantity("250m".to_string());
        let parsed = Quantity::try_from(&raw).unwrap();
        assert_eq!(parsed.as_millis(), 250);
    }
}
