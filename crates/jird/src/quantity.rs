//! Exact rational algebra for frequencies, durations, and volumes.
//!
//! Ratios written in the source stay factored: `3/2*5/4` is kept as the two
//! factors `3/2` and `5/4` rather than collapsed into `15/8`. Tempering
//! rounds each factor separately and the notation backend prints how a ratio
//! was composed, so the factor sequence carries meaning beyond its value.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Div, Mul};

use num_bigint::BigInt;
use num_rational::{BigRational, Rational64};
use num_traits::{One, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An evaluated quantity: exact when it came from ratios, floating point
/// when it came from a tempered power.
///
/// Exact values are unbounded. Source literals fit in `i64`, but a product
/// of many of them need not: ten stacked `81/80` commas already overflow.
///
/// Numbers compare by value, so `Exact(3/2)` equals `Float(1.5)`. A float is
/// compared against an exact value as the exact rational it represents, so
/// the ordering stays total across kinds. Infinities sit beyond every exact
/// value and NaN sorts by its sign bit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Number {
    Exact(BigRational),
    Float(f64),
}

impl Number {
    pub fn zero() -> Self {
        Number::Exact(BigRational::zero())
    }

    pub fn one() -> Self {
        Number::Exact(BigRational::one())
    }

    pub fn to_f64(&self) -> f64 {
        match self {
            Number::Exact(r) => r.to_f64().unwrap_or_else(|| 2f64.powf(big_ratio_log2(r))),
            Number::Float(f) => *f,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Number::Exact(r) => r.is_zero(),
            Number::Float(f) => *f == 0.0,
        }
    }

    /// The exact value, if there is one.
    pub fn exact(&self) -> Option<&BigRational> {
        match self {
            Number::Exact(r) => Some(r),
            Number::Float(_) => None,
        }
    }

    pub fn log2(&self) -> f64 {
        match self {
            Number::Exact(r) => big_ratio_log2(r),
            Number::Float(f) => f.log2(),
        }
    }
}

/// Widen a source ratio for exact evaluation.
pub fn widen(r: &Rational64) -> BigRational {
    BigRational::new_raw(BigInt::from(*r.numer()), BigInt::from(*r.denom()))
}

/// log2 of a ratio, taken as a difference so large terms keep their precision.
pub(crate) fn ratio_log2(r: &Rational64) -> f64 {
    (*r.numer() as f64).log2() - (*r.denom() as f64).log2()
}

fn big_ratio_log2(r: &BigRational) -> f64 {
    big_log2(r.numer()) - big_log2(r.denom())
}

/// log2 of a magnitude of any size. Values past the `f64` range are shifted
/// down to their top 64 bits first.
fn big_log2(n: &BigInt) -> f64 {
    let bits = n.bits();
    if bits <= 64 {
        return n.to_f64().map_or(f64::NAN, |f| f.abs().log2());
    }
    let shift = bits - 64;
    let top = (n >> shift).to_f64().map_or(f64::NAN, f64::abs);
    top.log2() + shift as f64
}

fn cmp_exact_float(exact: &BigRational, float: f64) -> Ordering {
    match BigRational::from_float(float) {
        Some(float) => exact.cmp(&float),
        // Infinities and NaN.
        None if float.is_sign_negative() => Ordering::Greater,
        None => Ordering::Less,
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Number {}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Number::Exact(a), Number::Exact(b)) => a.cmp(b),
            (Number::Exact(a), Number::Float(b)) => cmp_exact_float(a, *b),
            (Number::Float(a), Number::Exact(b)) => cmp_exact_float(b, *a).reverse(),
            // -0.0 equals 0.0 here, as both equal exact zero.
            (Number::Float(a), Number::Float(b)) => {
                a.partial_cmp(b).unwrap_or_else(|| a.total_cmp(b))
            }
        }
    }
}

impl Add for Number {
    type Output = Number;

    fn add(self, other: Number) -> Number {
        match (self, other) {
            (Number::Exact(a), Number::Exact(b)) => Number::Exact(a + b),
            (a, b) => Number::Float(a.to_f64() + b.to_f64()),
        }
    }
}

impl Mul for Number {
    type Output = Number;

    fn mul(self, other: Number) -> Number {
        match (self, other) {
            (Number::Exact(a), Number::Exact(b)) => Number::Exact(a * b),
            (a, b) => Number::Float(a.to_f64() * b.to_f64()),
        }
    }
}

impl Div for Number {
    type Output = Number;

    fn div(self, other: Number) -> Number {
        match (self, other) {
            (Number::Exact(a), Number::Exact(b)) if !b.is_zero() => Number::Exact(a / b),
            (a, b) => Number::Float(a.to_f64() / b.to_f64()),
        }
    }
}

impl From<Rational64> for Number {
    fn from(r: Rational64) -> Self {
        Number::Exact(widen(&r))
    }
}

impl From<BigRational> for Number {
    fn from(r: BigRational) -> Self {
        Number::Exact(r)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Exact(r) => write!(f, "{}", r),
            Number::Float(x) => write!(f, "{:?}", x),
        }
    }
}

/// An unevaluated product of ratios.
///
/// Multiplication concatenates factor sequences and equality compares the
/// sequences: `3/2*5/4` and `5/4*3/2` evaluate equal but are different
/// products.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RatioProduct {
    factors: Vec<Rational64>,
}

impl RatioProduct {
    pub fn new(factors: Vec<Rational64>) -> Self {
        RatioProduct { factors }
    }

    pub fn single(factor: Rational64) -> Self {
        RatioProduct {
            factors: vec![factor],
        }
    }

    pub fn factors(&self) -> &[Rational64] {
        &self.factors
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn evaluate(&self) -> BigRational {
        product(&self.factors)
    }
}

/// Exact product of a slice of ratios; 1 when empty.
pub fn product(factors: &[Rational64]) -> BigRational {
    factors
        .iter()
        .fold(BigRational::one(), |acc, factor| acc * widen(factor))
}

impl Mul for &RatioProduct {
    type Output = RatioProduct;

    fn mul(self, other: &RatioProduct) -> RatioProduct {
        let mut factors = self.factors.clone();
        factors.extend_from_slice(&other.factors);
        RatioProduct { factors }
    }
}

impl FromIterator<Rational64> for RatioProduct {
    fn from_iter<I: IntoIterator<Item = Rational64>>(iter: I) -> Self {
        RatioProduct {
            factors: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for RatioProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, factor) in self.factors.iter().enumerate() {
            if i > 0 {
                f.write_str("*")?;
            }
            write!(f, "{}", factor)?;
        }
        Ok(())
    }
}

/// `base ** (exponent_numerator / exponent_denominator)`, kept unevaluated so
/// a tempered pitch still reads as "n steps of m-EDO".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Power {
    pub base: i64,
    pub exponent_numerator: i64,
    pub exponent_denominator: i64,
}

impl Power {
    pub fn new(base: i64, exponent_numerator: i64, exponent_denominator: i64) -> Self {
        Power {
            base,
            exponent_numerator,
            exponent_denominator,
        }
    }

    fn exponent(&self) -> f64 {
        self.exponent_numerator as f64 / self.exponent_denominator as f64
    }

    pub fn evaluate(&self) -> f64 {
        (self.base as f64).powf(self.exponent())
    }

    pub fn log2(&self) -> f64 {
        (self.base as f64).log2() * self.exponent()
    }
}

impl fmt::Display for Power {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}**{}/{}",
            self.base, self.exponent_numerator, self.exponent_denominator
        )
    }
}

/// A frequency, duration, or volume as it appears on a note.
///
/// Equality is structural. Use [`Quantity::cmp_value`] to compare values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quantity {
    /// A plain evaluated ratio.
    Ratio(Rational64),
    Product(RatioProduct),
    Power(Power),
}

impl Quantity {
    pub fn one() -> Self {
        Quantity::Ratio(Rational64::from_integer(1))
    }

    pub fn evaluate(&self) -> Number {
        match self {
            Quantity::Ratio(r) => Number::from(*r),
            Quantity::Product(p) => Number::Exact(p.evaluate()),
            Quantity::Power(p) => Number::Float(p.evaluate()),
        }
    }

    /// log2 of the value, or `None` for zero.
    ///
    /// Powers take the logarithm of the exponent directly, so `2**3/12` is
    /// exactly a quarter octave.
    pub fn log2(&self) -> Option<f64> {
        match self {
            Quantity::Power(p) if p.base > 0 => Some(p.log2()),
            _ => {
                let value = self.evaluate();
                if value.is_zero() {
                    None
                } else {
                    Some(value.log2())
                }
            }
        }
    }

    pub fn as_product(&self) -> Option<&RatioProduct> {
        match self {
            Quantity::Product(p) => Some(p),
            _ => None,
        }
    }

    pub fn cmp_value(&self, other: &Quantity) -> Ordering {
        self.evaluate().cmp(&other.evaluate())
    }

    /// Left-multiply by `factors`, prepending them to this quantity's own.
    pub fn prepend(&self, factors: &RatioProduct) -> Result<Quantity> {
        match self {
            Quantity::Ratio(r) => Ok(Quantity::Product(factors * &RatioProduct::single(*r))),
            Quantity::Product(p) => Ok(Quantity::Product(factors * p)),
            Quantity::Power(p) => Err(Error::Contract(format!(
                "cannot multiply tempered power {} by {}",
                p, factors
            ))),
        }
    }
}

impl From<Rational64> for Quantity {
    fn from(r: Rational64) -> Self {
        Quantity::Ratio(r)
    }
}

impl From<RatioProduct> for Quantity {
    fn from(p: RatioProduct) -> Self {
        Quantity::Product(p)
    }
}

impl From<Power> for Quantity {
    fn from(p: Power) -> Self {
        Quantity::Power(p)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantity::Ratio(r) => write!(f, "{}", r),
            Quantity::Product(p) => write!(f, "{}", p),
            Quantity::Power(p) => write!(f, "{}", p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn r(n: i64, d: i64) -> Rational64 {
        Rational64::new(n, d)
    }

    #[test]
    fn test_product_keeps_factors() {
        let a = RatioProduct::new(vec![r(3, 2)]);
        let b = RatioProduct::new(vec![r(5, 4), r(6, 5)]);
        let ab = &a * &b;
        assert_eq!(ab.factors(), &[r(3, 2), r(5, 4), r(6, 5)]);
        assert_eq!(ab.evaluate(), widen(&r(9, 4)));
        assert_eq!(ab.to_string(), "3/2*5/4*6/5");
    }

    #[test]
    fn test_product_equality_is_structural() {
        let a = RatioProduct::new(vec![r(3, 2), r(5, 4)]);
        let b = RatioProduct::new(vec![r(5, 4), r(3, 2)]);
        assert_ne!(a, b);
        assert_eq!(a.evaluate(), b.evaluate());
        assert_eq!(
            Quantity::from(a).cmp_value(&Quantity::from(b)),
            Ordering::Equal
        );
    }

    #[test]
    fn test_empty_product() {
        let empty = RatioProduct::default();
        assert_eq!(empty.to_string(), "");
        assert_eq!(empty.evaluate(), BigRational::one());
    }

    #[test]
    fn test_power() {
        let p = Power::new(2, 3, 12);
        assert_eq!(p.to_string(), "2**3/12");
        assert!((p.evaluate() - 2f64.powf(0.25)).abs() < 1e-12);
        assert_eq!(Quantity::from(p).log2(), Some(0.25));
    }

    #[test]
    fn test_number_ordering_across_kinds() {
        assert_eq!(Number::from(r(3, 2)), Number::Float(1.5));
        assert!(Number::from(r(5, 4)) < Number::Float(1.3));
        assert!(Number::Float(1.0) < Number::from(r(9, 8)));
    }

    #[test]
    fn test_number_arithmetic() {
        assert_eq!(
            Number::from(r(1, 2)) + Number::from(r(1, 4)),
            Number::from(r(3, 4))
        );
        assert_eq!(
            Number::from(r(7, 6)) / Number::from(r(4, 3)),
            Number::from(r(7, 8))
        );
        assert_eq!(Number::from(r(2, 1)).to_string(), "2");
        assert_eq!(Number::Float(2.0).to_string(), "2.0");
    }

    #[test]
    fn test_prepend() {
        let frequency = Quantity::Product(RatioProduct::single(r(5, 4)));
        let doubled = frequency.prepend(&RatioProduct::single(r(2, 1))).unwrap();
        assert_eq!(
            doubled,
            Quantity::Product(RatioProduct::new(vec![r(2, 1), r(5, 4)]))
        );

        let volume = Quantity::one().prepend(&RatioProduct::single(r(9, 8))).unwrap();
        assert_eq!(
            volume,
            Quantity::Product(RatioProduct::new(vec![r(9, 8), r(1, 1)]))
        );

        let tempered = Quantity::Power(Power::new(2, 4, 12));
        assert!(tempered.prepend(&RatioProduct::single(r(2, 1))).is_err());
    }

    #[test]
    fn test_log2_of_zero_is_none() {
        assert_eq!(Quantity::Ratio(r(0, 1)).log2(), None);
        assert_eq!(Quantity::Ratio(r(2, 1)).log2(), Some(1.0));
    }

    #[test]
    fn test_stacked_commas_stay_exact() {
        let commas = RatioProduct::new(vec![r(81, 80); 10]);
        let value = commas.evaluate();
        assert_eq!(
            value,
            BigRational::new(
                BigInt::from(81u64).pow(10u32),
                BigInt::from(80u64).pow(10u32)
            )
        );

        let number = Quantity::from(commas).evaluate();
        assert!((number.to_f64() - (81.0f64 / 80.0).powi(10)).abs() < 1e-12);
        assert!((number.log2() - 10.0 * (81.0f64 / 80.0).log2()).abs() < 1e-12);
        assert!(number > Number::one());
    }

    #[test]
    fn test_huge_terms_keep_log2() {
        let wide = RatioProduct::new(vec![r(i64::MAX, 1); 20]);
        let expected = 20.0 * (i64::MAX as f64).log2();
        let log2 = Quantity::from(wide).log2().unwrap();
        assert!((log2 - expected).abs() < 1e-9, "{} vs {}", log2, expected);
    }

    #[test]
    fn test_number_ordering_is_exact_against_floats() {
        // Both ratios round to the same f64 but stay distinct and ordered.
        let below = Number::from(r(1 << 53, (1 << 53) + 1));
        let above = Number::from(r((1 << 53) + 1, (1 << 53) + 2));
        let float = Number::Float(below.to_f64());
        assert!(below < above);
        assert!(!(below == float && above == float));

        assert!(Number::from(r(i64::MAX, 1)) < Number::Float(f64::INFINITY));
        assert!(Number::Float(f64::NEG_INFINITY) < Number::zero());
        assert_eq!(Number::Float(-0.0), Number::zero());
        assert_eq!(Number::Float(-0.0), Number::Float(0.0));
    }
}
