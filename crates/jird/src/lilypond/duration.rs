//! Durations as tied LilyPond note values, inside a tuplet when needed.
//!
//! A duration whose denominator has an odd factor O is written in an O:R
//! tuplet, R being the largest power of two not above O, so a third of a
//! beat becomes an eighth in a 3:2 tuplet. What is left after rescaling is
//! a sum of power-of-two values, written largest first and tied together.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, ToPrimitive, Zero};

use crate::error::{ConstraintViolation, Result};
use crate::quantity::Quantity;

/// Most tied values one duration may expand to.
pub const MAX_TIED_VALUES: usize = 1024;

/// Note values in beats with their LilyPond symbols, longest first.
const NOTE_VALUES: [(i64, i64, &str); 8] = [
    (4, 1, "1"),
    (2, 1, "2"),
    (1, 1, "4"),
    (1, 2, "8"),
    (1, 4, "16"),
    (1, 8, "32"),
    (1, 16, "64"),
    (1, 32, "128"),
];

/// How to write one duration, waiting for a pitch and an annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationTemplate {
    /// Tied note values, longest first.
    pub symbols: Vec<&'static str>,
    /// `(O, R)` for an O:R tuplet.
    pub tuplet: Option<(i64, i64)>,
}

impl DurationTemplate {
    pub fn for_duration(duration: &Quantity) -> Result<Self> {
        let unrepresentable = || ConstraintViolation::UnrepresentableDuration {
            duration: duration.to_string(),
        };
        let beats = duration.evaluate().exact().cloned().ok_or_else(unrepresentable)?;
        if beats <= BigRational::zero() {
            return Err(unrepresentable().into());
        }

        let denominator = beats.denom();
        let twos = denominator.trailing_zeros().unwrap_or(0);
        let odd: BigInt = denominator >> twos;
        let rescale = BigInt::one() << (odd.bits() - 1);

        let mut remaining =
            BigRational::new(beats.numer().clone(), (BigInt::one() << twos) * &rescale);
        let mut symbols = Vec::new();
        for (numerator, denominator, symbol) in NOTE_VALUES {
            let value = BigRational::new(numerator.into(), denominator.into());
            let count = (&remaining / &value).floor().to_integer();
            let count = count
                .to_usize()
                .filter(|count| symbols.len() + count <= MAX_TIED_VALUES)
                .ok_or_else(unrepresentable)?;
            remaining -= &value * BigRational::from_integer(count.into());
            symbols.extend(std::iter::repeat(symbol).take(count));
        }
        if !remaining.is_zero() {
            return Err(unrepresentable().into());
        }

        let tuplet = if odd.is_one() {
            None
        } else {
            let odd = odd.to_i64().ok_or_else(unrepresentable)?;
            let rescale = rescale.to_i64().ok_or_else(unrepresentable)?;
            Some((odd, rescale))
        };

        Ok(DurationTemplate { symbols, tuplet })
    }

    /// Fill in a pitch (or chord, or `r`) and the annotation carried by the
    /// first tied value.
    pub fn render(&self, pitch: &str, annotation: &str) -> String {
        let notes: Vec<String> = self
            .symbols
            .iter()
            .map(|symbol| format!("{}{}", pitch, symbol))
            .collect();
        let body = match notes.split_first() {
            Some((first, [])) => format!("{}{}", first, annotation),
            Some((first, rest)) => format!("{}~{}{}", first, annotation, rest.join("~")),
            None => String::new(),
        };

        match self.tuplet {
            Some((odd, rescale)) => format!("\\tuplet {}/{} {{{}}}", odd, rescale, body),
            None => body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_rational::Rational64;
    use pretty_assertions::assert_eq;

    fn template(n: i64, d: i64) -> DurationTemplate {
        DurationTemplate::for_duration(&Quantity::Ratio(Rational64::new(n, d))).unwrap()
    }

    #[test]
    fn test_plain_values() {
        assert_eq!(template(1, 1).symbols, vec!["4"]);
        assert_eq!(template(4, 1).symbols, vec!["1"]);
        assert_eq!(template(1, 2).symbols, vec!["8"]);
        assert_eq!(template(1, 32).symbols, vec!["128"]);
        assert_eq!(template(1, 1).tuplet, None);
    }

    #[test]
    fn test_tied_values() {
        assert_eq!(template(3, 1).symbols, vec!["2", "4"]);
        assert_eq!(template(7, 4).symbols, vec!["4", "8", "16"]);
        assert_eq!(template(12, 1).symbols, vec!["1", "1", "1"]);
    }

    #[test]
    fn test_tuplets() {
        let third = template(1, 3);
        assert_eq!(third.symbols, vec!["8"]);
        assert_eq!(third.tuplet, Some((3, 2)));

        let three_fifths = template(3, 5);
        assert_eq!(three_fifths.symbols, vec!["8", "16"]);
        assert_eq!(three_fifths.tuplet, Some((5, 4)));

        assert_eq!(template(2, 3).symbols, vec!["4"]);
        assert_eq!(template(1, 7).tuplet, Some((7, 4)));
        assert_eq!(template(1, 12).tuplet, Some((3, 2)));
    }

    #[test]
    fn test_tuplet_is_odd_over_power_of_two() {
        for d in 1..200 {
            if let Ok(t) = DurationTemplate::for_duration(&Quantity::Ratio(Rational64::new(1, d))) {
                if let Some((odd, rescale)) = t.tuplet {
                    assert_eq!(odd % 2, 1);
                    assert_eq!(rescale.count_ones(), 1);
                    assert!(rescale <= odd && odd < 2 * rescale);
                }
            }
        }
    }

    #[test]
    fn test_render() {
        assert_eq!(template(1, 1).render("c", " x "), "c4 x ");
        assert_eq!(template(3, 1).render("c", " x "), "c2~ x c4");
        assert_eq!(template(7, 4).render("d", "!"), "d4~!d8~d16");
        assert_eq!(template(2, 3).render("c", " x "), "\\tuplet 3/2 {c4 x }");
        assert_eq!(template(3, 1).render("r", "").replace('~', " "), "r2 r4");
    }

    #[test]
    fn test_unrepresentable() {
        let zero = Quantity::Ratio(Rational64::from_integer(0));
        assert!(DurationTemplate::for_duration(&zero).is_err());
        let tiny = Quantity::Ratio(Rational64::new(1, 64));
        assert!(DurationTemplate::for_duration(&tiny).is_err());
        let tempered = Quantity::Power(crate::quantity::Power::new(2, 1, 12));
        assert!(DurationTemplate::for_duration(&tempered).is_err());
    }

    #[test]
    fn test_huge_durations() {
        let texts = [
            "1:9223372036854775807",
            "1:4294967296*4294967296*4294967296",
            "1:1/9223372036854775807*1/9223372036854775807",
        ];
        for text in texts {
            let piece = crate::parse(text).unwrap();
            let duration = &piece.parts[0].events[0].notes()[0].duration;
            let err = DurationTemplate::for_duration(duration).unwrap_err();
            assert!(
                matches!(
                    err,
                    crate::Error::Constraint(ConstraintViolation::UnrepresentableDuration { .. })
                ),
                "{}: {}",
                text,
                err
            );
        }
    }

    #[test]
    fn test_long_ties_up_to_the_limit() {
        let longest = template(4 * MAX_TIED_VALUES as i64, 1);
        assert_eq!(longest.symbols.len(), MAX_TIED_VALUES);
        assert!(DurationTemplate::for_duration(&Quantity::Ratio(Rational64::from_integer(
            4 * MAX_TIED_VALUES as i64 + 1
        )))
        .is_err());
    }

    #[test]
    fn test_product_durations_reduce_before_writing() {
        let piece = crate::parse("1:4294967296*1/4294967296*1/3").unwrap();
        let duration = &piece.parts[0].events[0].notes()[0].duration;
        let template = DurationTemplate::for_duration(duration).unwrap();
        assert_eq!(template.symbols, vec!["8"]);
        assert_eq!(template.tuplet, Some((3, 2)));
    }
}
