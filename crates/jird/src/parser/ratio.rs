//! Integer, ratio, and ratio product parsing.

use std::ops::Range;

use winnow::ascii::digit1;
use winnow::combinator::{opt, preceded, repeat};
use winnow::error::{StrContext, StrContextValue};
use winnow::prelude::*;

use super::{Input, PResult};
use crate::syntax::{Integer, RatioLiteral, RatioProductLiteral};

pub fn parse_integer(input: &mut Input<'_>) -> PResult<Integer> {
    digit1
        .with_span()
        .map(|(text, span): (&str, Range<usize>)| Integer {
            text: text.to_string(),
            span,
        })
        .context(StrContext::Expected(StrContextValue::Description("a ratio")))
        .parse_next(input)
}

/// Parse `n` or `n/d`. A `/` without a following integer is left unconsumed.
pub fn parse_ratio(input: &mut Input<'_>) -> PResult<RatioLiteral> {
    (parse_integer, opt(preceded('/', parse_integer)))
        .map(|(numerator, denominator)| RatioLiteral {
            numerator,
            denominator,
        })
        .parse_next(input)
}

/// Parse ratios joined with `*`.
///
/// Stops before a `*` that is not followed by a ratio, so `3/2*(...)` and
/// `1**9/8` leave the operator for the caller.
pub fn parse_ratio_product(input: &mut Input<'_>) -> PResult<RatioProductLiteral> {
    let first = parse_ratio(input)?;
    let rest: Vec<RatioLiteral> = repeat(0.., preceded('*', parse_ratio)).parse_next(input)?;

    let mut ratios = Vec::with_capacity(rest.len() + 1);
    ratios.push(first);
    ratios.extend(rest);
    Ok(RatioProductLiteral { ratios })
}

#[cfg(test)]
mod tests {
    use super::*;
    use winnow::LocatingSlice;

    fn texts(product: &RatioProductLiteral) -> Vec<(String, Option<String>)> {
        product
            .ratios
            .iter()
            .map(|r| {
                (
                    r.numerator.text.clone(),
                    r.denominator.as_ref().map(|d| d.text.clone()),
                )
            })
            .collect()
    }

    #[test]
    fn test_parse_ratio() {
        let mut input = LocatingSlice::new("5/4:1");
        let ratio = parse_ratio(&mut input).unwrap();
        assert_eq!(ratio.numerator.text, "5");
        assert_eq!(ratio.denominator.as_ref().unwrap().text, "4");
        assert_eq!(ratio.denominator.unwrap().span, 2..3);
    }

    #[test]
    fn test_parse_ratio_without_denominator() {
        let mut input = LocatingSlice::new("12 ");
        let ratio = parse_ratio(&mut input).unwrap();
        assert_eq!(ratio.numerator.text, "12");
        assert!(ratio.denominator.is_none());
    }

    #[test]
    fn test_parse_ratio_product() {
        let mut input = LocatingSlice::new("3/2*5/4*2:1");
        let product = parse_ratio_product(&mut input).unwrap();
        assert_eq!(
            texts(&product),
            vec![
                ("3".to_string(), Some("2".to_string())),
                ("5".to_string(), Some("4".to_string())),
                ("2".to_string(), None),
            ]
        );
    }

    #[test]
    fn test_ratio_product_leaves_operator() {
        let mut input = LocatingSlice::new("3/2*(1:1)");
        let product = parse_ratio_product(&mut input).unwrap();
        assert_eq!(product.ratios.len(), 1);

        let mut input = LocatingSlice::new("1**9/8");
        let product = parse_ratio_product(&mut input).unwrap();
        assert_eq!(product.ratios.len(), 1);
    }

    #[test]
    fn test_parse_integer_rejects_letters() {
        let mut input = LocatingSlice::new("x");
        assert!(parse_integer(&mut input).is_err());
    }
}
