//! Note, chord, group, and operator parsing.
//!
//! Precedence, tightest first: a note or chord literal, a parenthesized
//! group, `**` (volume), then `*` (frequency), then whitespace (sequence),
//! then `;` (simultaneous parts).

use winnow::ascii::multispace0;
use winnow::combinator::{alt, cut_err, opt, preceded, repeat, terminated};
use winnow::error::{StrContext, StrContextValue};
use winnow::prelude::*;

use super::ratio::parse_ratio_product;
use super::{Input, PResult};
use crate::syntax::{Expr, RatioProductLiteral, SyntaxTree};

fn ws(input: &mut Input<'_>) -> PResult<()> {
    multispace0.void().parse_next(input)
}

fn expected(description: &'static str) -> StrContext {
    StrContext::Expected(StrContextValue::Description(description))
}

/// Parse a whole text into `;`-separated parts.
pub fn parse_music(input: &mut Input<'_>) -> PResult<SyntaxTree> {
    let first = parse_part(input)?;
    let rest: Vec<Vec<Expr>> = repeat(0.., preceded(';', parse_part)).parse_next(input)?;

    let mut parts = Vec::with_capacity(rest.len() + 1);
    parts.push(first);
    parts.extend(rest);
    Ok(SyntaxTree { parts })
}

/// Whitespace-separated items; possibly none.
fn parse_part(input: &mut Input<'_>) -> PResult<Vec<Expr>> {
    preceded(ws, repeat(0.., terminated(parse_item, ws))).parse_next(input)
}

fn parse_item(input: &mut Input<'_>) -> PResult<Expr> {
    alt((parse_multiply, parse_powered)).parse_next(input)
}

/// `ratio_product*item`
fn parse_multiply(input: &mut Input<'_>) -> PResult<Expr> {
    (
        parse_ratio_product,
        '*',
        cut_err(parse_item.context(expected("a note, chord, or group after '*'"))),
    )
        .map(|(factor, _, body)| Expr::Multiply {
            factor,
            body: Box::new(body),
        })
        .parse_next(input)
}

/// An atom followed by any number of `**ratio_product` volume factors.
fn parse_powered(input: &mut Input<'_>) -> PResult<Expr> {
    let body = parse_atom(input)?;
    let factors: Vec<RatioProductLiteral> = repeat(
        0..,
        preceded(
            "**",
            cut_err(parse_ratio_product.context(expected("a volume ratio after '**'"))),
        ),
    )
    .parse_next(input)?;

    Ok(factors.into_iter().fold(body, |body, factor| Expr::Volume {
        body: Box::new(body),
        factor,
    }))
}

fn parse_atom(input: &mut Input<'_>) -> PResult<Expr> {
    alt((parse_note, parse_chord, parse_group)).parse_next(input)
}

/// `frequency:duration[:volume]`
fn parse_note(input: &mut Input<'_>) -> PResult<Expr> {
    (
        parse_ratio_product,
        ':',
        cut_err(parse_ratio_product.context(expected("a duration"))),
        opt(preceded(
            ':',
            cut_err(parse_ratio_product.context(expected("a volume"))),
        )),
    )
        .map(|(frequency, _, duration, volume)| Expr::Note {
            frequency,
            duration,
            volume,
        })
        .parse_next(input)
}

/// `<f1 f2 ...>:duration[:volume]`
fn parse_chord(input: &mut Input<'_>) -> PResult<Expr> {
    preceded(
        '<',
        cut_err((
            preceded(ws, repeat(0.., terminated(parse_ratio_product, ws))),
            '>'.context(StrContext::Expected(StrContextValue::CharLiteral('>'))),
            ':'.context(StrContext::Expected(StrContextValue::CharLiteral(':'))),
            parse_ratio_product.context(expected("a duration")),
            opt(preceded(':', parse_ratio_product.context(expected("a volume")))),
        )),
    )
    .map(
        |(frequencies, _, _, duration, volume): (
            Vec<RatioProductLiteral>,
            char,
            char,
            RatioProductLiteral,
            Option<RatioProductLiteral>,
        )| Expr::Chord {
            frequencies,
            duration,
            volume,
        },
    )
    .parse_next(input)
}

/// `( items )`
fn parse_group(input: &mut Input<'_>) -> PResult<Expr> {
    preceded(
        '(',
        cut_err(terminated(
            parse_part,
            ')'.context(StrContext::Expected(StrContextValue::CharLiteral(')'))),
        )),
    )
    .map(Expr::Group)
    .parse_next(input)
}
