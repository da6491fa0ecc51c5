//! Concrete syntax tree produced by the parser.
//!
//! Integers are kept as source text with their byte span so that the
//! transformer can report overflow and zero denominators at the right spot.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// An unsigned integer literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Integer {
    pub text: String,
    pub span: Range<usize>,
}

/// `n` or `n/d`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatioLiteral {
    pub numerator: Integer,
    pub denominator: Option<Integer>,
}

/// Ratios joined with `*`, e.g. `3/2*5/4`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatioProductLiteral {
    pub ratios: Vec<RatioLiteral>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    /// `frequency:duration[:volume]`
    Note {
        frequency: RatioProductLiteral,
        duration: RatioProductLiteral,
        volume: Option<RatioProductLiteral>,
    },
    /// `<f1 f2 ...>:duration[:volume]`
    Chord {
        frequencies: Vec<RatioProductLiteral>,
        duration: RatioProductLiteral,
        volume: Option<RatioProductLiteral>,
    },
    /// `( ... )`, items played in sequence.
    Group(Vec<Expr>),
    /// `factor*body`, scales every frequency in `body`.
    Multiply {
        factor: RatioProductLiteral,
        body: Box<Expr>,
    },
    /// `body**factor`, scales every volume in `body`.
    Volume {
        body: Box<Expr>,
        factor: RatioProductLiteral,
    },
}

/// A whole source text: `;`-separated parts of whitespace-separated items.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyntaxTree {
    pub parts: Vec<Vec<Expr>>,
}
