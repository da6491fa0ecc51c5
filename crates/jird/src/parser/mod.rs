//! Parser for ratio notation, built on winnow.
//!
//! The grammar is small enough to parse in one pass without recovery. The
//! first error aborts the parse and is reported with the offending token.

mod event;
mod ratio;

use winnow::error::{ContextError, StrContext};
use winnow::prelude::*;
use winnow::LocatingSlice;

use crate::error::SyntaxError;
use crate::syntax::SyntaxTree;

pub(crate) type Input<'s> = LocatingSlice<&'s str>;
type PResult<T> = winnow::ModalResult<T>;

/// Parse text into a syntax tree.
pub fn parse_tree(source: &str) -> Result<SyntaxTree, SyntaxError> {
    event::parse_music
        .parse(LocatingSlice::new(source))
        .map_err(|e| SyntaxError::at(source, e.offset(), describe(e.inner())))
}

fn describe(error: &ContextError) -> String {
    let expected: Vec<String> = error
        .context()
        .filter_map(|c| match c {
            StrContext::Expected(value) => Some(value.to_string()),
            _ => None,
        })
        .collect();
    if expected.is_empty() {
        "unexpected input".to_string()
    } else {
        format!("expected {}", expected.join(" or "))
    }
}
