//! Error types for parsing and encoding.
//!
//! A compile fails in one of three ways: the source text is malformed
//! ([`SyntaxError`]), a value falls outside a range the output format can
//! represent ([`ConstraintViolation`]), or a value breaks an internal
//! contract ([`Error::Contract`]).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Malformed source text.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("syntax error at line {line}, column {column}: {message} (found {token})")]
pub struct SyntaxError {
    pub message: String,
    /// The offending token as it appears in the source, or `end of input`.
    pub token: String,
    pub line: usize,
    pub column: usize,
    /// Byte offset of the token in the source.
    pub offset: usize,
}

impl SyntaxError {
    /// Build an error for the token starting at byte `offset` of `source`.
    pub fn at(source: &str, offset: usize, message: impl Into<String>) -> Self {
        let offset = offset.min(source.len());
        let (line, column) = line_and_column(source, offset);
        SyntaxError {
            message: message.into(),
            token: token_at(source, offset),
            line,
            column,
            offset,
        }
    }
}

/// 1-based line and column of a byte offset.
fn line_and_column(source: &str, offset: usize) -> (usize, usize) {
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(newline) => before[newline + 1..].chars().count() + 1,
        None => before.chars().count() + 1,
    };
    (line, column)
}

/// The run of non-whitespace characters starting at `offset`.
fn token_at(source: &str, offset: usize) -> String {
    let token: String = source[offset..]
        .chars()
        .take_while(|c| !c.is_whitespace())
        .collect();
    if token.is_empty() {
        if offset >= source.len() {
            "end of input".to_string()
        } else {
            "whitespace".to_string()
        }
    } else {
        format!("'{}'", token)
    }
}

/// A value outside the range an output format can represent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstraintViolation {
    #[error("MIDI pitch {pitch} is outside 0..=127")]
    PitchOutOfRange { pitch: i64 },

    #[error("pitch bend {bend} is outside 0..=16383 (try a larger pitch bend range)")]
    BendOutOfRange { bend: i64 },

    #[error("velocity {velocity} is outside 0..=127")]
    VelocityOutOfRange { velocity: i64 },

    #[error("duration {duration} gives a non-integral tick count at {ticks_per_beat} ticks per beat")]
    NonIntegralTicks {
        duration: String,
        ticks_per_beat: u16,
    },

    #[error("duration {duration} gives a tick count that does not fit in a MIDI delta time")]
    TicksOutOfRange { duration: String },

    #[error("part {part} needs {needed} MIDI channels but only {available} remain")]
    ChannelsExhausted {
        part: usize,
        needed: usize,
        available: usize,
    },

    #[error("{parts} parts need more than the {available} available MIDI channels")]
    TooManyParts { parts: usize, available: usize },

    #[error("frequency {frequency} has no MIDI note in the tuning map")]
    UnmappedFrequency { frequency: String },

    #[error("{count} distinct frequencies do not fit in 128 MIDI notes")]
    TooManyFrequencies { count: usize },

    #[error("tempo of {microseconds} microseconds per beat does not fit in three bytes")]
    TempoOutOfRange { microseconds: i64 },

    #[error("MIDI program {program} is outside 1..=128")]
    InvalidProgram { program: u8 },

    #[error("equal division of the octave must be positive")]
    InvalidEdo,

    #[error("pitch bend range must be a positive number of semitones")]
    InvalidPitchBendRange,

    #[error("duration {duration} cannot be written with standard note values")]
    UnrepresentableDuration { duration: String },
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Constraint(#[from] ConstraintViolation),

    /// A value that correctly constructed music never produces.
    #[error("internal contract violation: {0}")]
    Contract(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_position() {
        let source = "1:1 5/4:1\n3/2:x";
        let err = SyntaxError::at(source, 14, "expected a ratio");
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 5);
        assert_eq!(err.token, "'x'");
    }

    #[test]
    fn test_syntax_error_at_end() {
        let err = SyntaxError::at("<1 5/4", 6, "unclosed chord");
        assert_eq!(err.token, "end of input");
        assert_eq!(err.column, 7);
        assert!(err.to_string().contains("unclosed chord"));
    }

    #[test]
    fn test_constraint_converts() {
        let err: Error = ConstraintViolation::InvalidEdo.into();
        assert!(matches!(err, Error::Constraint(ConstraintViolation::InvalidEdo)));
    }
}
