//! Jird: a just intonation notation compiler.
//!
//! Music is written as exact frequency and duration ratios. This crate parses
//! that text into a [`Piece`], can re-tune it to an equal division of the
//! octave, and renders it as a Standard MIDI file, a LilyPond score or a
//! Scala tuning table.
//!
//! # Example
//!
//! ```
//! use jird::{parse, temper, to_midi, MidiParams};
//!
//! let piece = parse("1:1 5/4:1 3/2:2; 1/2:4").unwrap();
//! let tempered = temper(&piece, Some(12)).unwrap();
//! let midi_bytes = to_midi(&tempered, &MidiParams::default()).unwrap();
//! assert_eq!(&midi_bytes[..4], b"MThd");
//! ```
//!
//! # Notation
//!
//! - `5/4:1` is a note: frequency ratio, then duration in beats, then an
//!   optional volume (`5/4:1:1/2`).
//! - `0:1` is a one-beat rest.
//! - `<1 5/4 3/2>:2` is a chord.
//! - Whitespace sequences events, `;` separates simultaneous parts.
//! - `3/2*(1:1 5/4:1)` multiplies every frequency in the group;
//!   `(1:1 5/4:1)**1/2` multiplies every volume.

pub mod error;
pub mod lilypond;
pub mod midi;
pub mod music;
pub mod parser;
pub mod quantity;
pub mod report;
pub mod scala;
pub mod syntax;
pub mod temper;
pub mod transform;

pub use error::{ConstraintViolation, Error, Result, SyntaxError};
pub use lilypond::{LilypondParams, Spelling};
pub use midi::{MidiNote, MidiParams, MidiRender, TuningMethod};
pub use music::{
    all_frequencies, frequencies_set, height, lowest, total_duration, Chord, Event, MapNotes,
    Music, Note, Part, Piece,
};
pub use quantity::{Number, Power, Quantity, RatioProduct};
pub use scala::ScalaTuning;
pub use temper::temper;

/// Parse source text into a [`Piece`].
pub fn parse(text: &str) -> Result<Piece> {
    let tree = parser::parse_tree(text)?;
    let piece = transform::Transformer::new(text).piece(&tree)?;
    tracing::info!(
        parts = piece.parts.len(),
        duration = %total_duration(&piece),
        "parsed piece"
    );
    Ok(piece)
}

/// Render a piece as Standard MIDI file bytes (format 1).
pub fn to_midi(piece: &Piece, params: &MidiParams) -> Result<Vec<u8>> {
    midi::generate(piece, params)
}

/// Render a piece as a LilyPond document.
pub fn to_lilypond(piece: &Piece, params: &LilypondParams) -> Result<String> {
    lilypond::render(piece, params)
}
