//! Equal temperament approximation.
//!
//! A product of ratios is tempered factor by factor and the steps summed.
//! `<1 5/4 11/8>` in 12-EDO is 0, 4, 6 steps; tempering `80/81*<1 5/4 11/8>`
//! after collapsing each product would give 0, 4, 5. Summing per-factor steps
//! keeps the intervals inside a chord fixed under transposition.

use num_traits::Zero;

use crate::error::{ConstraintViolation, Result};
use crate::music::{MapNotes, Note, Piece};
use crate::quantity::{ratio_log2, Power, Quantity};

/// Move a note to the nearest step of `edo` equal divisions of the octave.
/// Rests are returned unchanged.
pub fn temper_note(note: &Note, edo: u32) -> Result<Note> {
    if edo == 0 {
        return Err(ConstraintViolation::InvalidEdo.into());
    }
    let divisions = f64::from(edo);

    let steps = match &note.frequency {
        Quantity::Product(product) => {
            if product.evaluate().is_zero() {
                return Ok(note.clone());
            }
            product
                .factors()
                .iter()
                .map(|factor| (divisions * ratio_log2(factor)).round_ties_even() as i64)
                .sum()
        }
        other => match other.log2() {
            Some(octaves) => (divisions * octaves).round_ties_even() as i64,
            None => return Ok(note.clone()),
        },
    };

    Ok(Note {
        frequency: Power::new(2, steps, i64::from(edo)).into(),
        ..note.clone()
    })
}

/// Temper every note in a piece; `None` leaves the piece as written.
pub fn temper(piece: &Piece, edo: Option<u32>) -> Result<Piece> {
    let Some(edo) = edo else {
        return Ok(piece.clone());
    };
    tracing::info!(edo, "tempering");
    piece.try_map_notes(&mut |note: &Note| temper_note(note, edo))
}
